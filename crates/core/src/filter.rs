//! Listing filter: substring or parameter-size comparison.

use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

use crate::models::{CatalogEntry, ColorTag, CompositeKey, ListingItem};

/// Number of distinct display colors handed out before cycling.
pub const PALETTE_SIZE: usize = 10;

#[allow(clippy::expect_used)]
static SIZE_FILTER_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(<=|>=|==|<|>|=)(\d+(?:\.\d+)?)([kmgb])").expect("size filter regex is valid")
});

#[allow(clippy::expect_used)]
static SIZE_VALUE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+(?:\.\d+)?)([kmgb])").expect("size value regex is valid"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
}

impl CompareOp {
    fn parse(op: &str) -> Option<Self> {
        match op {
            "<" => Some(CompareOp::Lt),
            "<=" => Some(CompareOp::Le),
            ">" => Some(CompareOp::Gt),
            ">=" => Some(CompareOp::Ge),
            "=" | "==" => Some(CompareOp::Eq),
            _ => None,
        }
    }

    pub fn apply(self, lhs: f64, rhs: f64) -> bool {
        match self {
            CompareOp::Lt => lhs < rhs,
            CompareOp::Le => lhs <= rhs,
            CompareOp::Gt => lhs > rhs,
            CompareOp::Ge => lhs >= rhs,
            CompareOp::Eq => lhs == rhs,
        }
    }
}

fn unit_multiplier(unit: &str) -> Option<f64> {
    // 'g' and 'b' both mean 1e9 parameters.
    match unit {
        "k" => Some(1e3),
        "m" => Some(1e6),
        "g" | "b" => Some(1e9),
        _ => None,
    }
}

/// Parse a size such as `8b`, `700k` or `10.5m` into a parameter count.
///
/// Only the leading number and unit are considered, so `8b-instruct` is 8e9.
/// Variants like `latest` or `8x7b` yield `None`.
pub fn parse_size(text: &str) -> Option<f64> {
    let lower = text.trim().to_lowercase();
    let caps = SIZE_VALUE_PATTERN.captures(&lower)?;
    let number: f64 = caps.get(1)?.as_str().parse().ok()?;
    Some(number * unit_multiplier(caps.get(2)?.as_str())?)
}

#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    All,
    Substring(String),
    Size { op: CompareOp, threshold: f64 },
}

impl Filter {
    pub fn parse(keyword: &str) -> Self {
        let keyword = keyword.trim();
        if keyword.is_empty() {
            return Filter::All;
        }

        let lower = keyword.to_lowercase();
        if let Some(caps) = SIZE_FILTER_PATTERN.captures(&lower) {
            let op = caps.get(1).and_then(|m| CompareOp::parse(m.as_str()));
            let threshold = caps
                .get(2)
                .zip(caps.get(3))
                .and_then(|(num, unit)| parse_size(&format!("{}{}", num.as_str(), unit.as_str())));
            if let (Some(op), Some(threshold)) = (op, threshold) {
                return Filter::Size { op, threshold };
            }
        }

        Filter::Substring(lower)
    }

    pub fn matches(&self, key: &CompositeKey) -> bool {
        match self {
            Filter::All => true,
            Filter::Substring(needle) => key.to_string().to_lowercase().contains(needle.as_str()),
            Filter::Size { op, threshold } => parse_size(key.variant())
                .map(|value| op.apply(value, *threshold))
                .unwrap_or(false),
        }
    }

    /// Apply to the catalog, keeping catalog order and tagging each model with
    /// a palette color in order of first appearance.
    pub fn apply(&self, entries: &[CatalogEntry]) -> Vec<ListingItem> {
        let mut colors: HashMap<&str, ColorTag> = HashMap::new();
        let mut listing = Vec::new();

        for entry in entries {
            for key in entry.keys().filter(|key| self.matches(key)) {
                let next = colors.len();
                let color = *colors
                    .entry(entry.id.as_str())
                    .or_insert(ColorTag(next % PALETTE_SIZE));
                listing.push(ListingItem { key, color });
            }
        }

        listing
    }
}

/// Filter the catalog by a user keyword. An empty result is not an error;
/// the caller re-prompts.
pub fn filter(entries: &[CatalogEntry], keyword: &str) -> Vec<ListingItem> {
    Filter::parse(keyword).apply(entries)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> Vec<CatalogEntry> {
        vec![
            CatalogEntry::new("llama3.1", vec!["8b".into(), "70b".into(), "405b".into()], ""),
            CatalogEntry::new("nomic-embed-text", Vec::new(), ""),
            CatalogEntry::new("qwen2", vec!["0.5b".into(), "1.5b".into(), "7b".into()], ""),
            CatalogEntry::new("mixtral", vec!["8x7b".into(), "8x22b".into()], ""),
            CatalogEntry::new("all-minilm", vec!["22m".into(), "33m".into()], ""),
        ]
    }

    fn keys(listing: &[ListingItem]) -> Vec<String> {
        listing.iter().map(|item| item.key.to_string()).collect()
    }

    #[test]
    fn empty_keyword_lists_everything_in_catalog_order() {
        let entries = catalog();
        let listing = filter(&entries, "  ");
        let expected: Vec<String> = entries
            .iter()
            .flat_map(|e| e.keys().map(|k| k.to_string()).collect::<Vec<_>>())
            .collect();
        assert_eq!(keys(&listing), expected);
    }

    #[test]
    fn substring_is_case_insensitive_over_composite_key() {
        let listing = filter(&catalog(), "QWEN2:1");
        assert_eq!(keys(&listing), vec!["qwen2:1.5b"]);

        let listing = filter(&catalog(), "latest");
        assert_eq!(keys(&listing), vec!["nomic-embed-text:latest"]);
    }

    #[test]
    fn size_filter_parses_operator_and_unit() {
        assert_eq!(
            Filter::parse(">=8B"),
            Filter::Size { op: CompareOp::Ge, threshold: 8e9 }
        );
        assert_eq!(
            Filter::parse("<1.5g"),
            Filter::Size { op: CompareOp::Lt, threshold: 1.5e9 }
        );
        assert_eq!(
            Filter::parse("=700k"),
            Filter::Size { op: CompareOp::Eq, threshold: 7e5 }
        );
        assert_eq!(Filter::parse(">=8"), Filter::Substring(">=8".into()));
    }

    #[test]
    fn size_filter_is_a_prefix_match_without_spaces() {
        assert_eq!(
            Filter::parse(">8bx"),
            Filter::Size { op: CompareOp::Gt, threshold: 8e9 }
        );
        assert_eq!(
            Filter::parse("==2b-instruct"),
            Filter::Size { op: CompareOp::Eq, threshold: 2e9 }
        );
        assert_eq!(Filter::parse(">= 8b"), Filter::Substring(">= 8b".into()));
        assert_eq!(Filter::parse("=<8b"), Filter::Substring("=<8b".into()));
    }

    #[test]
    fn size_filter_results_satisfy_comparison() {
        for keyword in ["<1b", "<=7b", ">7b", ">=70b", "=8b", "<100m"] {
            let filter = Filter::parse(keyword);
            let Filter::Size { op, threshold } = filter else {
                panic!("{keyword} should be a size filter");
            };
            for item in filter.apply(&catalog()) {
                let value = parse_size(item.key.variant()).unwrap();
                assert!(op.apply(value, threshold), "{} fails {keyword}", item.key);
            }
        }
    }

    #[test]
    fn size_filter_excludes_unparsable_variants() {
        let listing = filter(&catalog(), ">0k");
        let listed = keys(&listing);
        assert!(!listed.contains(&"nomic-embed-text:latest".to_string()));
        assert!(!listed.iter().any(|k| k.starts_with("mixtral")));
        assert_eq!(listed.len(), 8);
    }

    #[test]
    fn size_filter_selects_expected_rows() {
        assert_eq!(
            keys(&filter(&catalog(), "<1b")),
            vec!["qwen2:0.5b", "all-minilm:22m", "all-minilm:33m"]
        );
        assert_eq!(keys(&filter(&catalog(), "=8b")), vec!["llama3.1:8b"]);
    }

    #[test]
    fn g_and_b_units_are_equivalent() {
        assert_eq!(parse_size("8g"), parse_size("8b"));
        assert_eq!(parse_size("8b-instruct"), Some(8e9));
        assert_eq!(parse_size("latest"), None);
        assert_eq!(parse_size("8x7b"), None);
    }

    #[test]
    fn colors_follow_first_appearance_in_filtered_output() {
        let listing = filter(&catalog(), "<1b");
        assert_eq!(listing[0].color, ColorTag(0));
        assert_eq!(listing[1].color, ColorTag(1));
        assert_eq!(listing[2].color, ColorTag(1));
    }

    #[test]
    fn colors_cycle_through_palette() {
        let entries: Vec<_> = (0..12)
            .map(|i| CatalogEntry::new(format!("model{i}"), vec!["1b".into()], ""))
            .collect();
        let listing = filter(&entries, "");
        assert_eq!(listing[9].color, ColorTag(9));
        assert_eq!(listing[10].color, ColorTag(0));
        assert_eq!(listing[11].color, ColorTag(1));
    }

    #[test]
    fn no_match_returns_empty() {
        assert!(filter(&catalog(), "does-not-exist").is_empty());
    }
}
