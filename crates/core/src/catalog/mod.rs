//! Catalog extraction from the model library listing page.
//!
//! The listing is an HTML document where every model lives in an
//! `<li x-test-model>` block carrying a `x-test-model-title` div, zero or more
//! `x-test-size` spans and a short description paragraph. Extraction is a pure
//! function of the page text.

pub mod source;

use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;
use thiserror::Error;
use tracing::debug;

use crate::models::CatalogEntry;

pub use source::CatalogSource;

#[allow(clippy::expect_used)]
static TITLE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<div x-test-model-title title="([^"]+)""#).expect("title regex is valid")
});

#[allow(clippy::expect_used)]
static BLOCK_START_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<li[^>]*x-test-model[^>]*>").expect("block regex is valid"));

#[allow(clippy::expect_used)]
static SIZE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<span[^>]*x-test-size[^>]*>([^<]+)</span>").expect("size regex is valid")
});

#[allow(clippy::expect_used)]
static DESCRIPTION_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<p[^>]*>([^<]*)</p>").expect("description regex is valid"));

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("HTTP error: {status} fetching {url}")]
    Status { url: String, status: u16 },

    #[error("failed to fetch model list from {url}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("failed to access cached model list at {path}")]
    Cache {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("no models found in the catalog page")]
    Empty,
}

/// Turns raw catalog bytes into entries.
pub trait CatalogProvider {
    fn entries(&self, raw: &str) -> Result<Vec<CatalogEntry>, CatalogError>;
}

/// Extracts entries from the library listing HTML.
#[derive(Debug, Default, Clone, Copy)]
pub struct HtmlCatalog;

impl CatalogProvider for HtmlCatalog {
    fn entries(&self, raw: &str) -> Result<Vec<CatalogEntry>, CatalogError> {
        let entries = extract_entries(raw);
        if entries.is_empty() {
            return Err(CatalogError::Empty);
        }
        Ok(entries)
    }
}

/// Extracts every model in page order. Duplicate titles keep their first block.
pub fn extract_entries(html: &str) -> Vec<CatalogEntry> {
    let block_starts: Vec<usize> = BLOCK_START_PATTERN
        .find_iter(html)
        .map(|m| m.start())
        .collect();

    let mut seen = HashSet::new();
    let mut entries = Vec::new();

    for caps in TITLE_PATTERN.captures_iter(html) {
        let (Some(whole), Some(title)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        let id = title.as_str().trim();
        if id.is_empty() || !seen.insert(id.to_string()) {
            continue;
        }

        let (sizes, description) = match enclosing_block(html, &block_starts, whole.start()) {
            Some(block) => (extract_sizes(block), extract_description(block)),
            None => (Vec::new(), String::new()),
        };

        debug!(model = id, variants = sizes.len(), "extracted catalog entry");
        entries.push(CatalogEntry::new(id, sizes, description));
    }

    entries
}

/// The `<li x-test-model>` block containing `pos`, ending at the next block or
/// at the closing `</li>` after the title, whichever comes first.
fn enclosing_block<'a>(html: &'a str, block_starts: &[usize], pos: usize) -> Option<&'a str> {
    let idx = block_starts.partition_point(|&start| start <= pos);
    let start = *block_starts.get(idx.checked_sub(1)?)?;
    let next = block_starts.get(idx).copied().unwrap_or(html.len());

    let end = html[pos..next]
        .find("</li>")
        .map(|offset| pos + offset + "</li>".len())
        .unwrap_or(next);

    Some(&html[start..end])
}

fn extract_sizes(block: &str) -> Vec<String> {
    SIZE_PATTERN
        .captures_iter(block)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_lowercase())
        .filter(|size| !size.is_empty())
        .collect()
}

fn extract_description(block: &str) -> String {
    DESCRIPTION_PATTERN
        .captures_iter(block)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().split_whitespace().collect::<Vec<_>>().join(" "))
        .find(|text| !text.is_empty())
        .map(|text| decode_entities(&text))
        .unwrap_or_default()
}

fn decode_entities(text: &str) -> String {
    text.replace("&#39;", "'")
        .replace("&quot;", "\"")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}
