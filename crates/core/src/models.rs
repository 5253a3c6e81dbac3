use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Variant used when the catalog lists no sizes for a model.
pub const DEFAULT_VARIANT: &str = "latest";

/// One model scraped from the catalog listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub id: String,
    pub size_variants: Vec<String>,
    pub description: String,
}

impl CatalogEntry {
    pub fn new(id: impl Into<String>, size_variants: Vec<String>, description: impl Into<String>) -> Self {
        let size_variants = if size_variants.is_empty() {
            vec![DEFAULT_VARIANT.to_string()]
        } else {
            size_variants
        };

        Self {
            id: id.into(),
            size_variants,
            description: description.into(),
        }
    }

    /// Composite keys for every variant, in catalog order.
    pub fn keys(&self) -> impl Iterator<Item = CompositeKey> + '_ {
        self.size_variants
            .iter()
            .map(move |variant| CompositeKey::new(&self.id, variant))
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum KeyError {
    #[error("'{0}' is not of the form model:variant")]
    MissingSeparator(String),
    #[error("'{0}' has an empty model or variant")]
    EmptyPart(String),
}

/// The fetchable unit, written `id:variant`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CompositeKey {
    id: String,
    variant: String,
}

impl CompositeKey {
    pub fn new(id: impl Into<String>, variant: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            variant: variant.into(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn variant(&self) -> &str {
        &self.variant
    }
}

impl fmt::Display for CompositeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.id, self.variant)
    }
}

impl FromStr for CompositeKey {
    type Err = KeyError;

    // Split on the last ':' so namespaced ids like "user/model" survive.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (id, variant) = s
            .rsplit_once(':')
            .ok_or_else(|| KeyError::MissingSeparator(s.to_string()))?;

        if id.is_empty() || variant.is_empty() {
            return Err(KeyError::EmptyPart(s.to_string()));
        }

        Ok(Self::new(id, variant))
    }
}

/// Index into the fixed display palette. Rendering is left to the front end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ColorTag(pub usize);

/// A numbered row of the selectable listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingItem {
    pub key: CompositeKey,
    pub color: ColorTag,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn composite_key_round_trips() {
        let key: CompositeKey = "modelX:8b".parse().unwrap();
        assert_eq!(key.id(), "modelX");
        assert_eq!(key.variant(), "8b");
        assert_eq!(key.to_string(), "modelX:8b");
    }

    #[test]
    fn composite_key_keeps_namespaced_ids() {
        let key: CompositeKey = "library/qwen:0.5b".parse().unwrap();
        assert_eq!(key.id(), "library/qwen");
        assert_eq!(key.variant(), "0.5b");
    }

    #[test]
    fn composite_key_rejects_malformed_input() {
        assert_eq!(
            "llama3".parse::<CompositeKey>(),
            Err(KeyError::MissingSeparator("llama3".to_string()))
        );
        assert_eq!(
            ":8b".parse::<CompositeKey>(),
            Err(KeyError::EmptyPart(":8b".to_string()))
        );
    }

    #[test]
    fn entry_without_sizes_defaults_to_latest() {
        let entry = CatalogEntry::new("nomic-embed-text", Vec::new(), "");
        let keys: Vec<_> = entry.keys().map(|k| k.to_string()).collect();
        assert_eq!(keys, vec!["nomic-embed-text:latest"]);
    }
}
