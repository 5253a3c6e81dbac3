//! Locally available models, used only to annotate the listing.

use std::collections::HashSet;

use crate::models::CompositeKey;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocalInventory {
    names: HashSet<String>,
}

impl LocalInventory {
    /// Parse `ollama list` output: the first whitespace token of each
    /// non-empty line, skipping the `NAME ...` header.
    pub fn parse(output: &str) -> Self {
        let names = output
            .lines()
            .filter_map(|line| line.split_whitespace().next())
            .filter(|name| *name != "NAME")
            .map(str::to_string)
            .collect();
        Self { names }
    }

    pub fn contains(&self, key: &CompositeKey) -> bool {
        self.names.contains(&key.to_string())
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LIST_OUTPUT: &str = "\
NAME                    ID              SIZE      MODIFIED
llama3.1:8b             42182419e950    4.7 GB    2 days ago

qwen2:0.5b              6f48b936a09f    352 MB    3 weeks ago
";

    #[test]
    fn parses_first_column_and_skips_header() {
        let inventory = LocalInventory::parse(LIST_OUTPUT);
        assert_eq!(inventory.len(), 2);
        assert!(inventory.contains(&CompositeKey::new("llama3.1", "8b")));
        assert!(inventory.contains(&CompositeKey::new("qwen2", "0.5b")));
        assert!(!inventory.contains(&CompositeKey::new("qwen2", "1.5b")));
    }

    #[test]
    fn empty_output_is_empty_inventory() {
        assert!(LocalInventory::parse("").is_empty());
        assert!(LocalInventory::parse("\n\n").is_empty());
    }
}
