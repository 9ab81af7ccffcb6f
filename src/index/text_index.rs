//! Inverted text index for case-insensitive substring lookups.
//!
//! Tokens are whole lowercased strings (or string elements of arrays),
//! not words. A lookup scans every token for the needle.

use super::PropertyIndex;
use ahash::AHashMap;
use roaring::RoaringBitmap;
use serde_json::Value;

#[derive(Debug, Default)]
pub struct TextIndex {
    tokens: AHashMap<String, RoaringBitmap>,
    rows: u64,
}

impl TextIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a raw token. The token is lowercased here.
    pub fn insert_token(&mut self, row: u32, token: &str) {
        self.tokens.entry(token.to_lowercase()).or_default().insert(row);
        self.rows += 1;
    }

    /// Union of rows for every token containing `needle`.
    /// `needle` must already be lowercase.
    pub fn lookup_substring(&self, needle: &str) -> RoaringBitmap {
        let mut hits = RoaringBitmap::new();
        for (token, rows) in &self.tokens {
            if token.contains(needle) {
                hits |= rows;
            }
        }
        hits
    }

    pub fn token_count(&self) -> usize {
        self.tokens.len()
    }
}

impl PropertyIndex for TextIndex {
    fn insert(&mut self, row: u32, value: &Value) {
        match value {
            Value::String(s) => self.insert_token(row, s),
            Value::Array(items) => {
                for item in items {
                    if let Value::String(s) = item {
                        self.insert_token(row, s);
                    }
                }
            }
            _ => {}
        }
    }

    fn count(&self) -> usize {
        self.rows as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_substring_case_insensitive() {
        let mut idx = TextIndex::new();
        idx.insert(0, &json!("Jesse"));
        idx.insert(1, &json!("Jane"));

        assert_eq!(idx.lookup_substring("ess").iter().collect::<Vec<_>>(), vec![0]);
        assert_eq!(idx.lookup_substring("j").len(), 2);
        assert!(idx.lookup_substring("xyz").is_empty());
    }

    #[test]
    fn test_array_elements_are_tokens() {
        let mut idx = TextIndex::new();
        idx.insert(4, &json!(["Rust", 3, "Go"]));
        idx.insert(5, &json!(42));

        assert!(idx.lookup_substring("rus").contains(4));
        assert!(idx.lookup_substring("go").contains(4));
        assert!(idx.lookup_substring("42").is_empty());
        assert_eq!(idx.token_count(), 2);
    }

    #[test]
    fn test_shared_token_merges_rows() {
        let mut idx = TextIndex::new();
        idx.insert_token(0, "Apple");
        idx.insert_token(3, "apple");
        assert_eq!(idx.token_count(), 1);
        assert_eq!(idx.lookup_substring("app").len(), 2);
    }
}
