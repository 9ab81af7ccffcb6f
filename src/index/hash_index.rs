//! Hash Index for Exact-Value Lookups
//!
//! Maps the canonical string of a value to the rows holding it.
//! Canonical keys of distinct values may collide (`5` and `"5"`), so
//! callers treat a hit as a candidate set and confirm per row.

use super::PropertyIndex;
use crate::value::canonical_string;
use ahash::AHashMap;
use roaring::RoaringBitmap;
use serde_json::Value;

#[derive(Debug, Default)]
pub struct HashIndex {
    /// canonical value -> rows
    entries: AHashMap<String, RoaringBitmap>,
    rows: u64,
}

impl HashIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rows whose value has the same canonical key as `value`.
    pub fn lookup_eq(&self, value: &Value) -> Option<&RoaringBitmap> {
        self.entries.get(canonical_string(value).as_ref())
    }

    /// Number of distinct keys.
    pub fn key_count(&self) -> usize {
        self.entries.len()
    }
}

impl PropertyIndex for HashIndex {
    fn insert(&mut self, row: u32, value: &Value) {
        if value.is_null() {
            return;
        }
        let key = canonical_string(value);
        match self.entries.get_mut(key.as_ref()) {
            Some(rows) => {
                rows.insert(row);
            }
            None => {
                self.entries.insert(key.into_owned(), RoaringBitmap::from_iter([row]));
            }
        }
        self.rows += 1;
    }

    fn count(&self) -> usize {
        self.rows as usize
    }
}
