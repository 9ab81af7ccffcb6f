//! IndexCache — keyed store of built dataset indexes.
//!
//! Entries are validated on every lookup by dataset identity and length;
//! a mismatch rebuilds the entry in place. An entry never keeps its
//! dataset alive, but its identity cannot be taken over by another one. There is no TTL and no size
//! bound: callers drop entries with `reset` / `clear`.
//!
//! Check, build and store for one key run under that key's shard lock,
//! so concurrent callers never build the same key twice.

use crate::error::Result;
use crate::dataset::Dataset;
use crate::index::DataIndex;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Counters for cache behaviour.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

#[derive(Debug, Default)]
pub struct IndexCache {
    /// model key -> built index
    entries: DashMap<String, Arc<DataIndex>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl IndexCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached index for `key` if it still matches `data`,
    /// otherwise run `build`, store the result and return it.
    pub fn get_or_build<F>(&self, key: &str, data: &Dataset, build: F) -> Result<Arc<DataIndex>>
    where
        F: FnOnce() -> Result<DataIndex>,
    {
        if let Some(cached) = self.entries.get(key) {
            if cached.is_valid_for(data) {
                self.hits.fetch_add(1, Ordering::Relaxed);
                tracing::trace!("Search index cache hit for '{}'", key);
                return Ok(Arc::clone(&cached));
            }
        }

        match self.entries.entry(key.to_string()) {
            // Another caller may have rebuilt it between the read and the lock.
            Entry::Occupied(entry) if entry.get().is_valid_for(data) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Ok(Arc::clone(entry.get()))
            }
            Entry::Occupied(mut entry) => {
                tracing::debug!("Search index for '{}' is stale, rebuilding", key);
                self.misses.fetch_add(1, Ordering::Relaxed);
                let index = Arc::new(build()?);
                entry.insert(Arc::clone(&index));
                Ok(index)
            }
            Entry::Vacant(entry) => {
                tracing::debug!("No search index for '{}', building", key);
                self.misses.fetch_add(1, Ordering::Relaxed);
                let index = Arc::new(build()?);
                entry.insert(Arc::clone(&index));
                Ok(index)
            }
        }
    }

    /// Cached index for `key`, without validation.
    pub fn get(&self, key: &str) -> Option<Arc<DataIndex>> {
        self.entries.get(key).map(|entry| Arc::clone(&entry))
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Drop one key, or every key when `key` is `None`.
    pub fn reset(&self, key: Option<&str>) {
        match key {
            Some(key) => {
                if self.entries.remove(key).is_some() {
                    tracing::debug!("Reset search index '{}'", key);
                }
            }
            None => self.clear(),
        }
    }

    pub fn clear(&self) {
        tracing::debug!("Clearing {} search indexes", self.entries.len());
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.entries.len(),
        }
    }
}
