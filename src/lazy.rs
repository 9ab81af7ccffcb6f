//! Reusable text-search handle over one dataset.

use crate::dataset::Dataset;
use crate::engine::SearchEngine;
use crate::index::DataIndex;
use crate::planner::Planner;
use parking_lot::RwLock;
use serde_json::Value;
use std::sync::Arc;

/// Handle returned by `lazy_search`.
///
/// The index is built when the handle is created and held until `reset`.
/// After a reset the next `search` rebuilds it.
#[derive(Debug)]
pub struct LazySearch<'a> {
    engine: SearchEngine,
    data: &'a Dataset,
    keys: Vec<String>,
    model_key: Option<String>,
    index: RwLock<Option<Arc<DataIndex>>>,
}

impl<'a> LazySearch<'a> {
    pub(crate) fn new(
        engine: SearchEngine,
        data: &'a Dataset,
        keys: &[&str],
        model_key: Option<&str>,
        index: Option<Arc<DataIndex>>,
    ) -> Self {
        Self {
            engine,
            data,
            keys: keys.iter().map(|k| k.to_string()).collect(),
            model_key: model_key.map(str::to_string),
            index: RwLock::new(index),
        }
    }

    /// Case-insensitive substring search across the handle's keys, or across
    /// every indexed field when it has none. An empty query returns every row.
    pub fn search(&self, query: &str) -> Vec<&'a Value> {
        let rows_of: &'a [Value] = self.data.rows();
        if query.is_empty() {
            return rows_of.iter().collect();
        }
        let Some(index) = self.current_index() else {
            return Vec::new();
        };

        let mut planner = Planner::new(rows_of, &index);
        let rows = if index.is_primitive() || self.keys.is_empty() {
            planner.evaluate_text(query)
        } else {
            let keys: Vec<&str> = self.keys.iter().map(String::as_str).collect();
            planner.match_keys(&query.to_lowercase(), &keys)
        };
        let trace = planner.finish();
        tracing::trace!("Lazy search for {:?} took {}us", query, trace.total_us);

        rows.iter().map(|row| &rows_of[row as usize]).collect()
    }

    /// Drop the cached index for this handle's key and the index it holds.
    pub fn reset(&self) {
        if let Some(key) = &self.model_key {
            self.engine.reset_search_index(Some(key));
        }
        *self.index.write() = None;
    }

    /// Always false: the index is built synchronously.
    pub fn loading(&self) -> bool {
        false
    }

    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    pub fn model_key(&self) -> Option<&str> {
        self.model_key.as_deref()
    }

    /// Whether an index is currently held.
    pub fn is_indexed(&self) -> bool {
        self.index.read().is_some()
    }

    fn current_index(&self) -> Option<Arc<DataIndex>> {
        if self.data.is_empty() {
            return None;
        }
        if let Some(index) = self.index.read().as_ref() {
            return Some(Arc::clone(index));
        }

        let mut slot = self.index.write();
        if let Some(index) = slot.as_ref() {
            return Some(Arc::clone(index));
        }
        match self.engine.index_for(self.data, self.model_key.as_deref()) {
            Ok(index) => {
                *slot = Some(Arc::clone(&index));
                Some(index)
            }
            Err(err) => {
                tracing::warn!("Failed to rebuild search index: {}", err);
                None
            }
        }
    }
}
