use crate::cache::IndexCache;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

/// Which structure answered a step.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexUsed {
    HashIndex,
    TextIndex,
    RangeIndex,
    PrimitiveIndex,
    /// Index narrowed the candidates, then each was checked
    IndexThenScan,
    Scan,
    /// Set algebra over earlier steps
    Combine,
}

impl IndexUsed {
    pub fn as_str(&self) -> &'static str {
        match self {
            IndexUsed::HashIndex => "hash_index",
            IndexUsed::TextIndex => "text_index",
            IndexUsed::RangeIndex => "range_index",
            IndexUsed::PrimitiveIndex => "primitive_index",
            IndexUsed::IndexThenScan => "index_then_scan",
            IndexUsed::Scan => "scan",
            IndexUsed::Combine => "combine",
        }
    }
}

/// Execution report for one evaluated predicate or combine step
#[derive(Clone, Debug, Serialize)]
pub struct StepReport {
    pub atom: String,
    pub input_size: usize,
    pub output_size: usize,
    pub index_used: IndexUsed,
    pub time_us: u64,
}

/// Trace containing step-by-step execution report
#[derive(Clone, Debug, Default, Serialize)]
pub struct Trace {
    pub steps: Vec<StepReport>,
    pub total_us: u64,
}

impl Trace {
    /// Whether any step fell back to a linear scan.
    pub fn used_scan(&self) -> bool {
        self.steps.iter().any(|s| s.index_used == IndexUsed::Scan)
    }

    pub fn to_json(&self) -> Value {
        serde_json::json!({
            "steps": self.steps.iter().map(|s| serde_json::json!({
                "atom": s.atom,
                "input_size": s.input_size,
                "output_size": s.output_size,
                "index_used": s.index_used.as_str(),
                "time_us": s.time_us
            })).collect::<Vec<_>>(),
            "total_us": self.total_us
        })
    }
}

/// Returned from `search()`
#[derive(Debug)]
pub struct SearchResult<'a> {
    /// Matching rows in dataset order, without duplicates
    pub results: Vec<&'a Value>,
    /// Always false: indexing is synchronous
    pub loading: bool,
    pub trace: Trace,
    pub(crate) cache: Arc<IndexCache>,
    pub(crate) cache_key: Option<String>,
}

impl<'a> SearchResult<'a> {
    pub(crate) fn new(results: Vec<&'a Value>, trace: Trace, cache: Arc<IndexCache>, cache_key: Option<String>) -> Self {
        Self { results, loading: false, trace, cache, cache_key }
    }

    /// Drop the cached index this search used. No-op without a cache key.
    pub fn reset(&self) {
        if let Some(key) = &self.cache_key {
            self.cache.reset(Some(key));
        }
    }

    pub fn cache_key(&self) -> Option<&str> {
        self.cache_key.as_deref()
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Owned copies of the matching rows.
    pub fn to_values(&self) -> Vec<Value> {
        self.results.iter().map(|v| (*v).clone()).collect()
    }
}
