//! SearchEngine — entry point tying the index cache to the planner.

use crate::cache::IndexCache;
use crate::config::SearchConfig;
use crate::dataset::Dataset;
use crate::error::Result;
use crate::index::DataIndex;
use crate::lazy::LazySearch;
use crate::planner::Planner;
use crate::query::SearchRequest;
use crate::types::{SearchResult, Trace};
use serde_json::Value;
use std::sync::Arc;

/// Search engine with its own index cache.
///
/// Clones share the cache. Use one engine per isolated cache, or the
/// free functions in the crate root for the process-wide default.
#[derive(Clone, Debug, Default)]
pub struct SearchEngine {
    cache: Arc<IndexCache>,
    config: SearchConfig,
}

impl SearchEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: SearchConfig) -> Self {
        Self { cache: Arc::new(IndexCache::new()), config }
    }

    /// Engine over an existing (possibly shared) cache.
    pub fn with_cache(cache: Arc<IndexCache>, config: SearchConfig) -> Self {
        Self { cache, config }
    }

    pub fn cache(&self) -> &Arc<IndexCache> {
        &self.cache
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Index for `data`: cached under `key` when given, built fresh otherwise.
    pub fn index_for(&self, data: &Dataset, key: Option<&str>) -> Result<Arc<DataIndex>> {
        match key {
            Some(key) => self.cache.get_or_build(key, data, || DataIndex::build(data, &self.config)),
            None => Ok(Arc::new(DataIndex::build(data, &self.config)?)),
        }
    }

    /// Run a query against `data`.
    pub fn search<'a>(&self, data: &'a Dataset, request: impl Into<SearchRequest>) -> Result<SearchResult<'a>> {
        if data.is_empty() {
            return Ok(self.empty_result());
        }
        let SearchRequest { query, cache_key } = request.into();

        let index = self.index_for(data, cache_key.as_deref())?;
        let rows_of: &'a [Value] = data.rows();
        let mut planner = Planner::new(rows_of, &index);
        let rows = planner.execute(&query);
        let trace = planner.finish();

        tracing::debug!("Search matched {} of {} rows in {}us", rows.len(), data.len(), trace.total_us);

        let results = rows.iter().map(|row| &rows_of[row as usize]).collect();
        Ok(SearchResult::new(results, trace, Arc::clone(&self.cache), cache_key))
    }

    /// Nothing matched and nothing was cached, so `reset` has nothing to drop.
    fn empty_result<'a>(&self) -> SearchResult<'a> {
        SearchResult::new(Vec::new(), Trace::default(), Arc::clone(&self.cache), None)
    }

    /// Run a query given as positional JSON arguments.
    ///
    /// With two or more arguments a trailing string is the cache key:
    /// `[{"price": {"$gte": 200}}, "products"]`.
    /// Empty data short-circuits before the arguments are parsed.
    pub fn search_args<'a>(&self, data: &'a Dataset, args: &[Value]) -> Result<SearchResult<'a>> {
        if data.is_empty() {
            return Ok(self.empty_result());
        }
        self.search(data, SearchRequest::from_args(args)?)
    }

    /// Build (or fetch) the index now and return a handle for repeated
    /// text searches across `keys`.
    pub fn lazy_search<'a>(&self, data: &'a Dataset, keys: &[&str], model_key: Option<&str>) -> Result<LazySearch<'a>> {
        let model_key = model_key.filter(|k| !k.is_empty());
        let index = if data.is_empty() {
            None
        } else {
            Some(self.index_for(data, model_key)?)
        };
        Ok(LazySearch::new(self.clone(), data, keys, model_key, index))
    }

    /// Drop one cached index, or all of them when `key` is `None`.
    pub fn reset_search_index(&self, key: Option<&str>) {
        self.cache.reset(key);
    }
}
