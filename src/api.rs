//! Free functions over a process-wide default engine.

use crate::dataset::Dataset;
use crate::engine::SearchEngine;
use crate::error::Result;
use crate::lazy::LazySearch;
use crate::query::SearchRequest;
use crate::types::SearchResult;
use serde_json::Value;
use std::sync::LazyLock;

static DEFAULT_ENGINE: LazyLock<SearchEngine> = LazyLock::new(SearchEngine::new);

/// The engine behind the free functions.
pub fn default_engine() -> &'static SearchEngine {
    &DEFAULT_ENGINE
}

/// Search `data` using the default engine.
///
/// # Example
/// ```
/// use cari::{search, Dataset, Operators, QueryObject, SearchRequest};
/// use serde_json::json;
///
/// let data = Dataset::from(vec![json!({"price": 150}), json!({"price": 250})]);
/// let request = SearchRequest::new(QueryObject::new().op("price", Operators::new().gte(200.0)))
///     .with_cache_key("doc-products");
/// let result = search(&data, request).unwrap();
/// assert_eq!(result.results, vec![&data[1]]);
/// ```
pub fn search<'a>(data: &'a Dataset, request: impl Into<SearchRequest>) -> Result<SearchResult<'a>> {
    DEFAULT_ENGINE.search(data, request)
}

/// Search `data` with positional JSON arguments using the default engine.
pub fn search_args<'a>(data: &'a Dataset, args: &[Value]) -> Result<SearchResult<'a>> {
    DEFAULT_ENGINE.search_args(data, args)
}

/// Create a text-search handle using the default engine.
pub fn lazy_search<'a>(data: &'a Dataset, keys: &[&str], model_key: Option<&str>) -> Result<LazySearch<'a>> {
    DEFAULT_ENGINE.lazy_search(data, keys, model_key)
}

/// Drop one default-engine index, or all of them when `key` is `None`.
pub fn reset_search_index(key: Option<&str>) {
    DEFAULT_ENGINE.reset_search_index(key);
}
