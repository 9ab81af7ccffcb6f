// Cari - Index-accelerated in-memory search over JSON collections
// Hash, text and range indexes per field, cached by key

pub mod api;
pub mod cache;
pub mod config;
pub mod dataset;
pub mod engine;
pub mod error;
pub mod index;
pub mod lazy;
pub mod path;
pub mod planner;
pub mod query;
pub mod types;
pub mod value;

// Re-export main types
pub use api::{default_engine, lazy_search, reset_search_index, search, search_args};
pub use cache::{CacheStats, IndexCache};
pub use config::SearchConfig;
pub use dataset::Dataset;
pub use engine::SearchEngine;
pub use error::{Error, Result};
pub use index::DataIndex;
pub use lazy::LazySearch;
pub use path::get_nested_value;
pub use planner::{matches_operators, matches_predicate};
pub use query::{Operators, Predicate, Query, QueryObject, SearchRequest};
pub use types::{IndexUsed, SearchResult, StepReport, Trace};
