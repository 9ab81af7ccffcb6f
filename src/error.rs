//! Error types for the search engine.

use thiserror::Error;

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// A `$regex` operand is not valid regex syntax.
    #[error("invalid $regex pattern '{pattern}': {source}")]
    InvalidRegex {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// Row indices are stored as `u32`; larger datasets cannot be indexed.
    #[error("dataset has {len} rows, more than the {} supported", u32::MAX)]
    DatasetTooLarge { len: usize },
}
