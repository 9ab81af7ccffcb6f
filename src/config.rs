//! Engine configuration.

use serde::{Deserialize, Serialize};

/// Default number of leading rows sampled to discover field paths.
pub const DEFAULT_SAMPLE_SIZE: usize = 100;

/// Search engine configuration
///
/// # Example
/// ```
/// use cari::SearchConfig;
///
/// let config = SearchConfig::default().with_sample_size(500);
/// assert_eq!(config.sample_size, 500);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Rows inspected when inferring the schema of an object dataset.
    /// Fields that first appear after the sample are not indexed and
    /// are answered by a linear scan instead.
    pub sample_size: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self { sample_size: DEFAULT_SAMPLE_SIZE }
    }
}

impl SearchConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the schema sample size. Zero is raised to one so that at least
    /// the first row contributes paths.
    pub fn with_sample_size(mut self, sample_size: usize) -> Self {
        self.sample_size = sample_size.max(1);
        self
    }
}
