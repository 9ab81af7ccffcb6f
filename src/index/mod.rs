//! Field Index Module
//!
//! Per-dataset secondary indexes, built in one pass and then read-only.
//!
//! Design:
//! - HashIndex: exact-value lookups by canonical key
//! - TextIndex: case-insensitive substring lookups over whole-string tokens
//! - RangeIndex: sorted numeric entries, binary-searched
//! - A DataIndex is never patched; it is rebuilt wholesale

mod hash_index;
mod range_index;
mod text_index;

pub use hash_index::HashIndex;
pub use range_index::{RangeBounds, RangeIndex, SortedEntry};
pub use text_index::TextIndex;

use crate::config::SearchConfig;
use crate::dataset::Dataset;
use crate::error::{Error, Result};
use crate::path::{collect_paths, get_nested_value};
use crate::value::display_string;
use serde_json::Value;
use std::collections::{BTreeSet, HashMap};
use std::sync::Weak;
use std::time::Instant;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Structure fed one `(row, value)` pair at a time during a build.
pub trait PropertyIndex: Send + Sync {
    /// Record the value of a row
    fn insert(&mut self, row: u32, value: &Value);

    /// Called once after the last insert
    fn seal(&mut self) {}

    /// Number of indexed entries
    fn count(&self) -> usize;
}

/// All indexes for one field path.
#[derive(Debug, Default)]
pub struct FieldIndex {
    pub hash: HashIndex,
    pub inverted: TextIndex,
    pub sorted: RangeIndex,
}

impl FieldIndex {
    /// True when at least one row holds a finite number.
    pub fn is_numeric(&self) -> bool {
        !self.sorted.is_empty()
    }
}

impl PropertyIndex for FieldIndex {
    fn insert(&mut self, row: u32, value: &Value) {
        if value.is_null() {
            return;
        }
        self.hash.insert(row, value);
        self.inverted.insert(row, value);
        self.sorted.insert(row, value);
    }

    fn seal(&mut self) {
        self.sorted.seal();
    }

    fn count(&self) -> usize {
        self.hash.count()
    }
}

pub type FieldMap = HashMap<String, FieldIndex, ahash::RandomState>;

/// Identity of the dataset an index was built from.
///
/// Holds a `Weak` to the rows, so the address it compares against stays
/// reserved for as long as the index lives.
#[derive(Clone, Debug)]
pub struct SourceId(Weak<Vec<Value>>);

impl SourceId {
    pub fn of(data: &Dataset) -> Self {
        Self(data.downgrade())
    }

    /// Whether `data` is the very dataset this id was taken from.
    pub fn is(&self, data: &Dataset) -> bool {
        std::ptr::eq(self.0.as_ptr(), data.as_ptr())
    }
}

/// Index layout, decided by the first row of the dataset.
#[derive(Debug)]
pub enum IndexKind {
    /// Object rows: one FieldIndex per discovered dot-path
    Fields(FieldMap),
    /// Primitive rows: lowercased display string -> rows
    Primitive(TextIndex),
}

/// Complete index for a dataset
#[derive(Debug)]
pub struct DataIndex {
    source: SourceId,
    len: usize,
    kind: IndexKind,
}

/// Check that every row index fits in a `u32`.
pub fn check_row_count(data: &[Value]) -> Result<()> {
    if u32::try_from(data.len()).is_err() {
        tracing::warn!("Refusing to index dataset of {} rows", data.len());
        return Err(Error::DatasetTooLarge { len: data.len() });
    }
    Ok(())
}

/// Whether a dataset is indexed as objects (decided by its first row).
pub fn is_object_dataset(data: &[Value]) -> bool {
    matches!(data.first(), Some(Value::Object(_)))
}

impl DataIndex {
    /// Build the full index for a dataset.
    pub fn build(data: &Dataset, config: &SearchConfig) -> Result<Self> {
        check_row_count(data)?;
        let start = Instant::now();

        let kind = if is_object_dataset(data) {
            IndexKind::Fields(Self::build_fields(data, config.sample_size))
        } else {
            IndexKind::Primitive(Self::build_primitive(data))
        };

        let index = Self { source: SourceId::of(data), len: data.len(), kind };
        tracing::debug!(
            "Built search index: {} rows, {} fields in {:?}",
            index.len,
            index.field_count(),
            start.elapsed()
        );
        Ok(index)
    }

    fn build_primitive(data: &[Value]) -> TextIndex {
        let mut inverted = TextIndex::new();
        for (row, value) in data.iter().enumerate() {
            inverted.insert_token(row as u32, &display_string(value));
        }
        inverted
    }

    fn build_fields(data: &[Value], sample_size: usize) -> FieldMap {
        let mut paths = BTreeSet::new();
        for item in data.iter().take(sample_size) {
            if let Value::Object(object) = item {
                collect_paths(object, "", &mut paths);
            }
        }

        #[cfg(feature = "parallel")]
        let fields = paths
            .into_par_iter()
            .map(|path| {
                let field = Self::build_field(data, &path);
                (path, field)
            })
            .collect();

        #[cfg(not(feature = "parallel"))]
        let fields = paths
            .into_iter()
            .map(|path| {
                let field = Self::build_field(data, &path);
                (path, field)
            })
            .collect();

        fields
    }

    fn build_field(data: &[Value], path: &str) -> FieldIndex {
        let mut field = FieldIndex::default();
        for (row, item) in data.iter().enumerate() {
            if !item.is_object() {
                continue;
            }
            if let Some(value) = get_nested_value(item, path) {
                field.insert(row as u32, value);
            }
        }
        field.seal();
        field
    }

    /// Whether this index still describes `data`: same rows, same length.
    pub fn is_valid_for(&self, data: &Dataset) -> bool {
        self.source.is(data) && self.len == data.len()
    }

    pub fn source(&self) -> &SourceId {
        &self.source
    }

    /// Row count at build time
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn kind(&self) -> &IndexKind {
        &self.kind
    }

    pub fn is_primitive(&self) -> bool {
        matches!(self.kind, IndexKind::Primitive(_))
    }

    pub fn field(&self, path: &str) -> Option<&FieldIndex> {
        match &self.kind {
            IndexKind::Fields(fields) => fields.get(path),
            IndexKind::Primitive(_) => None,
        }
    }

    pub fn primitive(&self) -> Option<&TextIndex> {
        match &self.kind {
            IndexKind::Primitive(inverted) => Some(inverted),
            IndexKind::Fields(_) => None,
        }
    }

    /// Indexed field paths in sorted order. Empty for primitive datasets.
    pub fn field_paths(&self) -> Vec<&str> {
        let mut paths: Vec<&str> = match &self.kind {
            IndexKind::Fields(fields) => fields.keys().map(String::as_str).collect(),
            IndexKind::Primitive(_) => Vec::new(),
        };
        paths.sort_unstable();
        paths
    }

    pub fn field_count(&self) -> usize {
        match &self.kind {
            IndexKind::Fields(fields) => fields.len(),
            IndexKind::Primitive(_) => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn people() -> Dataset {
        Dataset::from(vec![
            json!({"name": {"firstName": "Jesse", "lastName": "Bowen"}, "state": "Seattle", "age": 31}),
            json!({"name": {"firstName": "Jane", "lastName": "Doe"}, "state": "London", "age": 27}),
        ])
    }

    #[test]
    fn test_build_object_fields() {
        let data = people();
        let index = DataIndex::build(&data, &SearchConfig::default()).unwrap();

        assert!(!index.is_primitive());
        assert_eq!(
            index.field_paths(),
            vec!["age", "name", "name.firstName", "name.lastName", "state"]
        );

        let age = index.field("age").unwrap();
        assert!(age.is_numeric());
        let state = index.field("state").unwrap();
        assert!(!state.is_numeric());
        assert!(state.inverted.lookup_substring("sea").contains(0));
        assert!(index.primitive().is_none());
    }

    #[test]
    fn test_build_primitive() {
        let data = Dataset::from(vec![json!("Apple"), json!("banana"), json!(12), json!({"k": "v"}), json!(["x", "y"])]);
        let index = DataIndex::build(&data, &SearchConfig::default()).unwrap();

        assert!(index.is_primitive());
        assert_eq!(index.field_count(), 0);
        let inverted = index.primitive().unwrap();
        assert!(inverted.lookup_substring("apple").contains(0));
        assert!(inverted.lookup_substring("12").contains(2));
        // compound rows are tokenized by display form, not JSON text
        assert!(inverted.lookup_substring("\"k\"").is_empty());
        assert!(inverted.lookup_substring("object").contains(3));
        assert_eq!(inverted.lookup_substring("x,y").iter().collect::<Vec<_>>(), vec![4]);
    }

    #[test]
    fn test_sample_size_limits_schema() {
        let data = Dataset::from(vec![json!({"a": 1}), json!({"a": 2, "late": "x"})]);
        let config = SearchConfig::default().with_sample_size(1);
        let index = DataIndex::build(&data, &config).unwrap();
        assert!(index.field("a").is_some());
        assert!(index.field("late").is_none());

        let index = DataIndex::build(&data, &SearchConfig::default()).unwrap();
        assert!(index.field("late").is_some());
    }

    #[test]
    fn test_non_object_rows_skipped() {
        let data = Dataset::from(vec![json!({"a": "x"}), json!("stray"), json!({"a": "y"})]);
        let index = DataIndex::build(&data, &SearchConfig::default()).unwrap();
        let a = index.field("a").unwrap();
        assert_eq!(a.inverted.lookup_substring("").iter().collect::<Vec<_>>(), vec![0, 2]);
    }

    #[test]
    fn test_validity_by_identity_and_length() {
        let mut data = people();
        let index = DataIndex::build(&data, &SearchConfig::default()).unwrap();
        assert!(index.is_valid_for(&data));

        let shared = data.clone();
        assert!(index.is_valid_for(&shared));

        let copy = Dataset::from(data.to_vec());
        assert!(!index.is_valid_for(&copy));

        // editing rows an index refers to gives them a new identity
        data.make_mut()[0]["state"] = json!("Portland");
        assert!(!index.is_valid_for(&data));
        assert!(index.is_valid_for(&shared));
    }

    #[test]
    fn test_dropped_dataset_address_not_reused() {
        let config = SearchConfig::default();
        let first = people();
        let index = DataIndex::build(&first, &config).unwrap();
        drop(first);

        for _ in 0..64 {
            let next = people();
            assert!(!index.is_valid_for(&next));
        }
    }

    #[test]
    fn test_rows_within_bounds() {
        let data = people();
        let index = DataIndex::build(&data, &SearchConfig::default()).unwrap();
        for path in index.field_paths() {
            let field = index.field(path).unwrap();
            assert!(field.sorted.entries().iter().all(|e| (e.row as usize) < index.len()));
            assert!(field.sorted.entries().windows(2).all(|w| w[0].value <= w[1].value));
        }
    }
}
