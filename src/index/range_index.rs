//! Range Index for O(log n) Numeric Range Queries
//!
//! Sorted array of `(value, row)` with binary search.
//! Filled once during build, then sealed (sorted) before use.

use super::PropertyIndex;
use crate::value::as_number;
use roaring::RoaringBitmap;
use serde_json::Value;

/// Entry in the sorted index
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SortedEntry {
    pub value: f64,
    pub row: u32,
}

/// Numeric bounds. Both strict and inclusive bounds may be set on the
/// same side; the tighter one wins.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RangeBounds {
    pub gt: Option<f64>,
    pub gte: Option<f64>,
    pub lt: Option<f64>,
    pub lte: Option<f64>,
}

impl RangeBounds {
    pub fn is_unbounded(&self) -> bool {
        self.gt.is_none() && self.gte.is_none() && self.lt.is_none() && self.lte.is_none()
    }

    /// True when some bound is not a number; such a range matches nothing.
    fn has_nan(&self) -> bool {
        [self.gt, self.gte, self.lt, self.lte]
            .into_iter()
            .flatten()
            .any(f64::is_nan)
    }

    pub fn contains(&self, n: f64) -> bool {
        self.gt.map_or(true, |b| n > b)
            && self.gte.map_or(true, |b| n >= b)
            && self.lt.map_or(true, |b| n < b)
            && self.lte.map_or(true, |b| n <= b)
    }
}

#[derive(Debug, Default)]
pub struct RangeIndex {
    entries: Vec<SortedEntry>,
    sealed: bool,
}

impl RangeIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index of the first entry with value >= target
    fn lower_bound(&self, target: f64) -> usize {
        self.entries.partition_point(|e| e.value < target)
    }

    /// Index of the first entry with value > target
    fn upper_bound(&self, target: f64) -> usize {
        self.entries.partition_point(|e| e.value <= target)
    }

    /// Rows whose value lies within `bounds`, optionally also equal to `eq`.
    pub fn lookup_range(&self, bounds: &RangeBounds, eq: Option<&Value>) -> RoaringBitmap {
        debug_assert!(self.sealed, "range index queried before seal()");
        if bounds.has_nan() {
            return RoaringBitmap::new();
        }

        let mut lo = 0;
        let mut hi = self.entries.len();
        if let Some(b) = bounds.gte {
            lo = lo.max(self.lower_bound(b));
        }
        if let Some(b) = bounds.gt {
            lo = lo.max(self.upper_bound(b));
        }
        if let Some(b) = bounds.lte {
            hi = hi.min(self.upper_bound(b));
        }
        if let Some(b) = bounds.lt {
            hi = hi.min(self.lower_bound(b));
        }
        if lo >= hi {
            return RoaringBitmap::new();
        }

        let slice = &self.entries[lo..hi];
        match eq {
            None => slice.iter().map(|e| e.row).collect(),
            Some(target) => match as_number(target) {
                Some(n) => slice.iter().filter(|e| e.value == n).map(|e| e.row).collect(),
                None => RoaringBitmap::new(),
            },
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[SortedEntry] {
        &self.entries
    }
}

impl PropertyIndex for RangeIndex {
    fn insert(&mut self, row: u32, value: &Value) {
        if let Some(n) = as_number(value) {
            self.entries.push(SortedEntry { value: n, row });
            self.sealed = false;
        }
    }

    fn seal(&mut self) {
        self.entries
            .sort_unstable_by(|a, b| a.value.total_cmp(&b.value).then(a.row.cmp(&b.row)));
        self.sealed = true;
    }

    fn count(&self) -> usize {
        self.entries.len()
    }
}
