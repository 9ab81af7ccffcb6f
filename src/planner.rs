//! Query planner and evaluator.
//!
//! Every predicate is answered by the cheapest structure that can answer
//! it and folded into a running candidate bitmap. Rows come back as a
//! `RoaringBitmap`, so results are always in dataset order and free of
//! duplicates, whatever mix of indexes and scans produced them.

use crate::index::{DataIndex, FieldIndex, IndexKind};
use crate::path::get_nested_value;
use crate::query::{Operators, Predicate, Query, QueryObject};
use crate::types::{IndexUsed, StepReport, Trace};
use crate::value::{as_number, contains_ci, display_string, loose_eq};
use roaring::RoaringBitmap;
use serde_json::Value;
use std::borrow::Cow;
use std::time::Instant;

/// Outcome of asking a field index about one predicate.
#[derive(Debug)]
pub(crate) enum Resolution {
    /// These rows are exactly the matches
    Exact(RoaringBitmap),
    /// Matches are a subset of these rows; each must be checked
    Narrowed(RoaringBitmap),
    /// The index cannot help
    Scan,
}

/// Resolve a predicate through a field's indexes where possible.
pub(crate) fn resolve_field_via_index(field: &FieldIndex, predicate: &Predicate) -> (Resolution, IndexUsed) {
    match predicate {
        Predicate::Match(Value::String(s)) => (
            Resolution::Exact(field.inverted.lookup_substring(&s.to_lowercase())),
            IndexUsed::TextIndex,
        ),
        // null is never indexed
        Predicate::Match(Value::Null) => (Resolution::Scan, IndexUsed::Scan),
        Predicate::Match(value) => (Resolution::Narrowed(hash_candidates(field, value)), IndexUsed::HashIndex),
        Predicate::Ops(ops) => resolve_operators(field, ops),
    }
}

fn resolve_operators(field: &FieldIndex, ops: &Operators) -> (Resolution, IndexUsed) {
    if ops.has_range() {
        if !field.is_numeric() {
            // Range operators only ever match numbers.
            return (Resolution::Exact(RoaringBitmap::new()), IndexUsed::RangeIndex);
        }
        let hits = field.sorted.lookup_range(&ops.bounds(), ops.eq.as_ref());
        return if ops.is_range_only() {
            (Resolution::Exact(hits), IndexUsed::RangeIndex)
        } else {
            (Resolution::Narrowed(hits), IndexUsed::IndexThenScan)
        };
    }

    if let Some(eq) = &ops.eq {
        if eq.is_null() {
            return (Resolution::Scan, IndexUsed::Scan);
        }
        let used = if ops.is_eq_only() { IndexUsed::HashIndex } else { IndexUsed::IndexThenScan };
        return (Resolution::Narrowed(hash_candidates(field, eq)), used);
    }

    if let Some(needle) = &ops.contains {
        let hits = field.inverted.lookup_substring(needle);
        return if ops.is_contains_only() {
            (Resolution::Exact(hits), IndexUsed::TextIndex)
        } else {
            (Resolution::Narrowed(hits), IndexUsed::IndexThenScan)
        };
    }

    (Resolution::Scan, IndexUsed::Scan)
}

fn hash_candidates(field: &FieldIndex, value: &Value) -> RoaringBitmap {
    field.hash.lookup_eq(value).cloned().unwrap_or_default()
}

/// Test a resolved field value (`None` when missing) against operators.
pub fn matches_operators(value: Option<&Value>, ops: &Operators) -> bool {
    if let Some(want) = ops.exists {
        let exists = value.is_some_and(|v| !v.is_null());
        if want != exists {
            return false;
        }
    }

    if let Some(eq) = &ops.eq {
        if !value.is_some_and(|v| loose_eq(v, eq)) {
            return false;
        }
    }

    if let Some(ne) = &ops.ne {
        if value.is_some_and(|v| loose_eq(v, ne)) {
            return false;
        }
    }

    if ops.has_range() {
        match value.and_then(as_number) {
            Some(n) if ops.bounds().contains(n) => {}
            _ => return false,
        }
    }

    if let Some(needle) = &ops.contains {
        if !value.is_some_and(|v| contains_ci(v, needle)) {
            return false;
        }
    }

    if let Some(needle) = &ops.excludes {
        if value.is_some_and(|v| contains_ci(v, needle)) {
            return false;
        }
    }

    if let Some(re) = &ops.regex {
        let text = value.map_or(Cow::Borrowed("undefined"), display_string);
        if !re.is_match(&text) {
            return false;
        }
    }

    true
}

/// Test a resolved field value against any predicate.
pub fn matches_predicate(value: Option<&Value>, predicate: &Predicate) -> bool {
    match predicate {
        Predicate::Ops(ops) => matches_operators(value, ops),
        Predicate::Match(Value::String(s)) => {
            let needle = s.to_lowercase();
            value.is_some_and(|v| contains_ci(v, &needle))
        }
        Predicate::Match(expected) => value.is_some_and(|v| loose_eq(v, expected)),
    }
}

/// Evaluates queries against one dataset and its index, recording a trace.
pub(crate) struct Planner<'a> {
    data: &'a [Value],
    index: &'a DataIndex,
    trace: Trace,
    started: Instant,
}

impl<'a> Planner<'a> {
    pub(crate) fn new(data: &'a [Value], index: &'a DataIndex) -> Self {
        debug_assert_eq!(index.len(), data.len());
        Self { data, index, trace: Trace::default(), started: Instant::now() }
    }

    pub(crate) fn finish(mut self) -> Trace {
        self.trace.total_us = self.started.elapsed().as_micros() as u64;
        self.trace
    }

    pub(crate) fn execute(&mut self, query: &Query) -> RoaringBitmap {
        match query {
            Query::All => self.all_rows(),
            Query::Text(text) => self.evaluate_text(text),
            Query::AnyOf { any, all } => {
                let start = Instant::now();
                let mut rows = RoaringBitmap::new();
                for object in any {
                    rows |= self.evaluate_query_object(object);
                }
                self.record("or".to_string(), any.len(), rows.len(), IndexUsed::Combine, start);

                for object in all {
                    if rows.is_empty() {
                        break;
                    }
                    let start = Instant::now();
                    let input_size = rows.len() as usize;
                    rows &= self.evaluate_query_object(object);
                    self.record("and".to_string(), input_size, rows.len(), IndexUsed::Combine, start);
                }
                rows
            }
            Query::Where(objects) => {
                let mut rows: Option<RoaringBitmap> = None;
                for object in objects {
                    let start = Instant::now();
                    let matches = self.evaluate_query_object(object);
                    let input_size = rows.as_ref().map_or(self.data.len(), |r| r.len() as usize);
                    match rows {
                        Some(ref mut curr) => *curr &= matches,
                        None => rows = Some(matches),
                    }
                    let output_size = rows.as_ref().map_or(0, RoaringBitmap::len);
                    self.record("and".to_string(), input_size, output_size, IndexUsed::Combine, start);
                    if output_size == 0 {
                        break;
                    }
                }
                rows.unwrap_or_default()
            }
        }
    }

    /// Rows matching every predicate of one query object.
    pub(crate) fn evaluate_query_object(&mut self, object: &QueryObject) -> RoaringBitmap {
        if object.is_empty() {
            return self.all_rows();
        }

        let mut candidates: Option<RoaringBitmap> = None;

        for (path, predicate) in object.predicates() {
            let start = Instant::now();
            let input_size = candidates.as_ref().map_or(self.data.len(), |c| c.len() as usize);

            let (matches, index_used) = match self.index.field(path) {
                Some(field) => match resolve_field_via_index(field, predicate) {
                    (Resolution::Exact(hits), used) => (hits, used),
                    (Resolution::Narrowed(hits), used) => {
                        let narrowed = match &candidates {
                            Some(curr) => hits & curr,
                            None => hits,
                        };
                        (self.scan(path, predicate, Some(&narrowed)), used)
                    }
                    (Resolution::Scan, used) => (self.scan(path, predicate, candidates.as_ref()), used),
                },
                None => {
                    tracing::trace!("No index for '{}', scanning {} rows", path, input_size);
                    (self.scan(path, predicate, candidates.as_ref()), IndexUsed::Scan)
                }
            };

            match candidates {
                Some(ref mut curr) => *curr &= matches,
                None => candidates = Some(matches),
            }

            let output_size = candidates.as_ref().map_or(0, RoaringBitmap::len);
            self.record(path.clone(), input_size, output_size, index_used, start);
            if output_size == 0 {
                break;
            }
        }

        candidates.unwrap_or_default()
    }

    /// Substring search: the primitive index for primitive datasets,
    /// otherwise an OR across every indexed field.
    pub(crate) fn evaluate_text(&mut self, text: &str) -> RoaringBitmap {
        let needle = text.to_lowercase();
        let index = self.index;
        match index.kind() {
            IndexKind::Primitive(inverted) => {
                let start = Instant::now();
                let rows = inverted.lookup_substring(&needle);
                self.record(format!("text {text:?}"), self.data.len(), rows.len(), IndexUsed::PrimitiveIndex, start);
                rows
            }
            IndexKind::Fields(_) => self.match_keys(&needle, &index.field_paths()),
        }
    }

    /// OR of case-insensitive substring matches across `keys`.
    /// `needle` must already be lowercase.
    pub(crate) fn match_keys(&mut self, needle: &str, keys: &[&str]) -> RoaringBitmap {
        let mut rows = RoaringBitmap::new();
        for key in keys {
            let start = Instant::now();
            let (hits, used) = match self.index.field(key) {
                Some(field) => (field.inverted.lookup_substring(needle), IndexUsed::TextIndex),
                None => {
                    let predicate = Predicate::Match(Value::String(needle.to_string()));
                    (self.scan(key, &predicate, None), IndexUsed::Scan)
                }
            };
            self.record(key.to_string(), self.data.len(), hits.len(), used, start);
            rows |= hits;
        }
        rows
    }

    /// Check `predicate` row by row over `candidates`, or every row.
    fn scan(&self, path: &str, predicate: &Predicate, candidates: Option<&RoaringBitmap>) -> RoaringBitmap {
        let check = |row: u32| {
            let item = &self.data[row as usize];
            item.is_object() && matches_predicate(get_nested_value(item, path), predicate)
        };
        match candidates {
            Some(rows) => rows.iter().filter(|&row| check(row)).collect(),
            None => (0..self.data.len() as u32).filter(|&row| check(row)).collect(),
        }
    }

    fn all_rows(&self) -> RoaringBitmap {
        let mut rows = RoaringBitmap::new();
        rows.insert_range(0..self.data.len() as u32);
        rows
    }

    fn record(&mut self, atom: String, input_size: usize, output_size: u64, index_used: IndexUsed, start: Instant) {
        self.trace.steps.push(StepReport {
            atom,
            input_size,
            output_size: output_size as usize,
            index_used,
            time_us: start.elapsed().as_micros() as u64,
        });
    }
}
