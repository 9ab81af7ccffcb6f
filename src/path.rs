//! Dot-notation path helpers.
//!
//! `name.firstName` addresses `{"name": {"firstName": ..}}`. Paths are used
//! in two directions: discovering which paths of a dataset to index, and
//! flattening nested query objects into per-path predicates.

use crate::query::is_operator_object;
use serde_json::{Map, Value};
use std::collections::BTreeSet;

/// Resolve a dot-path against a value.
///
/// Returns `None` when the path is empty, contains an empty segment, or
/// walks through anything that is not an object.
pub fn get_nested_value<'v>(value: &'v Value, path: &str) -> Option<&'v Value> {
    if path.is_empty() {
        return None;
    }
    let mut current = value;
    for segment in path.split('.') {
        if segment.is_empty() {
            return None;
        }
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

/// Collect every reachable path of an object into `out`.
///
/// Arrays and scalars are terminal. A nested object contributes its own
/// path as well as all of its descendants, so queries may target either.
pub fn collect_paths(object: &Map<String, Value>, prefix: &str, out: &mut BTreeSet<String>) {
    for (key, value) in object {
        let full_path = join(prefix, key);
        if let Value::Object(nested) = value {
            collect_paths(nested, &full_path, out);
        }
        out.insert(full_path);
    }
}

/// Flatten a query object into `(path, value)` pairs.
///
/// Nested plain objects are walked; operator objects (`{"$gte": 10}`) and
/// every other value are kept as leaves.
pub fn flatten_query(query: &Map<String, Value>) -> Vec<(String, &Value)> {
    let mut out = Vec::new();
    flatten_into(query, "", &mut out);
    out
}

fn flatten_into<'q>(query: &'q Map<String, Value>, prefix: &str, out: &mut Vec<(String, &'q Value)>) {
    for (key, value) in query {
        let full_path = join(prefix, key);
        match value {
            Value::Object(nested) if !is_operator_object(value) => {
                flatten_into(nested, &full_path, out);
            }
            _ => out.push((full_path, value)),
        }
    }
}

fn join(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{prefix}.{key}")
    }
}
