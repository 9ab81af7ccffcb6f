//! JSON value helpers shared by the indexes and the evaluator.
//!
//! Canonical strings follow JavaScript `String()` rendering for scalars so
//! that `5`, `5.0` and `"5"` all land on the same hash key; arrays and
//! objects use their JSON text. Display strings render compound values the
//! way browser callers see them (`"a,b"`, `"[object Object]"`) and are what
//! text tokens, `$in`/`$nin` operands and `$regex` subjects are built from.

use serde_json::{Number, Value};
use std::borrow::Cow;

/// Canonical string form of a value.
pub fn canonical_string(value: &Value) -> Cow<'_, str> {
    match value {
        Value::String(s) => Cow::Borrowed(s.as_str()),
        Value::Number(n) => Cow::Owned(number_string(n)),
        Value::Bool(true) => Cow::Borrowed("true"),
        Value::Bool(false) => Cow::Borrowed("false"),
        Value::Null => Cow::Borrowed("null"),
        Value::Array(_) | Value::Object(_) => Cow::Owned(value.to_string()),
    }
}

fn number_string(n: &Number) -> String {
    if n.is_i64() || n.is_u64() {
        return n.to_string();
    }
    match n.as_f64() {
        Some(f) if f == 0.0 => "0".to_string(),
        Some(f) if f.fract() == 0.0 && f.abs() < 1e21 => format!("{f:.0}"),
        Some(f) => f.to_string(),
        None => n.to_string(),
    }
}

/// Display form of a value: scalars as in `canonical_string`, arrays as
/// their elements joined with `,` (null elements empty), objects as
/// `[object Object]`.
pub fn display_string(value: &Value) -> Cow<'_, str> {
    match value {
        Value::Array(items) => Cow::Owned(join_elements(items)),
        Value::Object(_) => Cow::Borrowed("[object Object]"),
        _ => canonical_string(value),
    }
}

fn join_elements(items: &[Value]) -> String {
    let mut out = String::new();
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        if !item.is_null() {
            out.push_str(&display_string(item));
        }
    }
    out
}

/// Numeric coercion for range operands. `null` and `false` are 0, `true`
/// is 1, blank strings are 0 and other strings must parse as a decimal
/// number. Arrays coerce through their display string; objects are NaN.
pub fn coerce_number(value: &Value) -> f64 {
    match value {
        Value::Null | Value::Bool(false) => 0.0,
        Value::Bool(true) => 1.0,
        Value::Number(n) => n.as_f64().unwrap_or(f64::NAN),
        Value::String(s) => parse_decimal(s),
        Value::Array(items) => parse_decimal(&join_elements(items)),
        Value::Object(_) => f64::NAN,
    }
}

fn parse_decimal(text: &str) -> f64 {
    let text = text.trim();
    if text.is_empty() {
        return 0.0;
    }
    match text.strip_prefix(['+', '-']).unwrap_or(text) {
        "Infinity" => {
            if text.starts_with('-') { f64::NEG_INFINITY } else { f64::INFINITY }
        }
        // str::parse would also take "inf" and "nan"
        rest if rest.starts_with(|c: char| c.is_ascii_digit() || c == '.') => text.parse().unwrap_or(f64::NAN),
        _ => f64::NAN,
    }
}

/// Numeric view of a value. Strings are never numeric here.
pub fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64().filter(|f| f.is_finite()),
        _ => None,
    }
}

/// Strict equality with numbers compared by value (`1 == 1.0`).
pub fn loose_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => {
            if let (Some(x), Some(y)) = (x.as_i64(), y.as_i64()) {
                return x == y;
            }
            if let (Some(x), Some(y)) = (x.as_u64(), y.as_u64()) {
                return x == y;
            }
            match (x.as_f64(), y.as_f64()) {
                (Some(x), Some(y)) => x == y,
                _ => false,
            }
        }
        _ => a == b,
    }
}

/// Case-insensitive substring test against a string value or any string
/// element of an array value. `needle` must already be lowercase.
pub fn contains_ci(value: &Value, needle: &str) -> bool {
    match value {
        Value::String(s) => s.to_lowercase().contains(needle),
        Value::Array(items) => items
            .iter()
            .any(|v| matches!(v, Value::String(s) if s.to_lowercase().contains(needle))),
        _ => false,
    }
}

/// JavaScript truthiness, used for non-boolean `$exists` operands.
pub fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
