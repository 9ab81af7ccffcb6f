// Query model and JSON query parser
//
// Queries arrive either as typed values built in Rust or as JSON literals
// (`{"price": {"$gte": 200}}`). JSON literals are parsed once into the typed
// form; regexes are compiled here so evaluation itself cannot fail.

use crate::error::{Error, Result};
use crate::index::RangeBounds;
use crate::path::flatten_query;
use crate::value::{coerce_number, display_string, truthy};
use regex::{Regex, RegexBuilder};
use serde_json::{Map, Value};
use smallvec::SmallVec;

/// Reserved keys that mark an object as an operator object.
pub const OPERATOR_KEYS: [&str; 10] = [
    "$eq", "$ne", "$gt", "$gte", "$lt", "$lte", "$in", "$nin", "$regex", "$exists",
];

/// Whether a JSON value is an operator object such as `{"$gte": 10}`.
pub fn is_operator_object(value: &Value) -> bool {
    match value {
        Value::Object(map) => map.keys().any(|k| OPERATOR_KEYS.contains(&k.as_str())),
        _ => false,
    }
}

// ============================================================================
// Operators
// ============================================================================

/// Comparison operators for one field. Every set operator must hold.
#[derive(Clone, Debug, Default)]
pub struct Operators {
    pub eq: Option<Value>,
    pub ne: Option<Value>,
    pub gt: Option<f64>,
    pub gte: Option<f64>,
    pub lt: Option<f64>,
    pub lte: Option<f64>,
    /// `$in`: case-insensitive substring, stored lowercased
    pub contains: Option<String>,
    /// `$nin`: negated `$in`, stored lowercased
    pub excludes: Option<String>,
    pub regex: Option<Regex>,
    pub exists: Option<bool>,
}

impl Operators {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, value: impl Into<Value>) -> Self {
        self.eq = Some(value.into());
        self
    }
    pub fn ne(mut self, value: impl Into<Value>) -> Self {
        self.ne = Some(value.into());
        self
    }
    pub fn gt(mut self, bound: f64) -> Self {
        self.gt = Some(bound);
        self
    }
    pub fn gte(mut self, bound: f64) -> Self {
        self.gte = Some(bound);
        self
    }
    pub fn lt(mut self, bound: f64) -> Self {
        self.lt = Some(bound);
        self
    }
    pub fn lte(mut self, bound: f64) -> Self {
        self.lte = Some(bound);
        self
    }
    pub fn contains(mut self, needle: &str) -> Self {
        self.contains = Some(needle.to_lowercase());
        self
    }
    pub fn excludes(mut self, needle: &str) -> Self {
        self.excludes = Some(needle.to_lowercase());
        self
    }
    /// Use a prebuilt regex as-is (its own flags apply).
    pub fn regex(mut self, regex: Regex) -> Self {
        self.regex = Some(regex);
        self
    }
    pub fn exists(mut self, exists: bool) -> Self {
        self.exists = Some(exists);
        self
    }

    /// Parse the operator keys of a JSON object. Unknown keys are ignored.
    pub fn from_json(map: &Map<String, Value>) -> Result<Self> {
        let mut ops = Self::new();
        for (key, value) in map {
            match key.as_str() {
                "$eq" => ops.eq = Some(value.clone()),
                "$ne" => ops.ne = Some(value.clone()),
                "$gt" => ops.gt = Some(coerce_number(value)),
                "$gte" => ops.gte = Some(coerce_number(value)),
                "$lt" => ops.lt = Some(coerce_number(value)),
                "$lte" => ops.lte = Some(coerce_number(value)),
                "$in" => ops.contains = Some(display_string(value).to_lowercase()),
                "$nin" => ops.excludes = Some(display_string(value).to_lowercase()),
                "$regex" => ops.regex = Some(compile_regex(&display_string(value))?),
                "$exists" => ops.exists = Some(truthy(value)),
                _ => {}
            }
        }
        Ok(ops)
    }

    pub fn bounds(&self) -> RangeBounds {
        RangeBounds { gt: self.gt, gte: self.gte, lt: self.lt, lte: self.lte }
    }

    pub fn has_range(&self) -> bool {
        !self.bounds().is_unbounded()
    }

    /// Only range operators, optionally with `$eq`.
    pub fn is_range_only(&self) -> bool {
        self.has_range()
            && self.ne.is_none()
            && self.contains.is_none()
            && self.excludes.is_none()
            && self.regex.is_none()
            && self.exists.is_none()
    }

    /// Exactly `$eq` and nothing else.
    pub fn is_eq_only(&self) -> bool {
        self.eq.is_some() && self.without_eq_is_empty()
    }

    /// Exactly `$in` and nothing else.
    pub fn is_contains_only(&self) -> bool {
        self.contains.is_some()
            && self.eq.is_none()
            && self.ne.is_none()
            && !self.has_range()
            && self.excludes.is_none()
            && self.regex.is_none()
            && self.exists.is_none()
    }

    fn without_eq_is_empty(&self) -> bool {
        self.ne.is_none()
            && !self.has_range()
            && self.contains.is_none()
            && self.excludes.is_none()
            && self.regex.is_none()
            && self.exists.is_none()
    }
}

/// `$regex` strings are case-insensitive.
fn compile_regex(pattern: &str) -> Result<Regex> {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .map_err(|source| Error::InvalidRegex { pattern: pattern.to_string(), source })
}

// ============================================================================
// Predicates and query objects
// ============================================================================

/// Condition on one field path.
#[derive(Clone, Debug)]
pub enum Predicate {
    /// Direct value: strings match by substring, anything else by equality
    Match(Value),
    Ops(Operators),
}

impl Predicate {
    pub fn from_json(value: &Value) -> Result<Self> {
        match value {
            Value::Object(map) if is_operator_object(value) => Ok(Self::Ops(Operators::from_json(map)?)),
            _ => Ok(Self::Match(value.clone())),
        }
    }
}

impl From<Operators> for Predicate {
    fn from(ops: Operators) -> Self {
        Self::Ops(ops)
    }
}

/// AND of field predicates, already flattened to dot-paths.
#[derive(Clone, Debug, Default)]
pub struct QueryObject {
    predicates: SmallVec<[(String, Predicate); 4]>,
}

impl QueryObject {
    pub fn new() -> Self {
        Self::default()
    }

    /// Direct-value predicate on `path`.
    pub fn field(mut self, path: &str, value: impl Into<Value>) -> Self {
        self.predicates.push((path.to_string(), Predicate::Match(value.into())));
        self
    }

    /// Operator predicate on `path`.
    pub fn op(mut self, path: &str, ops: Operators) -> Self {
        self.predicates.push((path.to_string(), Predicate::Ops(ops)));
        self
    }

    /// Parse a JSON query object, flattening nested plain objects.
    pub fn from_json(map: &Map<String, Value>) -> Result<Self> {
        let mut query = Self::new();
        for (path, value) in flatten_query(map) {
            query.predicates.push((path, Predicate::from_json(value)?));
        }
        Ok(query)
    }

    pub fn predicates(&self) -> &[(String, Predicate)] {
        &self.predicates
    }

    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }
}

// ============================================================================
// Queries and requests
// ============================================================================

#[derive(Clone, Debug, Default)]
pub enum Query {
    /// No query: every row
    #[default]
    All,
    /// Substring search over primitives, or over every field of objects
    Text(String),
    /// AND across query objects
    Where(Vec<QueryObject>),
    /// OR across `any`, then AND with each of `all`
    AnyOf { any: Vec<QueryObject>, all: Vec<QueryObject> },
}

impl Query {
    pub fn text(text: &str) -> Self {
        Self::Text(text.to_string())
    }

    pub fn all_of(objects: Vec<QueryObject>) -> Self {
        Self::Where(objects)
    }

    pub fn any_of(objects: Vec<QueryObject>) -> Self {
        Self::AnyOf { any: objects, all: Vec::new() }
    }

    /// Build a query from positional JSON arguments (cache key removed).
    ///
    /// A leading string is a text query and the rest is ignored. A leading
    /// array is an OR group, and later objects AND with it. Otherwise every
    /// object argument is ANDed. Arguments of the wrong shape are skipped.
    pub fn from_args(args: &[Value]) -> Result<Self> {
        match args.first() {
            None => Ok(Self::All),
            Some(Value::String(text)) => Ok(Self::Text(text.clone())),
            Some(Value::Array(group)) => Ok(Self::AnyOf {
                any: objects_of(group.iter())?,
                all: objects_of(args[1..].iter())?,
            }),
            Some(_) => Ok(Self::Where(objects_of(args.iter())?)),
        }
    }
}

fn objects_of<'v>(values: impl Iterator<Item = &'v Value>) -> Result<Vec<QueryObject>> {
    values
        .filter_map(Value::as_object)
        .map(QueryObject::from_json)
        .collect()
}

impl From<QueryObject> for Query {
    fn from(object: QueryObject) -> Self {
        Self::Where(vec![object])
    }
}

/// A query plus the optional cache key its index is stored under.
#[derive(Clone, Debug, Default)]
pub struct SearchRequest {
    pub query: Query,
    pub cache_key: Option<String>,
}

impl SearchRequest {
    pub fn new(query: impl Into<Query>) -> Self {
        Self { query: query.into(), cache_key: None }
    }

    /// An empty key disables caching, like no key at all.
    pub fn with_cache_key(mut self, key: &str) -> Self {
        self.cache_key = (!key.is_empty()).then(|| key.to_string());
        self
    }

    /// Split positional arguments into query and cache key.
    ///
    /// With two or more arguments, a trailing string is the cache key.
    /// A lone string is always the query.
    pub fn from_args(args: &[Value]) -> Result<Self> {
        match args.split_last() {
            Some((Value::String(key), rest)) if !rest.is_empty() => {
                Ok(Self::new(Query::from_args(rest)?).with_cache_key(key))
            }
            _ => Ok(Self::new(Query::from_args(args)?)),
        }
    }
}

impl From<Query> for SearchRequest {
    fn from(query: Query) -> Self {
        Self::new(query)
    }
}

impl From<QueryObject> for SearchRequest {
    fn from(object: QueryObject) -> Self {
        Self::new(object)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_operator_detection() {
        assert!(is_operator_object(&json!({"$gte": 1})));
        assert!(is_operator_object(&json!({"$exists": true, "other": 1})));
        assert!(!is_operator_object(&json!({"firstName": "x"})));
        assert!(!is_operator_object(&json!({"$unknown": 1})));
        assert!(!is_operator_object(&json!(["$eq"])));
    }

    #[test]
    fn test_parse_operators() {
        let map = json!({"$gte": 10, "$lt": "20", "$in": "ABC", "$exists": true, "$eq": null});
        let ops = Operators::from_json(map.as_object().unwrap()).unwrap();
        assert_eq!(ops.gte, Some(10.0));
        assert_eq!(ops.lt, Some(20.0));
        assert_eq!(ops.contains.as_deref(), Some("abc"));
        assert_eq!(ops.exists, Some(true));
        assert_eq!(ops.eq, Some(Value::Null));
    }

    #[test]
    fn test_non_numeric_bound_is_nan() {
        let map = json!({"$gt": "abc"});
        let ops = Operators::from_json(map.as_object().unwrap()).unwrap();
        assert!(ops.gt.unwrap().is_nan());
    }

    #[test]
    fn test_bounds_coerce_scalars() {
        let map = json!({"$gte": true, "$lte": null, "$lt": ""});
        let ops = Operators::from_json(map.as_object().unwrap()).unwrap();
        assert_eq!(ops.gte, Some(1.0));
        assert_eq!(ops.lte, Some(0.0));
        assert_eq!(ops.lt, Some(0.0));
    }

    #[test]
    fn test_substring_operands_use_display_form() {
        let map = json!({"$in": ["Cot", "Ton"], "$nin": {"a": 1}});
        let ops = Operators::from_json(map.as_object().unwrap()).unwrap();
        assert_eq!(ops.contains.as_deref(), Some("cot,ton"));
        assert_eq!(ops.excludes.as_deref(), Some("[object object]"));
    }

    #[test]
    fn test_regex_case_insensitive() {
        let map = json!({"$regex": "^ja"});
        let ops = Operators::from_json(map.as_object().unwrap()).unwrap();
        assert!(ops.regex.unwrap().is_match("Jane"));
    }

    #[test]
    fn test_invalid_regex_is_error() {
        let map = json!({"$regex": "(unclosed"});
        let err = Operators::from_json(map.as_object().unwrap()).unwrap_err();
        assert!(matches!(err, Error::InvalidRegex { .. }));
    }

    #[test]
    fn test_shape_classification() {
        let range = Operators::new().gte(1.0).eq(json!(3));
        assert!(range.is_range_only());
        assert!(!range.is_eq_only());

        let mixed = Operators::new().gte(1.0).regex(Regex::new("x").unwrap());
        assert!(!mixed.is_range_only());

        assert!(Operators::new().eq(json!(1)).is_eq_only());
        assert!(!Operators::new().eq(json!(1)).ne(json!(2)).is_eq_only());
        assert!(Operators::new().contains("a").is_contains_only());
        assert!(!Operators::new().contains("a").exists(true).is_contains_only());
    }

    #[test]
    fn test_query_object_flattens() {
        let q = json!({"name": {"firstName": "ess"}, "price": {"$gte": 200}});
        let object = QueryObject::from_json(q.as_object().unwrap()).unwrap();
        let paths: Vec<&str> = object.predicates().iter().map(|(p, _)| p.as_str()).collect();
        assert_eq!(paths, vec!["name.firstName", "price"]);
        assert!(matches!(object.predicates()[1].1, Predicate::Ops(_)));
    }

    #[test]
    fn test_query_from_args() {
        assert!(matches!(Query::from_args(&[]).unwrap(), Query::All));
        assert!(matches!(Query::from_args(&[json!("an")]).unwrap(), Query::Text(t) if t == "an"));

        let and = Query::from_args(&[json!({"a": 1}), json!({"b": 2})]).unwrap();
        assert!(matches!(and, Query::Where(ref objs) if objs.len() == 2));

        let or = Query::from_args(&[json!([{"a": 1}, {"b": 2}]), json!({"c": 3})]).unwrap();
        assert!(matches!(or, Query::AnyOf { ref any, ref all } if any.len() == 2 && all.len() == 1));
    }

    #[test]
    fn test_request_cache_key_disambiguation() {
        let req = SearchRequest::from_args(&[json!("an")]).unwrap();
        assert!(req.cache_key.is_none());
        assert!(matches!(req.query, Query::Text(_)));

        let req = SearchRequest::from_args(&[json!("an"), json!("Fruit")]).unwrap();
        assert_eq!(req.cache_key.as_deref(), Some("Fruit"));
        assert!(matches!(req.query, Query::Text(ref t) if t == "an"));

        let req = SearchRequest::from_args(&[json!({"a": 1}), json!({"b": 2}), json!("Product")]).unwrap();
        assert_eq!(req.cache_key.as_deref(), Some("Product"));
        assert!(matches!(req.query, Query::Where(ref objs) if objs.len() == 2));

        let req = SearchRequest::from_args(&[json!({"a": 1}), json!("")]).unwrap();
        assert!(req.cache_key.is_none());
    }
}
