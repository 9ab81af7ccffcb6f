//! Shared fixtures for integration tests.
//!
//! Each test builds its own `SearchEngine`, so caches never leak between
//! tests. Tests that touch the default engine use keys unique to the test.

#![allow(dead_code)]

use cari::{Dataset, SearchEngine};
use rstest::fixture;
use serde_json::json;
use std::sync::Once;

static TRACING: Once = Once::new();

/// Install a test-writer subscriber once. Filter with `RUST_LOG=cari=debug`.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

#[fixture]
pub fn engine() -> SearchEngine {
    init_tracing();
    SearchEngine::new()
}

#[fixture]
pub fn people() -> Dataset {
    Dataset::from(vec![
        json!({"name": {"firstName": "Jesse", "lastName": "Bowen"}, "state": "Seattle", "age": 31}),
        json!({"name": {"firstName": "Jane", "lastName": "Doe"}, "state": "London", "age": 27}),
    ])
}

#[fixture]
pub fn products() -> Dataset {
    Dataset::from(vec![
        json!({"name": "Linen Shirt", "category": "clothes", "price": 150, "tags": ["summer"]}),
        json!({"name": "Wool Coat", "category": "clothes", "price": 250, "tags": ["winter", "wool"]}),
        json!({"name": "Oak Desk", "category": "home", "price": 200}),
        json!({"name": "Floor Lamp", "category": "home", "price": "unknown"}),
        json!({"name": "Gift Card", "category": "misc", "price": 200.0, "stock": null}),
    ])
}
