//! WebAssembly (Wasm) bindings for Cari
//!
//! Datasets are parsed once into a `WasmDataset`, which owns its rows so
//! that cached indexes stay valid across calls from JavaScript.

use ::cari::{Dataset, SearchConfig, SearchEngine};
use serde_json::Value;
use wasm_bindgen::prelude::*;

/// Cache key used by lazy handles created without a model key.
const PRIVATE_LAZY_KEY: &str = "lazy";

fn js_err(context: &str, err: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&format!("{}: {}", context, err))
}

fn to_json(rows: Vec<Value>) -> Result<String, JsValue> {
    serde_json::to_string(&rows).map_err(|e| js_err("JSON serialization failed", e))
}

/// A parsed JSON array of rows.
#[wasm_bindgen]
pub struct WasmDataset {
    rows: Dataset,
}

#[wasm_bindgen]
impl WasmDataset {
    /// Parse a JSON array. Anything else is an error.
    #[wasm_bindgen(constructor)]
    pub fn new(json: &str) -> Result<WasmDataset, JsValue> {
        let rows: Vec<Value> = serde_json::from_str(json).map_err(|e| js_err("Dataset must be a JSON array", e))?;
        Ok(WasmDataset { rows: Dataset::from(rows) })
    }

    #[wasm_bindgen(getter)]
    pub fn length(&self) -> usize {
        self.rows.len()
    }
}

#[wasm_bindgen]
pub struct WasmSearchEngine {
    engine: SearchEngine,
}

#[wasm_bindgen]
impl WasmSearchEngine {
    #[wasm_bindgen(constructor)]
    pub fn new(sample_size: Option<usize>) -> WasmSearchEngine {
        #[cfg(feature = "console_error_panic_hook")]
        console_error_panic_hook::set_once();

        let mut config = SearchConfig::default();
        if let Some(sample_size) = sample_size {
            config = config.with_sample_size(sample_size);
        }
        WasmSearchEngine { engine: SearchEngine::with_config(config) }
    }

    /// Search with positional arguments given as a JSON array, e.g.
    /// `[{"price": {"$gte": 200}}, "products"]`. Returns matching rows as JSON.
    pub fn search(&self, dataset: &WasmDataset, args_json: &str) -> Result<String, JsValue> {
        let args: Vec<Value> = serde_json::from_str(args_json).map_err(|e| js_err("Arguments must be a JSON array", e))?;
        let result = self
            .engine
            .search_args(&dataset.rows, &args)
            .map_err(|e| js_err("Search failed", e))?;
        to_json(result.to_values())
    }

    /// Search and return the execution trace as JSON instead of rows.
    pub fn explain(&self, dataset: &WasmDataset, args_json: &str) -> Result<String, JsValue> {
        let args: Vec<Value> = serde_json::from_str(args_json).map_err(|e| js_err("Arguments must be a JSON array", e))?;
        let result = self
            .engine
            .search_args(&dataset.rows, &args)
            .map_err(|e| js_err("Search failed", e))?;
        Ok(result.trace.to_json().to_string())
    }

    /// Create a text-search handle. `keys` is an array of field paths.
    #[wasm_bindgen(js_name = lazySearch)]
    pub fn lazy_search(&self, dataset: &WasmDataset, keys: JsValue, model_key: Option<String>) -> Result<WasmLazySearch, JsValue> {
        let keys: Vec<String> = if keys.is_undefined() || keys.is_null() {
            Vec::new()
        } else {
            serde_wasm_bindgen::from_value(keys).map_err(|e| js_err("Keys must be an array of strings", e))?
        };

        // Without a model key the handle keeps its index in a private cache.
        let (engine, key) = match model_key.filter(|k| !k.is_empty()) {
            Some(key) => (self.engine.clone(), key),
            None => (SearchEngine::with_config(self.engine.config().clone()), PRIVATE_LAZY_KEY.to_string()),
        };

        let handle = WasmLazySearch { engine, rows: dataset.rows.clone(), keys, key };
        handle.with_lazy(|_| ())?;
        Ok(handle)
    }

    /// Drop one cached index, or all of them when `key` is omitted.
    #[wasm_bindgen(js_name = resetSearchIndex)]
    pub fn reset_search_index(&self, key: Option<String>) {
        self.engine.reset_search_index(key.as_deref());
    }
}

#[wasm_bindgen]
pub struct WasmLazySearch {
    engine: SearchEngine,
    rows: Dataset,
    keys: Vec<String>,
    key: String,
}

impl WasmLazySearch {
    fn with_lazy<T>(&self, f: impl FnOnce(&::cari::LazySearch<'_>) -> T) -> Result<T, JsValue> {
        let keys: Vec<&str> = self.keys.iter().map(String::as_str).collect();
        let lazy = self
            .engine
            .lazy_search(&self.rows, &keys, Some(&self.key))
            .map_err(|e| js_err("Index build failed", e))?;
        Ok(f(&lazy))
    }
}

#[wasm_bindgen]
impl WasmLazySearch {
    /// Substring search across the handle's keys. Returns matching rows as JSON.
    pub fn search(&self, query: &str) -> Result<String, JsValue> {
        let rows: Vec<Value> = self.with_lazy(|lazy| lazy.search(query).into_iter().cloned().collect())?;
        to_json(rows)
    }

    pub fn reset(&self) {
        self.engine.reset_search_index(Some(&self.key));
    }

    #[wasm_bindgen(getter)]
    pub fn loading(&self) -> bool {
        false
    }
}
