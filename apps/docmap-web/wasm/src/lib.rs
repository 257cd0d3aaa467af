//! WASM form enhancer for document uploads
//!
//! Shows a preview of the chosen or stored document and lets the user map
//! extracted field names to a fixed set of canonical keys. All state is held
//! in Rust; the page only loads the module and calls `attachFormEnhancer`.
//!
//! ## Usage (JavaScript)
//!
//! ```javascript
//! import init, { attachFormEnhancer, MappingEditor } from './pkg/docmap_wasm.js';
//!
//! await init();
//!
//! // Whole form: preview + editor, defaults match the upload form.
//! // Stays attached for the life of the page.
//! window.CSV_KEYS = ["description", "product_code", "price", "quantity"];
//! await attachFormEnhancer({ mediaPrefix: "/media/" });
//!
//! // Or own the instance explicitly; freeing it tears the form back down
//! const enhancer = new FormEnhancer({ mediaPrefix: "/media/" });
//! enhancer.start();
//!
//! // Editor only
//! const editor = new MappingEditor(container, textarea.value, ["price", "quantity"]);
//! editor.addRow();
//! editor.save(); // writes into #id_extra_data
//! ```

pub mod dom;
pub mod editor;
pub mod enhancer;
pub mod preview;

use wasm_bindgen::prelude::*;

// Re-export main types for JavaScript
pub use editor::{EditorSettings, MappingEditor};
pub use enhancer::{attach_form_enhancer, detach_form_enhancer, FormEnhancer};

/// Initialize the WASM module
/// Called automatically by wasm-bindgen
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
    web_sys::console::log_1(&"docmap WASM initialized".into());
}

/// Get the library version
#[wasm_bindgen(js_name = getVersion)]
pub fn get_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

/// Apply the save rules to a JSON array of `{key, value}` rows and return
/// the pretty-printed mapping object
#[wasm_bindgen(js_name = normalizeMapping)]
pub fn normalize_mapping(rows_json: &str) -> Result<String, JsValue> {
    docmap_core::normalize_mapping(rows_json).map_err(|e| JsValue::from_str(&e.to_string()))
}

/// Parse a saved mapping blob into the rows an editor would show
#[wasm_bindgen(js_name = parsePrefill)]
pub fn parse_prefill(prefill_json: &str) -> Result<JsValue, JsValue> {
    let (rows, warning) = docmap_core::rows_for_prefill(prefill_json);
    if let Some(e) = warning {
        web_sys::console::warn_2(&"Couldn't parse extra_data JSON".into(), &e.to_string().into());
    }
    serde_wasm_bindgen::to_value(&rows)
        .map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
}
