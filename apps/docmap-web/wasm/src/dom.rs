//! Small DOM helpers shared by the preview renderer and the mapping editor

use docmap_core::{CanonicalKeys, DocmapError};
use js_sys::Reflect;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{
    Document, Element, HtmlElement, HtmlInputElement, HtmlSelectElement, HtmlTextAreaElement, Node,
    UrlSearchParams, Window,
};

pub fn window() -> Result<Window, JsValue> {
    web_sys::window().ok_or_else(|| JsValue::from_str("No window object available"))
}

pub fn document() -> Result<Document, JsValue> {
    window()?
        .document()
        .ok_or_else(|| JsValue::from_str("No document object available"))
}

/// Create an element and cast it to its concrete type
pub fn create<T: JsCast>(document: &Document, tag: &str) -> Result<T, JsValue> {
    document
        .create_element(tag)?
        .dyn_into::<T>()
        .map_err(|_| JsValue::from_str(&format!("<{}> has an unexpected element type", tag)))
}

pub fn set_styles(element: &HtmlElement, styles: &[(&str, &str)]) -> Result<(), JsValue> {
    let style = element.style();
    for (name, value) in styles {
        style.set_property(name, value)?;
    }
    Ok(())
}

/// `querySelector` that treats an invalid selector like a missing element
pub fn query(document: &Document, selector: &str) -> Option<Element> {
    match document.query_selector(selector) {
        Ok(found) => found,
        Err(e) => {
            web_sys::console::warn_2(&format!("Invalid selector {}:", selector).into(), &e);
            None
        }
    }
}

/// Current value of a textarea, input or select
pub fn read_field(element: &Element) -> Option<String> {
    if let Some(textarea) = element.dyn_ref::<HtmlTextAreaElement>() {
        Some(textarea.value())
    } else if let Some(input) = element.dyn_ref::<HtmlInputElement>() {
        Some(input.value())
    } else {
        element
            .dyn_ref::<HtmlSelectElement>()
            .map(HtmlSelectElement::value)
    }
}

/// Set the value of a textarea or input. Returns false for other elements.
pub fn write_field(element: &Element, value: &str) -> bool {
    if let Some(textarea) = element.dyn_ref::<HtmlTextAreaElement>() {
        textarea.set_value(value);
        true
    } else if let Some(input) = element.dyn_ref::<HtmlInputElement>() {
        input.set_value(value);
        true
    } else {
        false
    }
}

/// Insert `node` right after `reference`. Returns false when `reference`
/// has no parent.
pub fn insert_after(reference: &Element, node: &Element) -> Result<bool, JsValue> {
    match reference.parent_node() {
        Some(parent) => {
            parent.insert_before(node, reference.next_sibling().as_ref())?;
            Ok(true)
        }
        None => Ok(false),
    }
}

/// Remove every child of `parent` except `keep`
pub fn clear_children_except(parent: &Element, keep: &Node) -> Result<(), JsValue> {
    let mut child = parent.first_child();
    while let Some(node) = child {
        child = node.next_sibling();
        if !node.is_same_node(Some(keep)) {
            parent.remove_child(&node)?;
        }
    }
    Ok(())
}

/// Red inline message used for every preview failure
pub fn error_message(document: &Document, text: &str) -> Result<HtmlElement, JsValue> {
    let p: HtmlElement = create(document, "p")?;
    p.set_class_name("preview-error");
    p.set_text_content(Some(text));
    set_styles(&p, &[("color", "red")])?;
    Ok(p)
}

/// Read a query parameter, decoding it once more on top of the query
/// parser's own decoding so double-encoded paths come out readable
pub fn query_param(window: &Window, name: &str) -> Option<String> {
    let search = window.location().search().ok()?;
    let params = UrlSearchParams::new_with_str(&search).ok()?;
    let value = params.get(name)?;
    match js_sys::decode_uri_component(&value) {
        Ok(decoded) => Some(String::from(decoded)),
        Err(_) => Some(value),
    }
}

/// Allowed mapping values published by the page as a global array.
/// A missing global gives no options; anything but an array is logged and
/// ignored.
pub fn global_options(window: &Window, name: &str) -> CanonicalKeys {
    let value = Reflect::get(window, &JsValue::from_str(name)).unwrap_or(JsValue::UNDEFINED);
    let parsed = serde_wasm_bindgen::from_value::<serde_json::Value>(value)
        .map_err(|e| DocmapError::InvalidConfig(e.to_string()))
        .and_then(|value| CanonicalKeys::from_value(&value));
    match parsed {
        Ok(keys) => keys,
        Err(e) => {
            web_sys::console::warn_2(&format!("window.{}:", name).into(), &e.to_string().into());
            CanonicalKeys::default()
        }
    }
}

/// Best-effort readable text for a rejected promise or thrown value
pub fn describe_js_error(value: &JsValue) -> String {
    if let Some(text) = value.as_string() {
        return text;
    }
    if let Some(error) = value.dyn_ref::<js_sys::Error>() {
        return String::from(error.message());
    }
    format!("{:?}", value)
}

pub fn now_millis() -> u64 {
    js_sys::Date::now() as u64
}
