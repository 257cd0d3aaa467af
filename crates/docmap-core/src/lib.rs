//! Document preview and key-mapping logic
//!
//! This crate holds the target-independent half of the form enhancer:
//! - `mapping`: editor rows, prefill parsing, de-duplicated save output
//! - `options`: the fixed set of canonical keys a row may map to
//! - `preview`: which document to show and whether it is a PDF or an image
//! - `config`: selectors, parameter names and labels with form defaults
//!
//! The browser crate wires these to the DOM.

pub mod config;
pub mod error;
pub mod mapping;
pub mod options;
pub mod preview;

pub use config::{EnhancerConfig, Labels, SaveStatus};
pub use error::DocmapError;
pub use mapping::{initial_rows, parse_prefill, Mapping, RowDraft};
pub use options::CanonicalKeys;
pub use preview::{
    classify_mime, classify_url, saved_path_url, versioned_url, PreviewKind, PreviewSource,
};

/// Run the save logic over a JSON array of `{key, value}` rows and return
/// the pretty-printed mapping object
pub fn normalize_mapping(rows_json: &str) -> Result<String, DocmapError> {
    let rows: Vec<RowDraft> = serde_json::from_str(rows_json)
        .map_err(|e| DocmapError::SerializationError(e.to_string()))?;
    Mapping::from_rows(&rows).to_json_pretty()
}

/// Rows an editor would start with for this prefill blob.
///
/// Unparseable or non-object input is reported through the error side of
/// the tuple while still yielding the single blank row.
pub fn rows_for_prefill(raw: &str) -> (Vec<RowDraft>, Option<DocmapError>) {
    match parse_prefill(raw) {
        Ok(rows) => (initial_rows(rows), None),
        Err(e) => (initial_rows(Vec::new()), Some(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_normalize_mapping_empty() {
        assert_eq!(normalize_mapping("[]").unwrap(), "{}");
    }

    #[test]
    fn test_normalize_mapping_duplicates() {
        let json = normalize_mapping(
            r#"[{"key": "x", "value": "price"}, {"key": "x", "value": "quantity"}, {"key": "y"}]"#,
        )
        .unwrap();
        assert_eq!(json, "{\n  \"x\": \"price\",\n  \"x_2\": \"quantity\"\n}");
    }

    #[test]
    fn test_normalize_mapping_rejects_non_array() {
        assert!(matches!(
            normalize_mapping(r#"{"x": "price"}"#),
            Err(DocmapError::SerializationError(_))
        ));
    }

    #[test]
    fn test_rows_for_malformed_prefill() {
        let (rows, warning) = rows_for_prefill("{\"a\": ");
        assert_eq!(rows, vec![RowDraft::blank()]);
        assert!(matches!(warning, Some(DocmapError::InvalidPrefill(_))));
    }

    #[test]
    fn test_rows_for_valid_prefill() {
        let (rows, warning) = rows_for_prefill(r#"{"Qty": "quantity"}"#);
        assert_eq!(rows, vec![RowDraft::new("Qty", "quantity")]);
        assert!(warning.is_none());
    }
}
