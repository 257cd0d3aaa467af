//! The fixed set of canonical keys a mapping may target
//!
//! Supplied by the hosting page. Order is preserved because it is the order
//! the dropdown presents them in.

use serde::{Deserialize, Serialize};

use crate::error::DocmapError;

/// Ordered, de-duplicated list of allowed mapping values
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct CanonicalKeys {
    keys: Vec<String>,
}

impl CanonicalKeys {
    /// Build from any list of strings, dropping blanks and repeats
    pub fn new<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut out: Vec<String> = Vec::new();
        for key in keys {
            let key = key.into();
            let key = key.trim();
            if key.is_empty() || out.iter().any(|existing| existing == key) {
                continue;
            }
            out.push(key.to_string());
        }
        Self { keys: out }
    }

    /// Parse a JSON array of strings. Non-string entries are skipped.
    pub fn from_json(json: &str) -> Result<Self, DocmapError> {
        let value: serde_json::Value = serde_json::from_str(json)
            .map_err(|e| DocmapError::InvalidConfig(format!("options: {}", e)))?;
        Self::from_value(&value)
    }

    pub fn from_value(value: &serde_json::Value) -> Result<Self, DocmapError> {
        match value {
            serde_json::Value::Array(items) => Ok(Self::new(
                items.iter().filter_map(|item| item.as_str()),
            )),
            serde_json::Value::Null => Ok(Self::default()),
            _ => Err(DocmapError::InvalidConfig(
                "options must be an array of strings".to_string(),
            )),
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.keys.iter().any(|k| k == key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.keys.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

impl From<Vec<String>> for CanonicalKeys {
    fn from(keys: Vec<String>) -> Self {
        Self::new(keys)
    }
}

impl From<CanonicalKeys> for Vec<String> {
    fn from(keys: CanonicalKeys) -> Self {
        keys.keys
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_preserves_supplied_order() {
        let keys = CanonicalKeys::new(["quantity", "description", "price"]);
        let listed: Vec<&str> = keys.iter().collect();
        assert_eq!(listed, vec!["quantity", "description", "price"]);
    }

    #[test]
    fn test_drops_blanks_and_repeats() {
        let keys = CanonicalKeys::new(["price", " ", "", "price", " price "]);
        assert_eq!(keys.len(), 1);
        assert!(keys.contains("price"));
    }

    #[test]
    fn test_from_json_skips_non_strings() {
        let keys = CanonicalKeys::from_json(r#"["description", 3, null, "product_code"]"#).unwrap();
        let listed: Vec<&str> = keys.iter().collect();
        assert_eq!(listed, vec!["description", "product_code"]);
    }

    #[test]
    fn test_from_json_null_is_empty() {
        let keys = CanonicalKeys::from_json("null").unwrap();
        assert!(keys.is_empty());
    }

    #[test]
    fn test_from_json_rejects_object() {
        let result = CanonicalKeys::from_json(r#"{"a": "b"}"#);
        assert!(matches!(result, Err(DocmapError::InvalidConfig(_))));
    }

    #[test]
    fn test_serde_as_plain_list() {
        let keys: CanonicalKeys = serde_json::from_str(r#"["a", "b", "a"]"#).unwrap();
        assert_eq!(serde_json::to_string(&keys).unwrap(), r#"["a","b"]"#);
    }
}
