//! Mapping model: rows in, de-duplicated JSON object out
//!
//! A [`RowDraft`] is what one editor row holds at save time. [`Mapping`] is
//! the ordered result written back into the form, and [`parse_prefill`]
//! turns a previously saved blob back into rows.

use std::collections::{HashMap, HashSet};

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

use crate::error::DocmapError;
use crate::options::CanonicalKeys;

/// Snapshot of one editor row: free-text key and selected canonical key
///
/// An empty `value` means nothing is selected.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowDraft {
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub value: String,
}

impl RowDraft {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    pub fn blank() -> Self {
        Self::default()
    }

    /// The dropdown entry this row should show as selected, if any
    pub fn selection<'a>(&'a self, options: &CanonicalKeys) -> Option<&'a str> {
        if options.contains(&self.value) {
            Some(self.value.as_str())
        } else {
            None
        }
    }
}

/// Ordered key → canonical key correspondence with unique keys
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Mapping {
    entries: Vec<(String, String)>,
}

impl Mapping {
    /// Build the mapping a save produces from the rows in display order.
    ///
    /// Keys and values are trimmed, rows missing either are dropped, and a
    /// repeated key becomes `key_2`, `key_3`, ... skipping any candidate that
    /// is already taken.
    pub fn from_rows<'a, I>(rows: I) -> Self
    where
        I: IntoIterator<Item = &'a RowDraft>,
    {
        let mut occurrences: HashMap<String, u32> = HashMap::new();
        let mut used: HashSet<String> = HashSet::new();
        let mut entries = Vec::new();

        for row in rows {
            let key = row.key.trim();
            let value = row.value.trim();
            if key.is_empty() || value.is_empty() {
                continue;
            }

            let count = occurrences.entry(key.to_string()).or_insert(0);
            *count += 1;
            let mut candidate = if *count == 1 {
                key.to_string()
            } else {
                format!("{}_{}", key, count)
            };
            while used.contains(&candidate) {
                *count += 1;
                candidate = format!("{}_{}", key, count);
            }

            used.insert(candidate.clone());
            entries.push((candidate, value.to_string()));
        }

        Self { entries }
    }

    pub fn entries(&self) -> &[(String, String)] {
        &self.entries
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// JSON object, two-space indented, as written into the form field
    pub fn to_json_pretty(&self) -> Result<String, DocmapError> {
        serde_json::to_string_pretty(self)
            .map_err(|e| DocmapError::SerializationError(e.to_string()))
    }
}

impl Serialize for Mapping {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, value) in &self.entries {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

/// Parse a saved mapping blob into editor rows, in stored order.
///
/// Blank input yields no rows. Non-string values keep their key with
/// nothing selected.
pub fn parse_prefill(raw: &str) -> Result<Vec<RowDraft>, DocmapError> {
    if raw.trim().is_empty() {
        return Ok(Vec::new());
    }

    let value: serde_json::Value =
        serde_json::from_str(raw).map_err(|e| DocmapError::InvalidPrefill(e.to_string()))?;

    match value {
        serde_json::Value::Object(map) => Ok(map
            .into_iter()
            .map(|(key, value)| match value {
                serde_json::Value::String(s) => RowDraft::new(key, s),
                _ => RowDraft::new(key, ""),
            })
            .collect()),
        serde_json::Value::Null => Err(DocmapError::PrefillNotObject("null")),
        serde_json::Value::Bool(_) => Err(DocmapError::PrefillNotObject("a boolean")),
        serde_json::Value::Number(_) => Err(DocmapError::PrefillNotObject("a number")),
        serde_json::Value::String(_) => Err(DocmapError::PrefillNotObject("a string")),
        serde_json::Value::Array(_) => Err(DocmapError::PrefillNotObject("an array")),
    }
}

/// Rows the editor starts with: the prefill, or a single blank row
pub fn initial_rows(prefill: Vec<RowDraft>) -> Vec<RowDraft> {
    if prefill.is_empty() {
        vec![RowDraft::blank()]
    } else {
        prefill
    }
}
