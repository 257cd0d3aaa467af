//! Enhancer configuration
//!
//! Every field has a default matching the upload form the enhancer was built
//! for, so hosting pages only pass what differs. Field names are camelCase
//! to read naturally from JavaScript.

use serde::{Deserialize, Serialize};

use crate::error::DocmapError;
use crate::options::CanonicalKeys;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct EnhancerConfig {
    /// File input the user picks a document with
    pub file_input_selector: String,
    /// Element carrying `data-pdf-url` for an already stored document
    pub existing_preview_selector: String,
    /// Ancestor of the file input the preview container is placed after
    pub flex_container_selector: String,
    /// Field the editor reads its prefill JSON from
    pub prefill_field_selector: String,
    /// Field Save writes the mapping JSON into
    pub target_field_selector: String,
    /// Query parameter naming a saved document path
    pub saved_path_param: String,
    /// URL prefix saved paths live under
    pub media_prefix: String,
    /// Name of the page global holding the allowed mapping values
    pub options_global: String,
    /// Explicit allowed values; overrides the page global when set
    pub options: Option<CanonicalKeys>,
    pub labels: Labels,
}

impl Default for EnhancerConfig {
    fn default() -> Self {
        Self {
            file_input_selector: "#id_document".to_string(),
            existing_preview_selector: "#existingPdfPreview".to_string(),
            flex_container_selector: ".flex-container".to_string(),
            prefill_field_selector: "textarea[name=\"extra_data\"]".to_string(),
            target_field_selector: "#id_extra_data".to_string(),
            saved_path_param: "saved_pdf_path".to_string(),
            media_prefix: "/media/".to_string(),
            options_global: "CSV_KEYS".to_string(),
            options: None,
            labels: Labels::default(),
        }
    }
}

impl EnhancerConfig {
    pub fn from_json(json: &str) -> Result<Self, DocmapError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| DocmapError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the enhancer cannot work with
    pub fn validate(&self) -> Result<(), DocmapError> {
        let required = [
            ("fileInputSelector", &self.file_input_selector),
            ("existingPreviewSelector", &self.existing_preview_selector),
            ("prefillFieldSelector", &self.prefill_field_selector),
            ("targetFieldSelector", &self.target_field_selector),
            ("savedPathParam", &self.saved_path_param),
        ];
        for (name, value) in required {
            if value.trim().is_empty() {
                return Err(DocmapError::InvalidConfig(format!("{} must not be empty", name)));
            }
        }
        Ok(())
    }
}

/// User-visible texts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct Labels {
    pub heading: String,
    pub key_placeholder: String,
    pub select_prompt: String,
    pub add_row: String,
    pub save: String,
    pub saved: String,
    pub target_missing: String,
    pub download: String,
    pub image_alt: String,
    pub unsupported_type: String,
    pub saved_path_failed: String,
    pub existing_preview_failed: String,
}

impl Default for Labels {
    fn default() -> Self {
        Self {
            heading: "🗂️ Map Data Keys".to_string(),
            key_placeholder: "Enter value".to_string(),
            select_prompt: "-- Select --".to_string(),
            add_row: "+ Add Another".to_string(),
            save: "Save Mapping".to_string(),
            saved: "✅ Mapping set in extra_data".to_string(),
            target_missing: "extra_data field missing".to_string(),
            download: "Download PDF".to_string(),
            image_alt: "Image Preview".to_string(),
            unsupported_type: "Unsupported file type".to_string(),
            saved_path_failed: "Could not preview saved PDF".to_string(),
            existing_preview_failed: "Could not load preview.".to_string(),
        }
    }
}

/// Outcome of a save, shown next to the Save button
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SaveStatus {
    Saved,
    TargetMissing,
}

impl SaveStatus {
    pub fn message<'a>(&self, labels: &'a Labels) -> &'a str {
        match self {
            SaveStatus::Saved => &labels.saved,
            SaveStatus::TargetMissing => &labels.target_missing,
        }
    }
}
