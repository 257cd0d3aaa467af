use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DocmapError {
    #[error("Failed to parse mapping JSON: {0}")]
    InvalidPrefill(String),

    #[error("Mapping JSON must be an object, got {0}")]
    PrefillNotObject(&'static str),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to fetch {url}: {reason}")]
    FetchFailed { url: String, reason: String },

    #[error("Failed to fetch {url}: HTTP {status}")]
    HttpStatus { url: String, status: u16 },

    #[error("Unsupported file type: {0}")]
    UnsupportedType(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}
