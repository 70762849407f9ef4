//! Error types for the content-store crate.
//!
//! Every collaborator read and write returns [`Result`]. The scoring engine
//! never sees these errors directly: callers degrade to defaults or the
//! fallback path when a store reports [`StoreError::Unavailable`].

use thiserror::Error;

/// Errors that can occur while loading, querying or updating the stores
#[derive(Error, Debug)]
pub enum StoreError {
    /// Snapshot file could not be found or opened
    #[error("Failed to open file: {path}")]
    FileNotFound { path: String },

    /// I/O error occurred while reading or writing a snapshot file
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// A record in a JSON Lines snapshot couldn't be decoded
    ///
    /// Carries the file and 1-based line number so bad records can be found.
    #[error("Parse error at line {line} in {file}: {reason}")]
    ParseError {
        file: String,
        line: usize,
        reason: String,
    },

    /// Serialization failed while writing a snapshot or model artifact
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A field had a value outside its domain (e.g. a rating of +3)
    #[error("Invalid value for {field}: {value}")]
    InvalidValue { field: String, value: String },

    /// Referenced entity doesn't exist (e.g. a rating for unknown content)
    #[error("Missing reference: {entity} with id {id}")]
    MissingReference { entity: String, id: String },

    /// The backing store could not be reached
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    /// Whether this error represents a collaborator outage rather than bad data.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, StoreError::Unavailable(_))
    }
}

/// Convenience type alias for Results in this crate
pub type Result<T> = std::result::Result<T, StoreError>;
