//! Domain-level error taxonomy for buildmend.

use std::path::PathBuf;

/// buildmend domain errors.
#[derive(Debug, thiserror::Error)]
pub enum MendError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("digest mismatch: expected {expected}, got {actual}")]
    DigestMismatch { expected: String, actual: String },

    #[error("generation error: {0}")]
    Generation(String),

    #[error("build error: {0}")]
    Build(String),

    #[error("path escapes build root: {0}")]
    OutsideRoot(PathBuf),

    #[error("backup failed for {path}: {source}")]
    Backup {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("restore error: {0}")]
    Restore(String),
}

impl From<buildmend_llm::LlmError> for MendError {
    fn from(err: buildmend_llm::LlmError) -> Self {
        MendError::Generation(err.to_string())
    }
}

/// Result type for buildmend domain operations.
pub type Result<T> = std::result::Result<T, MendError>;
