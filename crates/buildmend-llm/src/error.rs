//! Error types for buildmend-llm

use thiserror::Error;

/// Errors that can occur while talking to a text-generation endpoint
#[derive(Error, Debug)]
pub enum LlmError {
    /// No provider credentials were found
    #[error("no text-generation provider is configured")]
    NotConfigured,

    /// Transport-level failure
    #[error("HTTP error: {0}")]
    Http(String),

    /// Endpoint answered with a non-success status
    #[error("provider returned {status}: {body}")]
    Status { status: u16, body: String },

    /// Response carried no usable choice
    #[error("provider returned an empty completion")]
    EmptyResponse,

    /// Every attempt failed
    #[error("generation failed after {attempts} attempts: {last}")]
    Exhausted { attempts: u32, last: String },

    /// JSON parsing error
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<reqwest::Error> for LlmError {
    fn from(err: reqwest::Error) -> Self {
        LlmError::Http(err.to_string())
    }
}
