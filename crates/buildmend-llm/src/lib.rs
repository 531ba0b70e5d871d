//! buildmend-llm: text-generation client for buildmend
//!
//! Talks to any OpenAI-compatible chat-completions endpoint. The provider
//! is detected from environment credentials; a client without credentials
//! is constructed in a disabled state so callers can check availability
//! instead of handling a construction error.

pub mod client;
pub mod error;
pub mod provider;

pub use client::{backoff_delay, extract_code_block, LlmClient, ResponseMode};
pub use error::LlmError;
pub use provider::{LlmConfig, LlmOptions, Provider};

/// Result type for text-generation operations
pub type Result<T> = std::result::Result<T, LlmError>;
