//! Collaborator traits the convergence loop drives.
//!
//! `BuildRunner` runs the project's build; `FixGenerator` drafts a
//! replacement file through a text-generation endpoint. Both are async
//! traits so subprocess and HTTP backends plug in directly, and both have
//! in-memory fakes in [`crate::fakes`].

use async_trait::async_trait;
use buildmend_llm::{LlmClient, ResponseMode};

use crate::domain::build::BuildOutcome;
use crate::domain::error::Result;

/// Trait for build backends (subprocess, scripted, etc.).
#[async_trait]
pub trait BuildRunner: Send + Sync {
    /// Run the build once and capture its combined output.
    async fn run_build(&self) -> Result<BuildOutcome>;
}

/// Trait for text-generation backends that draft repaired file content.
#[async_trait]
pub trait FixGenerator: Send + Sync {
    /// Whether the backend is configured and may be called.
    fn is_available(&self) -> bool;

    /// Return a complete replacement file body for `prompt`.
    async fn generate_fix(&self, prompt: &str) -> Result<String>;
}

#[async_trait]
impl FixGenerator for LlmClient {
    fn is_available(&self) -> bool {
        self.is_enabled()
    }

    async fn generate_fix(&self, prompt: &str) -> Result<String> {
        Ok(self.complete(prompt, ResponseMode::Raw).await?)
    }
}
