//! In-memory fakes for the collaborator traits (testing only)
//!
//! Provides `ScriptedBuildRunner`, `StaticFixGenerator`, and
//! `FailingFixGenerator`, which satisfy the trait contracts without
//! spawning processes or calling the network.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::collaborators::{BuildRunner, FixGenerator};
use crate::domain::build::BuildOutcome;
use crate::domain::error::{MendError, Result};

// ---------------------------------------------------------------------------
// ScriptedBuildRunner
// ---------------------------------------------------------------------------

type BuildFn = Box<dyn Fn(u32) -> Result<BuildOutcome> + Send + Sync>;

enum Script {
    Queue(Mutex<VecDeque<BuildOutcome>>, Mutex<Option<BuildOutcome>>),
    Function(BuildFn),
    Unavailable(String),
}

/// Build runner that replays canned outcomes.
///
/// Outcomes are returned in order; once the queue is drained the last one
/// repeats.
pub struct ScriptedBuildRunner {
    script: Script,
    calls: AtomicU32,
}

impl ScriptedBuildRunner {
    pub fn new(outcomes: Vec<BuildOutcome>) -> Self {
        Self {
            script: Script::Queue(Mutex::new(outcomes.into()), Mutex::new(None)),
            calls: AtomicU32::new(0),
        }
    }

    /// Always fail with the same output.
    pub fn always_failing(output: &str) -> Self {
        Self::new(vec![BuildOutcome::failed(output, 1)])
    }

    /// Compute each outcome from the 1-based call number.
    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn(u32) -> Result<BuildOutcome> + Send + Sync + 'static,
    {
        Self {
            script: Script::Function(Box::new(f)),
            calls: AtomicU32::new(0),
        }
    }

    /// Every call errors as if the build tool could not be started.
    pub fn unavailable(reason: &str) -> Self {
        Self {
            script: Script::Unavailable(reason.to_string()),
            calls: AtomicU32::new(0),
        }
    }

    /// Number of `run_build` calls so far.
    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BuildRunner for ScriptedBuildRunner {
    async fn run_build(&self) -> Result<BuildOutcome> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        match &self.script {
            Script::Queue(queue, last) => {
                let mut queue = queue.lock().unwrap();
                let mut last = last.lock().unwrap();
                if let Some(next) = queue.pop_front() {
                    *last = Some(next);
                }
                last.clone()
                    .ok_or_else(|| MendError::Build("no scripted outcomes".to_string()))
            }
            Script::Function(f) => f(call),
            Script::Unavailable(reason) => Err(MendError::Build(reason.clone())),
        }
    }
}

// ---------------------------------------------------------------------------
// StaticFixGenerator
// ---------------------------------------------------------------------------

/// Generator that answers every prompt with the same text and records the
/// prompts it received.
#[derive(Debug)]
pub struct StaticFixGenerator {
    reply: String,
    available: bool,
    prompts: Mutex<Vec<String>>,
}

impl StaticFixGenerator {
    pub fn new(reply: &str) -> Self {
        Self {
            reply: reply.to_string(),
            available: true,
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Report the generator as not configured.
    pub fn unavailable(mut self) -> Self {
        self.available = false;
        self
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl FixGenerator for StaticFixGenerator {
    fn is_available(&self) -> bool {
        self.available
    }

    async fn generate_fix(&self, prompt: &str) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        Ok(self.reply.clone())
    }
}

// ---------------------------------------------------------------------------
// FailingFixGenerator
// ---------------------------------------------------------------------------

/// Generator that is available but fails every call.
#[derive(Debug, Default)]
pub struct FailingFixGenerator {
    calls: AtomicU32,
}

impl FailingFixGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FixGenerator for FailingFixGenerator {
    fn is_available(&self) -> bool {
        true
    }

    async fn generate_fix(&self, _prompt: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(MendError::Generation("scripted failure".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scripted_runner_repeats_last_outcome() {
        let runner = ScriptedBuildRunner::new(vec![
            BuildOutcome::failed("first", 1),
            BuildOutcome::passed("second"),
        ]);

        assert_eq!(runner.run_build().await.unwrap().output, "first");
        assert_eq!(runner.run_build().await.unwrap().output, "second");
        assert_eq!(runner.run_build().await.unwrap().output, "second");
        assert_eq!(runner.calls(), 3);
    }

    #[tokio::test]
    async fn test_empty_script_errors() {
        let runner = ScriptedBuildRunner::new(Vec::new());
        assert!(runner.run_build().await.is_err());
    }

    #[tokio::test]
    async fn test_from_fn_sees_call_number() {
        let runner = ScriptedBuildRunner::from_fn(|call| {
            Ok(if call < 2 {
                BuildOutcome::failed("x", 1)
            } else {
                BuildOutcome::passed("")
            })
        });
        assert!(!runner.run_build().await.unwrap().success);
        assert!(runner.run_build().await.unwrap().success);
    }

    #[tokio::test]
    async fn test_failing_generator_counts_calls() {
        let generator = FailingFixGenerator::new();
        assert!(generator.generate_fix("p").await.is_err());
        assert_eq!(generator.calls(), 1);
    }
}
