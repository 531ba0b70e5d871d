//! Result of one build invocation.

use serde::{Deserialize, Serialize};

/// Outcome of running the project's build command once.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BuildOutcome {
    /// Whether the process exited successfully.
    pub success: bool,

    /// Combined stdout + stderr.
    pub output: String,

    /// Process exit code (-1 when killed or unavailable).
    pub exit_code: i32,

    /// Whether the process was killed after exceeding its timeout.
    #[serde(default)]
    pub timed_out: bool,

    #[serde(default)]
    pub duration_ms: u64,
}

impl BuildOutcome {
    /// A successful build with the given output.
    pub fn passed(output: impl Into<String>) -> Self {
        Self {
            success: true,
            output: output.into(),
            exit_code: 0,
            timed_out: false,
            duration_ms: 0,
        }
    }

    /// A failed build with the given output and exit code.
    pub fn failed(output: impl Into<String>, exit_code: i32) -> Self {
        Self {
            success: false,
            output: output.into(),
            exit_code,
            timed_out: false,
            duration_ms: 0,
        }
    }

    /// A build killed on timeout. Carries no diagnostics.
    pub fn timed_out(duration_ms: u64) -> Self {
        Self {
            success: false,
            output: String::new(),
            exit_code: -1,
            timed_out: true,
            duration_ms,
        }
    }
}
