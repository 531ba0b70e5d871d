//! Domain models for buildmend.
//!
//! - `Diagnostic`: one normalized build/lint problem
//! - `RepairRecord`: audit entry for an applied repair
//! - `BuildOutcome`: result of one build invocation
//! - `RepairReport`: the structured result of a repair session

pub mod build;
pub mod diagnostic;
pub mod error;
pub mod repair;
pub mod report;

pub use build::BuildOutcome;
pub use diagnostic::{same_diagnostic_set, Diagnostic, DiagnosticKey, Severity, SourceFormat};
pub use error::{MendError, Result};
pub use repair::{RepairRecord, RepairRule, RepairStrategy, UnfixedDiagnostic, UnfixedReason};
pub use report::{RepairReport, RepairSummary, StopReason};
