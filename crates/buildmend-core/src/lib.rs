//! buildmend core library
//!
//! Runs a project's build, turns its output into diagnostics, repairs the
//! offending files (text generation first, deterministic rules as
//! fallback) and repeats until the build passes or stops making progress.

pub mod applier;
pub mod artifact;
pub mod collaborators;
pub mod convergence;
pub mod diagnostics;
pub mod domain;
pub mod fakes;
pub mod metrics;
pub mod obs;
pub mod rules;
pub mod strategy;
pub mod telemetry;

pub use applier::{apply_repair, resolve_in_root};
pub use artifact::{
    read_report_artifact, read_report_file, restore_from_report, write_report_artifact,
    RestoredFile,
};
pub use collaborators::{BuildRunner, FixGenerator};
pub use convergence::{ConvergenceController, RepairPolicy, RepairSession, RoundOutcome};
pub use diagnostics::{parse_diagnostics, DiagnosticParser, ParserConfig};
pub use domain::{
    same_diagnostic_set, BuildOutcome, Diagnostic, DiagnosticKey, MendError, RepairRecord,
    RepairReport, RepairRule, RepairStrategy, RepairSummary, Result, Severity, SourceFormat,
    StopReason, UnfixedDiagnostic, UnfixedReason,
};
pub use metrics::SessionCounters;
pub use rules::{apply_rule, select_rule};
pub use strategy::{RepairMode, Selection, StrategySelector};
