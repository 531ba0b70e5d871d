//! Session report returned by the convergence loop.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::diagnostic::Diagnostic;
use super::repair::{RepairRecord, UnfixedDiagnostic};
use crate::metrics::SessionCounters;

/// Why the loop stopped.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// The build passed.
    Succeeded,
    /// The build failed but no diagnostic could be extracted.
    NoDiagnostics,
    /// Two consecutive rounds reported the same diagnostics.
    Stalled,
    /// The attempt budget ran out.
    BudgetExhausted,
    /// The build collaborator could not run the build at all.
    BuildUnavailable,
}

impl StopReason {
    pub fn is_success(&self) -> bool {
        matches!(self, StopReason::Succeeded)
    }
}

/// Aggregate counts.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct RepairSummary {
    pub total_fixed: usize,
    pub total_unfixed: usize,
}

/// Structured result of one repair session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RepairReport {
    pub run_id: Uuid,

    pub success: bool,

    pub stop_reason: StopReason,

    /// Completed build invocations.
    pub attempts: u32,

    /// Applied repairs in application order.
    pub fixed_files: Vec<RepairRecord>,

    /// Diagnostics from the last failed build. Absent on success.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<Diagnostic>>,

    /// Diagnostics whose latest repair attempt produced no change.
    #[serde(default)]
    pub unfixed: Vec<UnfixedDiagnostic>,

    pub summary: RepairSummary,

    /// Counters gathered by this session alone.
    #[serde(default)]
    pub counters: SessionCounters,

    pub started_at: DateTime<Utc>,

    pub finished_at: DateTime<Utc>,
}

impl RepairReport {
    pub fn duration_ms(&self) -> u64 {
        (self.finished_at - self.started_at)
            .num_milliseconds()
            .max(0) as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stop_reason_success() {
        assert!(StopReason::Succeeded.is_success());
        assert!(!StopReason::Stalled.is_success());
        assert!(!StopReason::BudgetExhausted.is_success());
    }

    #[test]
    fn test_report_omits_errors_on_success() {
        let now = Utc::now();
        let report = RepairReport {
            run_id: Uuid::new_v4(),
            success: true,
            stop_reason: StopReason::Succeeded,
            attempts: 1,
            fixed_files: Vec::new(),
            errors: None,
            unfixed: Vec::new(),
            summary: RepairSummary::default(),
            counters: SessionCounters::default(),
            started_at: now,
            finished_at: now,
        };

        let json = serde_json::to_value(&report).expect("serialize");
        assert!(json.get("errors").is_none());
        assert_eq!(json["stop_reason"], "succeeded");
        assert_eq!(report.duration_ms(), 0);
    }
}
