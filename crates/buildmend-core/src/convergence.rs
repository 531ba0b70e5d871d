//! Build → diagnose → repair loop.
//!
//! [`ConvergenceController::run`] drives rounds until the build passes,
//! produces nothing actionable, stops making progress, or the attempt
//! budget runs out. Per-session state lives in a [`RepairSession`] value
//! owned by one `run` call, so a controller can be reused and each round is
//! testable in isolation.
//!
//! Repairs within a round are strictly sequential and each one reads the
//! file's current on-disk content, so several diagnostics in one file are
//! applied on top of each other in discovery order.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::applier::{apply_repair, resolve_in_root};
use crate::collaborators::BuildRunner;
use crate::diagnostics::DiagnosticParser;
use crate::domain::diagnostic::{same_diagnostic_set, Diagnostic};
use crate::domain::repair::{RepairRecord, UnfixedDiagnostic, UnfixedReason};
use crate::domain::report::{RepairReport, RepairSummary, StopReason};
use crate::metrics::SessionCounters;
use crate::obs;
use crate::strategy::{RepairMode, Selection, StrategySelector};

/// Bounded repair policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepairPolicy {
    /// Maximum number of build invocations.
    pub max_attempts: u32,
    pub mode: RepairMode,
}

impl Default for RepairPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            mode: RepairMode::Auto,
        }
    }
}

/// Mutable state of one session.
#[derive(Debug, Clone, Default)]
pub struct RepairSession {
    pub attempts: u32,
    pub previous: Option<Vec<Diagnostic>>,
    pub fixed: Vec<RepairRecord>,
    pub unfixed: Vec<UnfixedDiagnostic>,
    pub counters: SessionCounters,
}

impl RepairSession {
    /// Record an unfixed diagnostic, replacing any entry with the same
    /// identity.
    pub fn mark_unfixed(&mut self, diagnostic: &Diagnostic, reason: UnfixedReason) {
        let key = diagnostic.key();
        self.unfixed.retain(|u| u.diagnostic.key() != key);
        self.unfixed.push(UnfixedDiagnostic {
            diagnostic: diagnostic.clone(),
            reason,
        });
    }

    /// Record an applied repair and clear a stale unfixed entry.
    pub fn mark_fixed(&mut self, diagnostic: &Diagnostic, record: RepairRecord) {
        let key = diagnostic.key();
        self.unfixed.retain(|u| u.diagnostic.key() != key);
        self.fixed.push(record);
    }
}

/// What one round decided.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoundOutcome {
    Stop {
        reason: StopReason,
        errors: Option<Vec<Diagnostic>>,
    },
    Continue,
}

/// Coordinates the build, parser, selector and applier.
pub struct ConvergenceController {
    root: PathBuf,
    build: Arc<dyn BuildRunner>,
    selector: StrategySelector,
    parser: DiagnosticParser,
    policy: RepairPolicy,
}

impl ConvergenceController {
    pub fn new(
        root: impl Into<PathBuf>,
        build: Arc<dyn BuildRunner>,
        selector: StrategySelector,
        parser: DiagnosticParser,
        policy: RepairPolicy,
    ) -> Self {
        Self {
            root: root.into(),
            build,
            selector,
            parser,
            policy,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn policy(&self) -> &RepairPolicy {
        &self.policy
    }

    /// Run the loop to completion. Never fails; every outcome is a report.
    pub async fn run(&self) -> RepairReport {
        let run_id = Uuid::new_v4();
        let run_id_str = run_id.to_string();
        let _span = obs::SessionSpan::enter(&run_id_str);
        let started_at = Utc::now();

        obs::emit_session_started(
            &run_id_str,
            &self.root.display().to_string(),
            self.policy.max_attempts,
        );

        let mut session = RepairSession::default();
        let (stop_reason, errors) = loop {
            if session.attempts >= self.policy.max_attempts {
                let errors = session.previous.clone();
                break (StopReason::BudgetExhausted, errors);
            }
            match self.round(&mut session).await {
                RoundOutcome::Stop { reason, errors } => break (reason, errors),
                RoundOutcome::Continue => {}
            }
        };

        let report = RepairReport {
            run_id,
            success: stop_reason.is_success(),
            stop_reason,
            attempts: session.attempts,
            summary: RepairSummary {
                total_fixed: session.fixed.len(),
                total_unfixed: session.unfixed.len(),
            },
            fixed_files: session.fixed,
            errors,
            unfixed: session.unfixed,
            counters: session.counters,
            started_at,
            finished_at: Utc::now(),
        };

        obs::emit_session_finished(
            &run_id_str,
            report.stop_reason,
            report.attempts,
            report.summary.total_fixed,
            report.summary.total_unfixed,
            report.duration_ms(),
        );
        report.counters.flush(&run_id_str);

        report
    }

    /// One build followed, when there is something to do, by one repair pass.
    pub async fn round(&self, session: &mut RepairSession) -> RoundOutcome {
        session.attempts += 1;
        session.counters.inc_builds();

        let outcome = match self.build.run_build().await {
            Ok(outcome) => outcome,
            Err(err) => {
                tracing::warn!(attempt = session.attempts, error = %err, "build could not run");
                return RoundOutcome::Stop {
                    reason: StopReason::BuildUnavailable,
                    errors: Some(Vec::new()),
                };
            }
        };

        if outcome.success {
            obs::emit_build_finished(session.attempts, true, 0, outcome.duration_ms);
            return RoundOutcome::Stop {
                reason: StopReason::Succeeded,
                errors: None,
            };
        }

        let diagnostics = self.parser.parse(&outcome.output);
        obs::emit_build_finished(
            session.attempts,
            false,
            diagnostics.len(),
            outcome.duration_ms,
        );

        if diagnostics.is_empty() {
            return RoundOutcome::Stop {
                reason: StopReason::NoDiagnostics,
                errors: Some(diagnostics),
            };
        }

        if let Some(previous) = &session.previous {
            if same_diagnostic_set(&diagnostics, previous) {
                obs::emit_session_stalled(session.attempts, diagnostics.len());
                return RoundOutcome::Stop {
                    reason: StopReason::Stalled,
                    errors: Some(diagnostics),
                };
            }
        }

        for diagnostic in &diagnostics {
            self.repair_one(session, diagnostic).await;
        }

        session.previous = Some(diagnostics);
        RoundOutcome::Continue
    }

    async fn repair_one(&self, session: &mut RepairSession, diagnostic: &Diagnostic) {
        let path = match resolve_in_root(&self.root, &diagnostic.file) {
            Ok(path) => path,
            Err(_) => return self.unfixed(session, diagnostic, UnfixedReason::OutsideRoot),
        };

        let original = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(err) => {
                let reason = UnfixedReason::ReadFailed {
                    error: err.to_string(),
                };
                return self.unfixed(session, diagnostic, reason);
            }
        };

        let selection = self
            .selector
            .select_and_repair(diagnostic, &original, &mut session.counters)
            .await;
        let (content, strategy) = match selection {
            Selection::Changed { content, strategy } => (content, strategy),
            Selection::Unchanged { reason } => return self.unfixed(session, diagnostic, reason),
        };

        match apply_repair(
            &path,
            &diagnostic.file,
            &diagnostic.message,
            strategy,
            &content,
            &original,
        ) {
            Ok(Some(record)) => {
                obs::emit_repair_applied(
                    &record.file,
                    &record.strategy.to_string(),
                    &record.backup_path.display().to_string(),
                );
                session.counters.inc_repairs_applied();
                session.mark_fixed(diagnostic, record);
            }
            Ok(None) => self.unfixed(session, diagnostic, UnfixedReason::NoChange),
            Err(err) => {
                let reason = UnfixedReason::ApplyFailed {
                    error: err.to_string(),
                };
                self.unfixed(session, diagnostic, reason);
            }
        }
    }

    fn unfixed(&self, session: &mut RepairSession, diagnostic: &Diagnostic, reason: UnfixedReason) {
        debug!(location = %diagnostic.location(), "diagnostic left unfixed");
        obs::emit_repair_unfixed(&diagnostic.location(), &reason);
        session.counters.inc_repairs_unfixed();
        session.mark_unfixed(diagnostic, reason);
    }
}
