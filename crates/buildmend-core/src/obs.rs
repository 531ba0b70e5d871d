//! Structured lifecycle events for repair sessions.
//!
//! Events carry an `event` field naming the step and are emitted at
//! `info!`, except unfixed diagnostics and stalls which are `warn!`.

use tracing::{info, warn};

use crate::domain::report::StopReason;

/// RAII guard that enters a session-scoped span.
///
/// ```ignore
/// let _span = SessionSpan::enter(&run_id.to_string());
/// // every event below now carries run_id
/// ```
pub struct SessionSpan {
    _span: tracing::span::EnteredSpan,
}

impl SessionSpan {
    pub fn enter(run_id: &str) -> Self {
        let span = tracing::info_span!("buildmend.session", run_id = %run_id);
        Self {
            _span: span.entered(),
        }
    }
}

pub fn emit_session_started(run_id: &str, root: &str, max_attempts: u32) {
    info!(
        event = "session.started",
        run_id = %run_id,
        root = %root,
        max_attempts = max_attempts,
    );
}

/// Emit event: one build finished.
pub fn emit_build_finished(attempt: u32, success: bool, diagnostics: usize, duration_ms: u64) {
    info!(
        event = "build.finished",
        attempt = attempt,
        success = success,
        diagnostics = diagnostics,
        duration_ms = duration_ms,
    );
}

/// Emit event: a repair was written to disk.
pub fn emit_repair_applied(file: &str, strategy: &str, backup: &str) {
    info!(event = "repair.applied", file = %file, strategy = %strategy, backup = %backup);
}

/// Emit event: a diagnostic could not be repaired this round.
pub fn emit_repair_unfixed(location: &str, reason: &dyn std::fmt::Display) {
    warn!(event = "repair.unfixed", location = %location, reason = %reason);
}

pub fn emit_session_stalled(attempt: u32, diagnostics: usize) {
    warn!(event = "session.stalled", attempt = attempt, diagnostics = diagnostics);
}

/// Emit event: session finished with its stop reason.
pub fn emit_session_finished(
    run_id: &str,
    stop_reason: StopReason,
    attempts: u32,
    fixed: usize,
    unfixed: usize,
    duration_ms: u64,
) {
    info!(
        event = "session.finished",
        run_id = %run_id,
        stop_reason = ?stop_reason,
        success = stop_reason.is_success(),
        attempts = attempts,
        fixed = fixed,
        unfixed = unfixed,
        duration_ms = duration_ms,
    );
}
