//! Observability tests for repair-session tracing.

use std::sync::Arc;

use buildmend_core::fakes::ScriptedBuildRunner;
use buildmend_core::obs::{
    emit_build_finished, emit_repair_applied, emit_repair_unfixed, emit_session_finished,
    emit_session_stalled, emit_session_started, SessionSpan,
};
use buildmend_core::{
    BuildOutcome, ConvergenceController, DiagnosticParser, RepairPolicy, StopReason,
    StrategySelector, UnfixedReason,
};
use tracing_test::traced_test;

#[traced_test]
#[test]
fn test_emit_session_started_logs_root() {
    emit_session_started("run-123", "/work/app", 3);
    assert!(logs_contain("session.started"));
    assert!(logs_contain("/work/app"));
}

#[traced_test]
#[test]
fn test_emit_build_finished_logs_attempt() {
    emit_build_finished(2, false, 4, 1500);
    assert!(logs_contain("build.finished"));
    assert!(logs_contain("diagnostics=4"));
}

#[traced_test]
#[test]
fn test_emit_repair_events() {
    emit_repair_applied("./src/a.tsx", "rule:explicit_any", "./src/a.tsx.backup.1");
    emit_repair_unfixed("./src/b.tsx:3:1", &UnfixedReason::NoApplicableRule);

    assert!(logs_contain("repair.applied"));
    assert!(logs_contain("rule:explicit_any"));
    assert!(logs_contain("repair.unfixed"));
    assert!(logs_contain("no applicable repair rule"));
}

#[traced_test]
#[test]
fn test_emit_stall_and_finish() {
    emit_session_stalled(2, 1);
    emit_session_finished("run-9", StopReason::Stalled, 2, 0, 1, 10);

    assert!(logs_contain("session.stalled"));
    assert!(logs_contain("session.finished"));
    assert!(logs_contain("Stalled"));
}

#[traced_test]
#[test]
fn test_session_span_enter_creates_span() {
    let span = SessionSpan::enter("test-span-run");
    drop(span);
}

#[traced_test]
#[tokio::test]
async fn test_run_emits_lifecycle_events() {
    let tmp = tempfile::tempdir().unwrap();
    let runner = Arc::new(ScriptedBuildRunner::new(vec![BuildOutcome::passed("")]));
    let controller = ConvergenceController::new(
        tmp.path(),
        runner,
        StrategySelector::rules_only(),
        DiagnosticParser::default(),
        RepairPolicy::default(),
    );

    let report = controller.run().await;

    assert!(report.success);
    assert!(logs_contain("session.started"));
    assert!(logs_contain("build.finished"));
    assert!(logs_contain("session.finished"));
    assert!(logs_contain(&report.run_id.to_string()));
}
