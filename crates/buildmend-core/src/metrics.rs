//! Per-session counters.
//!
//! Each repair session owns one [`SessionCounters`]; concurrent or
//! sequential sessions never share counts. The final values are emitted as
//! a single `tracing::info!` event by [`SessionCounters::flush`] and copied
//! into the session report.

use serde::{Deserialize, Serialize};

/// Counts gathered over one repair session.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionCounters {
    pub builds_run: u64,
    pub repairs_applied: u64,
    pub repairs_unfixed: u64,
    /// Generator calls that failed or came back empty and fell through to
    /// the rule table.
    pub generative_fallbacks: u64,
}

impl SessionCounters {
    pub fn inc_builds(&mut self) {
        self.builds_run += 1;
        tracing::trace!(metric = "builds_run", value = self.builds_run, "counter incremented");
    }

    pub fn inc_repairs_applied(&mut self) {
        self.repairs_applied += 1;
        tracing::trace!(
            metric = "repairs_applied",
            value = self.repairs_applied,
            "counter incremented"
        );
    }

    pub fn inc_repairs_unfixed(&mut self) {
        self.repairs_unfixed += 1;
        tracing::trace!(
            metric = "repairs_unfixed",
            value = self.repairs_unfixed,
            "counter incremented"
        );
    }

    pub fn inc_generative_fallbacks(&mut self) {
        self.generative_fallbacks += 1;
        tracing::trace!(
            metric = "generative_fallbacks",
            value = self.generative_fallbacks,
            "counter incremented"
        );
    }

    /// Emit all counter values as a single `info!` event.
    pub fn flush(&self, run_id: &str) {
        tracing::info!(
            metric = "flush",
            run_id = %run_id,
            builds_run = self.builds_run,
            repairs_applied = self.repairs_applied,
            repairs_unfixed = self.repairs_unfixed,
            generative_fallbacks = self.generative_fallbacks,
        );
    }
}
