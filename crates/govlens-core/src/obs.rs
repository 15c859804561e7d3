//! Structured observability hooks for dashboard runs.
//!
//! This module provides:
//! - Run-scoped tracing spans via `run_span`
//! - Emission functions for key events: run start, fetch outcome, run finish, scoring
//!
//! Filter with `RUST_LOG` (e.g. `RUST_LOG=govlens_core=debug`).

use tracing::{info, warn};
use uuid::Uuid;

/// Fresh random id for one dashboard run.
pub fn new_run_id() -> String {
    Uuid::new_v4().to_string()
}

/// Span tagged with `run_id`; attach it to a run's future with
/// [`tracing::Instrument::instrument`] so the id survives task hops.
///
/// # Example
///
/// ```ignore
/// dashboard.load().instrument(run_span(&run_id)).await
/// ```
pub fn run_span(run_id: &str) -> tracing::Span {
    tracing::info_span!("govlens.run", run_id = %run_id)
}

/// Emit event: dashboard run started against `host`.
pub fn emit_run_started(run_id: &str, host: &str) {
    info!(event = "run.started", run_id = %run_id, host = %host);
}

/// Emit event: one resource fetched.
pub fn emit_fetch_completed(resource: &str, key: Option<&str>, count: usize) {
    info!(
        event = "fetch.completed",
        resource = %resource,
        key = key.unwrap_or("-"),
        count = count,
    );
}

/// Emit event: one resource degraded to an empty result (warning level).
///
/// `status` is the HTTP status when the server answered at all.
pub fn emit_fetch_degraded(
    resource: &str,
    key: Option<&str>,
    status: Option<u16>,
    error: &dyn std::fmt::Display,
) {
    let status = status.map_or_else(|| "-".to_string(), |s| s.to_string());
    warn!(
        event = "fetch.degraded",
        resource = %resource,
        key = key.unwrap_or("-"),
        status = %status,
        error = %error,
    );
}

/// Emit event: dashboard run finished.
pub fn emit_run_finished(run_id: &str, duration_ms: u64, bundles: usize, warnings: usize) {
    info!(
        event = "run.finished",
        run_id = %run_id,
        duration_ms = duration_ms,
        bundles = bundles,
        warnings = warnings,
    );
}

/// Emit event: an application was scored.
pub fn emit_application_scored(probability: f64, band: &str) {
    info!(event = "score.completed", probability = probability, band = %band);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_span_create() {
        let span = run_span("test-run-id");
        let _entered = span.enter();
    }

    #[test]
    fn test_run_ids_differ() {
        assert_ne!(new_run_id(), new_run_id());
    }
}
