//! Global atomic counters for govlens observability.
//!
//! Counters are incremented silently at the call site. Call
//! [`Metrics::flush`] to emit current values as a single
//! `tracing::info!` event (e.g. at the end of a dashboard run).

use std::sync::atomic::{AtomicU64, Ordering};

/// Global metrics singleton.
pub static METRICS: Metrics = Metrics::new();

/// Atomic counters for one process.
pub struct Metrics {
    fetches: AtomicU64,
    fetch_failures: AtomicU64,
    malformed_references: AtomicU64,
    reports_rendered: AtomicU64,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub const fn new() -> Self {
        Self {
            fetches: AtomicU64::new(0),
            fetch_failures: AtomicU64::new(0),
            malformed_references: AtomicU64::new(0),
            reports_rendered: AtomicU64::new(0),
        }
    }

    /// Count one upstream read, successful or not.
    pub fn inc_fetches(&self) {
        self.fetches.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "fetches", "counter incremented");
    }

    /// Count one read that degraded to an empty result.
    pub fn inc_fetch_failures(&self) {
        self.fetch_failures.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "fetch_failures", "counter incremented");
    }

    /// Count one approval request whose bundle reference did not parse.
    pub fn inc_malformed_references(&self) {
        self.malformed_references.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "malformed_references", "counter incremented");
    }

    /// Count one rendered report.
    pub fn inc_reports_rendered(&self) {
        self.reports_rendered.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "reports_rendered", "counter incremented");
    }

    /// Emit all current counter values as a single `info!` event.
    pub fn flush(&self) {
        tracing::info!(
            metric = "flush",
            fetches = self.fetches(),
            fetch_failures = self.fetch_failures(),
            malformed_references = self.malformed_references(),
            reports_rendered = self.reports_rendered(),
        );
    }

    pub fn fetches(&self) -> u64 {
        self.fetches.load(Ordering::Relaxed)
    }

    pub fn fetch_failures(&self) -> u64 {
        self.fetch_failures.load(Ordering::Relaxed)
    }

    pub fn malformed_references(&self) -> u64 {
        self.malformed_references.load(Ordering::Relaxed)
    }

    pub fn reports_rendered(&self) -> u64 {
        self.reports_rendered.load(Ordering::Relaxed)
    }

    /// Reset all counters to zero; watch mode starts each refresh here.
    pub fn reset(&self) {
        self.fetches.store(0, Ordering::Relaxed);
        self.fetch_failures.store(0, Ordering::Relaxed);
        self.malformed_references.store(0, Ordering::Relaxed);
        self.reports_rendered.store(0, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_increment() {
        let m = Metrics::new();
        assert_eq!(m.fetches(), 0);
        m.inc_fetches();
        m.inc_fetches();
        assert_eq!(m.fetches(), 2);

        m.inc_fetch_failures();
        assert_eq!(m.fetch_failures(), 1);

        m.inc_malformed_references();
        m.inc_reports_rendered();
        m.inc_reports_rendered();
        assert_eq!(m.malformed_references(), 1);
        assert_eq!(m.reports_rendered(), 2);
    }

    #[test]
    fn reset_zeroes_all() {
        let m = Metrics::new();
        m.inc_fetches();
        m.inc_fetch_failures();
        m.inc_malformed_references();
        m.inc_reports_rendered();
        m.reset();
        assert_eq!(m.fetches(), 0);
        assert_eq!(m.fetch_failures(), 0);
        assert_eq!(m.malformed_references(), 0);
        assert_eq!(m.reports_rendered(), 0);
    }
}
