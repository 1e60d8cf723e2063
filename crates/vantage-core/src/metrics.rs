//! Global atomic counters for pipeline runs.
//!
//! Counters are incremented silently at the call site. Call
//! [`Metrics::flush`] to emit current values as a single
//! `tracing::info!` event, typically when a process is about to exit.

use std::sync::atomic::{AtomicU64, Ordering};

/// Global metrics singleton.
pub static METRICS: Metrics = Metrics::new();

pub struct Metrics {
    runs_started: AtomicU64,
    runs_failed: AtomicU64,
    passes_dropped: AtomicU64,
    gatherers_pruned: AtomicU64,
    audits_failed: AtomicU64,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub const fn new() -> Self {
        Self {
            runs_started: AtomicU64::new(0),
            runs_failed: AtomicU64::new(0),
            passes_dropped: AtomicU64::new(0),
            gatherers_pruned: AtomicU64::new(0),
            audits_failed: AtomicU64::new(0),
        }
    }

    pub fn inc_runs_started(&self) {
        self.runs_started.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "runs_started", "counter incremented");
    }

    pub fn inc_runs_failed(&self) {
        self.runs_failed.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "runs_failed", "counter incremented");
    }

    pub fn inc_passes_dropped(&self) {
        self.passes_dropped.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "passes_dropped", "counter incremented");
    }

    /// Add the number of configured gatherers that pruning removed.
    pub fn add_gatherers_pruned(&self, count: u64) {
        self.gatherers_pruned.fetch_add(count, Ordering::Relaxed);
        tracing::trace!(metric = "gatherers_pruned", count, "counter incremented");
    }

    pub fn inc_audits_failed(&self) {
        self.audits_failed.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "audits_failed", "counter incremented");
    }

    /// Emit all current counter values as a single `info!` event.
    pub fn flush(&self) {
        tracing::info!(
            metric = "flush",
            runs_started = self.runs_started(),
            runs_failed = self.runs_failed(),
            passes_dropped = self.passes_dropped(),
            gatherers_pruned = self.gatherers_pruned(),
            audits_failed = self.audits_failed(),
        );
    }

    pub fn runs_started(&self) -> u64 {
        self.runs_started.load(Ordering::Relaxed)
    }

    pub fn runs_failed(&self) -> u64 {
        self.runs_failed.load(Ordering::Relaxed)
    }

    pub fn passes_dropped(&self) -> u64 {
        self.passes_dropped.load(Ordering::Relaxed)
    }

    pub fn gatherers_pruned(&self) -> u64 {
        self.gatherers_pruned.load(Ordering::Relaxed)
    }

    pub fn audits_failed(&self) -> u64 {
        self.audits_failed.load(Ordering::Relaxed)
    }

    /// Reset all counters to zero (useful in tests).
    pub fn reset(&self) {
        self.runs_started.store(0, Ordering::Relaxed);
        self.runs_failed.store(0, Ordering::Relaxed);
        self.passes_dropped.store(0, Ordering::Relaxed);
        self.gatherers_pruned.store(0, Ordering::Relaxed);
        self.audits_failed.store(0, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_increment() {
        let m = Metrics::new();
        assert_eq!(m.runs_started(), 0);
        m.inc_runs_started();
        m.inc_runs_started();
        assert_eq!(m.runs_started(), 2);

        m.inc_runs_failed();
        assert_eq!(m.runs_failed(), 1);

        m.add_gatherers_pruned(3);
        m.add_gatherers_pruned(2);
        assert_eq!(m.gatherers_pruned(), 5);

        m.inc_passes_dropped();
        m.inc_audits_failed();
        assert_eq!(m.passes_dropped(), 1);
        assert_eq!(m.audits_failed(), 1);
    }

    #[test]
    fn reset_zeroes_all() {
        let m = Metrics::new();
        m.inc_runs_started();
        m.inc_runs_failed();
        m.inc_passes_dropped();
        m.add_gatherers_pruned(4);
        m.inc_audits_failed();
        m.reset();
        assert_eq!(m.runs_started(), 0);
        assert_eq!(m.runs_failed(), 0);
        assert_eq!(m.passes_dropped(), 0);
        assert_eq!(m.gatherers_pruned(), 0);
        assert_eq!(m.audits_failed(), 0);
    }
}
