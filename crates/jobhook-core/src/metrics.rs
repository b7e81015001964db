//! Global atomic counters for dispatch observability.
//!
//! Counters are incremented silently at the call site. Call
//! [`Metrics::flush`] to emit current values as a single
//! `tracing::info!` event (e.g. when a process shuts down).

use std::sync::atomic::{AtomicU64, Ordering};

/// Global metrics singleton.
pub static METRICS: Metrics = Metrics::new();

/// Lock-free atomic counters.
pub struct Metrics {
    events_processed: AtomicU64,
    rules_matched: AtomicU64,
    jobs_triggered: AtomicU64,
    trigger_failures: AtomicU64,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    /// Create a zeroed set of counters.
    pub const fn new() -> Self {
        Self {
            events_processed: AtomicU64::new(0),
            rules_matched: AtomicU64::new(0),
            jobs_triggered: AtomicU64::new(0),
            trigger_failures: AtomicU64::new(0),
        }
    }

    /// Count one event that reached the dispatcher.
    pub fn inc_events_processed(&self) {
        self.events_processed.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "events_processed", "counter incremented");
    }

    /// Count `n` matched rules.
    pub fn add_rules_matched(&self, n: u64) {
        self.rules_matched.fetch_add(n, Ordering::Relaxed);
        tracing::trace!(metric = "rules_matched", n, "counter incremented");
    }

    /// Count one successfully queued job.
    pub fn inc_jobs_triggered(&self) {
        self.jobs_triggered.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "jobs_triggered", "counter incremented");
    }

    /// Count a trigger call that failed, fatally or not.
    pub fn inc_trigger_failures(&self) {
        self.trigger_failures.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "trigger_failures", "counter incremented");
    }

    /// Emit all current counter values as a single `info!` event.
    pub fn flush(&self) {
        tracing::info!(
            metric = "flush",
            events_processed = self.events_processed(),
            rules_matched = self.rules_matched(),
            jobs_triggered = self.jobs_triggered(),
            trigger_failures = self.trigger_failures(),
        );
    }

    /// Current number of dispatched events.
    pub fn events_processed(&self) -> u64 {
        self.events_processed.load(Ordering::Relaxed)
    }

    /// Current number of matched rules.
    pub fn rules_matched(&self) -> u64 {
        self.rules_matched.load(Ordering::Relaxed)
    }

    /// Current number of queued jobs.
    pub fn jobs_triggered(&self) -> u64 {
        self.jobs_triggered.load(Ordering::Relaxed)
    }

    /// Current number of failed trigger calls.
    pub fn trigger_failures(&self) -> u64 {
        self.trigger_failures.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_increment() {
        let m = Metrics::new();
        assert_eq!(m.events_processed(), 0);
        m.inc_events_processed();
        m.inc_events_processed();
        assert_eq!(m.events_processed(), 2);

        m.add_rules_matched(3);
        assert_eq!(m.rules_matched(), 3);

        m.inc_jobs_triggered();
        m.inc_trigger_failures();
        m.inc_trigger_failures();
        assert_eq!(m.jobs_triggered(), 1);
        assert_eq!(m.trigger_failures(), 2);
    }
}
