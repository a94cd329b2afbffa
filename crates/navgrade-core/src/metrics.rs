//! Global atomic counters for NavGrade observability.
//!
//! Counters are incremented silently at the call site. Call
//! [`Metrics::flush`] to emit current values as a single
//! `tracing::info!` event (e.g. at the end of a batch).

use std::sync::atomic::{AtomicU64, Ordering};

/// Global metrics singleton.
pub static METRICS: Metrics = Metrics::new();

/// Lightweight atomic counters. No allocations, no locking.
pub struct Metrics {
    updates_applied: AtomicU64,
    updates_failed: AtomicU64,
    observations_discarded: AtomicU64,
    closures_promoted: AtomicU64,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub const fn new() -> Self {
        Self {
            updates_applied: AtomicU64::new(0),
            updates_failed: AtomicU64::new(0),
            observations_discarded: AtomicU64::new(0),
            closures_promoted: AtomicU64::new(0),
        }
    }

    /// Increment the updates-applied counter by one.
    pub fn inc_updates_applied(&self) {
        self.updates_applied.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "updates_applied", "counter incremented");
    }

    /// Increment the updates-failed counter by one.
    pub fn inc_updates_failed(&self) {
        self.updates_failed.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "updates_failed", "counter incremented");
    }

    /// Increment the observations-discarded counter by one.
    pub fn inc_observations_discarded(&self) {
        self.observations_discarded.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "observations_discarded", "counter incremented");
    }

    /// Increment the closures-promoted counter by one.
    pub fn inc_closures_promoted(&self) {
        self.closures_promoted.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "closures_promoted", "counter incremented");
    }

    /// Emit all current counter values as a single `info!` event.
    pub fn flush(&self) {
        tracing::info!(
            metric = "flush",
            updates_applied = self.updates_applied(),
            updates_failed = self.updates_failed(),
            observations_discarded = self.observations_discarded(),
            closures_promoted = self.closures_promoted(),
        );
    }

    pub fn updates_applied(&self) -> u64 {
        self.updates_applied.load(Ordering::Relaxed)
    }

    pub fn updates_failed(&self) -> u64 {
        self.updates_failed.load(Ordering::Relaxed)
    }

    pub fn observations_discarded(&self) -> u64 {
        self.observations_discarded.load(Ordering::Relaxed)
    }

    pub fn closures_promoted(&self) -> u64 {
        self.closures_promoted.load(Ordering::Relaxed)
    }

    /// Reset all counters to zero (useful in tests).
    pub fn reset(&self) {
        self.updates_applied.store(0, Ordering::Relaxed);
        self.updates_failed.store(0, Ordering::Relaxed);
        self.observations_discarded.store(0, Ordering::Relaxed);
        self.closures_promoted.store(0, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_increment() {
        let m = Metrics::new();
        m.inc_updates_applied();
        m.inc_updates_applied();
        assert_eq!(m.updates_applied(), 2);

        m.inc_updates_failed();
        assert_eq!(m.updates_failed(), 1);

        m.inc_observations_discarded();
        m.inc_closures_promoted();
        m.inc_closures_promoted();
        assert_eq!(m.observations_discarded(), 1);
        assert_eq!(m.closures_promoted(), 2);
    }

    #[test]
    fn reset_zeroes_all() {
        let m = Metrics::new();
        m.inc_updates_applied();
        m.inc_updates_failed();
        m.inc_closures_promoted();
        m.reset();
        assert_eq!(m.updates_applied(), 0);
        assert_eq!(m.updates_failed(), 0);
        assert_eq!(m.closures_promoted(), 0);
    }
}
