//! Global atomic counters for pipeline observability.
//!
//! Counters are incremented silently at the call site. Call
//! [`Metrics::flush`] to emit current values as a single
//! `tracing::info!` event (e.g. at the end of a CLI command).

use std::sync::atomic::{AtomicU64, Ordering};

/// Global metrics singleton.
pub static METRICS: Metrics = Metrics::new();

/// Lock-free atomic counters.
pub struct Metrics {
    sandbox_executions: AtomicU64,
    sandbox_timeouts: AtomicU64,
    oracle_calls: AtomicU64,
    quality_evaluations: AtomicU64,
    augment_successes: AtomicU64,
    augment_failures: AtomicU64,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub const fn new() -> Self {
        Self {
            sandbox_executions: AtomicU64::new(0),
            sandbox_timeouts: AtomicU64::new(0),
            oracle_calls: AtomicU64::new(0),
            quality_evaluations: AtomicU64::new(0),
            augment_successes: AtomicU64::new(0),
            augment_failures: AtomicU64::new(0),
        }
    }

    fn bump(counter: &AtomicU64, name: &'static str) {
        counter.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = name, "counter incremented");
    }

    pub fn inc_sandbox_executions(&self) {
        Self::bump(&self.sandbox_executions, "sandbox_executions");
    }

    pub fn inc_sandbox_timeouts(&self) {
        Self::bump(&self.sandbox_timeouts, "sandbox_timeouts");
    }

    pub fn inc_oracle_calls(&self) {
        Self::bump(&self.oracle_calls, "oracle_calls");
    }

    pub fn inc_quality_evaluations(&self) {
        Self::bump(&self.quality_evaluations, "quality_evaluations");
    }

    /// Record the terminal outcome of one augmentation loop.
    pub fn record_augment_outcome(&self, success: bool) {
        if success {
            Self::bump(&self.augment_successes, "augment_successes");
        } else {
            Self::bump(&self.augment_failures, "augment_failures");
        }
    }

    /// Emit all current counter values as a single `info!` event.
    pub fn flush(&self) {
        tracing::info!(
            metric = "flush",
            sandbox_executions = self.sandbox_executions(),
            sandbox_timeouts = self.sandbox_timeouts(),
            oracle_calls = self.oracle_calls(),
            quality_evaluations = self.quality_evaluations(),
            augment_successes = self.augment_successes(),
            augment_failures = self.augment_failures(),
        );
    }

    pub fn sandbox_executions(&self) -> u64 {
        self.sandbox_executions.load(Ordering::Relaxed)
    }

    pub fn sandbox_timeouts(&self) -> u64 {
        self.sandbox_timeouts.load(Ordering::Relaxed)
    }

    pub fn oracle_calls(&self) -> u64 {
        self.oracle_calls.load(Ordering::Relaxed)
    }

    pub fn quality_evaluations(&self) -> u64 {
        self.quality_evaluations.load(Ordering::Relaxed)
    }

    pub fn augment_successes(&self) -> u64 {
        self.augment_successes.load(Ordering::Relaxed)
    }

    pub fn augment_failures(&self) -> u64 {
        self.augment_failures.load(Ordering::Relaxed)
    }

    /// Reset all counters to zero (useful in tests).
    pub fn reset(&self) {
        for counter in [
            &self.sandbox_executions,
            &self.sandbox_timeouts,
            &self.oracle_calls,
            &self.quality_evaluations,
            &self.augment_successes,
            &self.augment_failures,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }
}
