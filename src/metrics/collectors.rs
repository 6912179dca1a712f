//! High-level metric recording facade.
//!
//! `MetricsCollector` wraps the raw Prometheus statics with methods named
//! after pipeline events. All methods are no-ops until `init_metrics()`
//! has run, so library code can record unconditionally.

use super::prometheus::{
    ACTIVE_WORKERS, CACHE_LOOKUPS, GENERATION_DURATION, JOBS_IN_PROGRESS, QUEUE_DEPTH,
    REQUESTS_TOTAL, SINK_FAILURES, SLOT_RETRIES, VALIDATION_DECISIONS,
};

/// Point-in-time reading of the pipeline counters.
///
/// Used by tests and the status endpoint; Prometheus scrapes read the
/// text exposition instead.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MetricsSnapshot {
    pub requests_completed: u64,
    pub requests_failed: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub cache_errors: u64,
    pub validation_accepted: u64,
    pub validation_rejected: u64,
    pub slot_retries: u64,
    pub sink_failures: u64,
}

impl MetricsSnapshot {
    /// Fraction of cache lookups that hit, or `None` before any lookup.
    pub fn cache_hit_rate(&self) -> Option<f64> {
        let total = self.cache_hits + self.cache_misses + self.cache_errors;
        (total > 0).then(|| self.cache_hits as f64 / total as f64)
    }

    /// Fraction of validator decisions that accepted, or `None` before
    /// any decision.
    pub fn validation_pass_rate(&self) -> Option<f64> {
        let total = self.validation_accepted + self.validation_rejected;
        (total > 0).then(|| self.validation_accepted as f64 / total as f64)
    }
}

/// Records pipeline events against the Prometheus metrics.
#[derive(Debug, Clone, Default)]
pub struct MetricsCollector;

impl MetricsCollector {
    /// Create a new collector.
    ///
    /// Note: metrics must be initialized with `init_metrics()` before
    /// recorded values become visible.
    pub fn new() -> Self {
        Self
    }

    /// Record a request outcome without a duration observation.
    ///
    /// `outcome` is one of `completed`, `failed`, or `cache_hit`.
    pub fn record_request_outcome(&self, outcome: &str) {
        if let Some(requests) = REQUESTS_TOTAL.get() {
            requests.with_label_values(&[outcome]).inc();
        }
    }

    /// Record a finished generation request with its duration.
    pub fn record_request(&self, outcome: &str, difficulty: &str, duration_secs: f64) {
        self.record_request_outcome(outcome);

        if let Some(duration) = GENERATION_DURATION.get() {
            duration
                .with_label_values(&[difficulty])
                .observe(duration_secs);
        }

        tracing::trace!(
            outcome = outcome,
            difficulty = difficulty,
            duration_secs = duration_secs,
            "Recorded request metric"
        );
    }

    /// Record slot-level regeneration attempts for one request.
    pub fn record_slot_retries(&self, retries: u32) {
        if retries == 0 {
            return;
        }
        if let Some(counter) = SLOT_RETRIES.get() {
            counter.inc_by(retries as f64);
        }
    }

    /// Record a cache lookup. `result` is `hit`, `miss`, or `error`.
    pub fn record_cache_lookup(&self, result: &str) {
        if let Some(lookups) = CACHE_LOOKUPS.get() {
            lookups.with_label_values(&[result]).inc();
        }

        tracing::trace!(result = result, "Recorded cache lookup metric");
    }

    /// Record a validator decision for one candidate question.
    pub fn record_validation(&self, accepted: bool) {
        let decision = if accepted { "accepted" } else { "rejected" };
        if let Some(decisions) = VALIDATION_DECISIONS.get() {
            decisions.with_label_values(&[decision]).inc();
        }
    }

    /// Record a failed persistence write.
    pub fn record_sink_failure(&self) {
        if let Some(failures) = SINK_FAILURES.get() {
            failures.inc();
        }
    }

    /// Update the queue depth gauge.
    pub fn update_queue_depth(&self, depth: usize) {
        if let Some(gauge) = QUEUE_DEPTH.get() {
            gauge.set(depth as f64);
        }
    }

    /// Update the active worker count.
    pub fn update_workers(&self, count: usize) {
        if let Some(gauge) = ACTIVE_WORKERS.get() {
            gauge.set(count as f64);
        }
    }

    /// Increment the jobs-in-progress gauge.
    pub fn inc_jobs_in_progress(&self) {
        if let Some(gauge) = JOBS_IN_PROGRESS.get() {
            gauge.inc();
        }
    }

    /// Decrement the jobs-in-progress gauge.
    pub fn dec_jobs_in_progress(&self) {
        if let Some(gauge) = JOBS_IN_PROGRESS.get() {
            gauge.dec();
        }
    }

    /// Read the current counter values.
    ///
    /// Counters are process-global, so tests compare before/after deltas
    /// rather than absolute values.
    pub fn snapshot(&self) -> MetricsSnapshot {
        let counter_value = |vec: &std::sync::OnceLock<prometheus::CounterVec>, label: &str| {
            vec.get()
                .map(|v| v.with_label_values(&[label]).get() as u64)
                .unwrap_or(0)
        };

        MetricsSnapshot {
            requests_completed: counter_value(&REQUESTS_TOTAL, "completed"),
            requests_failed: counter_value(&REQUESTS_TOTAL, "failed"),
            cache_hits: counter_value(&CACHE_LOOKUPS, "hit"),
            cache_misses: counter_value(&CACHE_LOOKUPS, "miss"),
            cache_errors: counter_value(&CACHE_LOOKUPS, "error"),
            validation_accepted: counter_value(&VALIDATION_DECISIONS, "accepted"),
            validation_rejected: counter_value(&VALIDATION_DECISIONS, "rejected"),
            slot_retries: SLOT_RETRIES.get().map(|c| c.get() as u64).unwrap_or(0),
            sink_failures: SINK_FAILURES.get().map(|c| c.get() as u64).unwrap_or(0),
        }
    }
}
