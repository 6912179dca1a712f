//! Prometheus metric registration and export.

use prometheus::{
    Counter, CounterVec, Encoder, Gauge, HistogramVec, Opts, Registry, TextEncoder,
};
use std::sync::OnceLock;

/// Global Prometheus registry for all quizforge metrics.
pub static REGISTRY: OnceLock<Registry> = OnceLock::new();

/// Total generation requests, labeled by outcome
/// (completed, failed, cache_hit).
pub static REQUESTS_TOTAL: OnceLock<CounterVec> = OnceLock::new();

/// End-to-end generation duration in seconds, labeled by difficulty.
pub static GENERATION_DURATION: OnceLock<HistogramVec> = OnceLock::new();

/// Total slot-level regeneration attempts across all requests.
pub static SLOT_RETRIES: OnceLock<Counter> = OnceLock::new();

/// Cache lookups, labeled by result (hit, miss, error).
pub static CACHE_LOOKUPS: OnceLock<CounterVec> = OnceLock::new();

/// Validator decisions, labeled by decision (accepted, rejected).
pub static VALIDATION_DECISIONS: OnceLock<CounterVec> = OnceLock::new();

/// Persistence writes that failed and left the result cache-only.
pub static SINK_FAILURES: OnceLock<Counter> = OnceLock::new();

/// Jobs waiting in the queue.
pub static QUEUE_DEPTH: OnceLock<Gauge> = OnceLock::new();

/// Number of active workers.
pub static ACTIVE_WORKERS: OnceLock<Gauge> = OnceLock::new();

/// Jobs currently being processed.
pub static JOBS_IN_PROGRESS: OnceLock<Gauge> = OnceLock::new();

/// Initialize all metrics and register them with the registry.
///
/// Call once at startup. Safe to call again; later calls leave the
/// already-registered metrics in place.
///
/// # Errors
///
/// Returns a `prometheus::Error` if metric registration fails, typically
/// due to duplicate metric names.
pub fn init_metrics() -> Result<(), prometheus::Error> {
    if REGISTRY.get().is_some() {
        return Ok(());
    }

    let registry = Registry::new();

    let requests_total = CounterVec::new(
        Opts::new("quizforge_requests_total", "Total generation requests"),
        &["outcome"],
    )?;

    let generation_duration = HistogramVec::new(
        prometheus::HistogramOpts::new(
            "quizforge_generation_duration_seconds",
            "End-to-end generation duration in seconds",
        )
        .buckets(vec![0.5, 1.0, 2.0, 5.0, 10.0, 30.0, 60.0, 120.0]),
        &["difficulty"],
    )?;

    let slot_retries = Counter::new(
        "quizforge_slot_retries_total",
        "Total slot-level regeneration attempts",
    )?;

    let cache_lookups = CounterVec::new(
        Opts::new("quizforge_cache_lookups_total", "Result cache lookups"),
        &["result"],
    )?;

    let validation_decisions = CounterVec::new(
        Opts::new(
            "quizforge_validation_decisions_total",
            "Validator accept/reject decisions",
        ),
        &["decision"],
    )?;

    let sink_failures = Counter::new(
        "quizforge_sink_failures_total",
        "Persistence writes that failed",
    )?;

    let queue_depth = Gauge::new("quizforge_queue_depth", "Jobs waiting in the queue")?;
    let active_workers = Gauge::new("quizforge_active_workers", "Number of active workers")?;
    let jobs_in_progress = Gauge::new(
        "quizforge_jobs_in_progress",
        "Jobs currently being processed",
    )?;

    registry.register(Box::new(requests_total.clone()))?;
    registry.register(Box::new(generation_duration.clone()))?;
    registry.register(Box::new(slot_retries.clone()))?;
    registry.register(Box::new(cache_lookups.clone()))?;
    registry.register(Box::new(validation_decisions.clone()))?;
    registry.register(Box::new(sink_failures.clone()))?;
    registry.register(Box::new(queue_depth.clone()))?;
    registry.register(Box::new(active_workers.clone()))?;
    registry.register(Box::new(jobs_in_progress.clone()))?;

    // If any of these fail, metrics were already initialized (idempotent).
    let _ = REGISTRY.set(registry);
    let _ = REQUESTS_TOTAL.set(requests_total);
    let _ = GENERATION_DURATION.set(generation_duration);
    let _ = SLOT_RETRIES.set(slot_retries);
    let _ = CACHE_LOOKUPS.set(cache_lookups);
    let _ = VALIDATION_DECISIONS.set(validation_decisions);
    let _ = SINK_FAILURES.set(sink_failures);
    let _ = QUEUE_DEPTH.set(queue_depth);
    let _ = ACTIVE_WORKERS.set(active_workers);
    let _ = JOBS_IN_PROGRESS.set(jobs_in_progress);

    tracing::info!("Prometheus metrics initialized");

    Ok(())
}

/// Export all registered metrics in Prometheus text format.
pub fn export_metrics() -> String {
    let Some(registry) = REGISTRY.get() else {
        return "# Metrics not initialized. Call init_metrics() first.\n".to_string();
    };

    let encoder = TextEncoder::new();
    let metric_families = registry.gather();

    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        return format!("# Error encoding metrics: {}\n", e);
    }

    String::from_utf8(buffer)
        .unwrap_or_else(|e| format!("# Error converting metrics to UTF-8: {}\n", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_metrics_idempotent() {
        init_metrics().expect("first init should work");
        init_metrics().expect("second init should be a no-op");
        assert!(REGISTRY.get().is_some());
    }

    #[test]
    fn test_export_after_init() {
        let _ = init_metrics();
        let metrics = export_metrics();
        assert!(!metrics.is_empty());
        assert!(!metrics.starts_with("# Error"));
    }
}
