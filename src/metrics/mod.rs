//! Prometheus-based operational metrics.
//!
//! Counters and gauges covering request outcomes, cache effectiveness,
//! validation decisions, retry pressure, and worker activity.
//!
//! # Example
//!
//! ```ignore
//! use quizforge::metrics::{init_metrics, export_metrics, MetricsCollector};
//!
//! init_metrics().expect("Failed to initialize metrics");
//!
//! let collector = MetricsCollector::new();
//! collector.record_cache_lookup("hit");
//!
//! let metrics_text = export_metrics();
//! ```

pub mod collectors;
pub mod prometheus;

pub use collectors::{MetricsCollector, MetricsSnapshot};
pub use prometheus::{export_metrics, init_metrics};

pub use prometheus::{
    ACTIVE_WORKERS, CACHE_LOOKUPS, GENERATION_DURATION, JOBS_IN_PROGRESS, QUEUE_DEPTH, REGISTRY,
    REQUESTS_TOTAL, SINK_FAILURES, SLOT_RETRIES, VALIDATION_DECISIONS,
};
