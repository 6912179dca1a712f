//! Job scheduling: queue, workers, and retry policy.
//!
//! A bounded set of workers pulls jobs from a single shared FIFO queue.
//! Each worker processes one job fully before pulling the next; workers
//! run concurrently across distinct jobs, which is the system's only
//! parallelism axis. Failed jobs are re-enqueued with exponential backoff
//! up to a job-level attempt bound, then dead-lettered.

pub mod job;
pub mod queue;
pub mod worker_pool;

pub use job::{Job, JobOutcome};
pub use queue::{BackoffPolicy, JobQueue, QueueStats};
pub use worker_pool::{JobProcessor, PoolStats, WorkerPool, WorkerPoolConfig};
