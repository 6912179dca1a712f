//! Worker pool for processing generation jobs.
//!
//! A fixed number of workers pull jobs from the shared queue. Each worker
//! runs as an independent async task, processes one job fully before
//! pulling the next, and never interleaves slots within a job.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::error::GenerationError;
use crate::metrics::MetricsCollector;

use super::job::{Job, JobOutcome};
use super::queue::{BackoffPolicy, JobQueue};

/// Errors that can occur in the worker pool.
#[derive(Debug, Error)]
pub enum PoolError {
    #[error("Pool is already running")]
    AlreadyRunning,

    #[error("Pool is not running")]
    NotRunning,

    #[error("Shutdown timed out after {0:?}")]
    ShutdownTimeout(Duration),
}

/// Processes a claimed job end to end.
///
/// Implemented by the generation service; stubbed in pool tests.
#[async_trait]
pub trait JobProcessor: Send + Sync {
    /// Drives the job through the generation loop, persistence and cache.
    async fn process(&self, job: &Job) -> Result<JobOutcome, GenerationError>;

    /// Finalizes the request as failed once retries are exhausted or the
    /// error is terminal.
    async fn mark_failed(&self, job: &Job, error: &GenerationError);
}

/// Configuration for the worker pool.
#[derive(Debug, Clone)]
pub struct WorkerPoolConfig {
    /// Number of worker tasks to spawn.
    pub num_workers: usize,
    /// How long a dequeue waits before re-checking for shutdown.
    pub poll_interval: Duration,
    /// Maximum time allowed for processing a single job.
    pub job_timeout: Duration,
    /// Timeout for graceful shutdown.
    pub shutdown_timeout: Duration,
    /// Backoff policy for job-level retries.
    pub backoff: BackoffPolicy,
}

impl Default for WorkerPoolConfig {
    fn default() -> Self {
        Self {
            num_workers: 4,
            poll_interval: Duration::from_millis(250),
            job_timeout: Duration::from_secs(300),
            shutdown_timeout: Duration::from_secs(30),
            backoff: BackoffPolicy::default(),
        }
    }
}

impl WorkerPoolConfig {
    pub fn new(num_workers: usize) -> Self {
        Self {
            num_workers,
            ..Default::default()
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_job_timeout(mut self, timeout: Duration) -> Self {
        self.job_timeout = timeout;
        self
    }

    pub fn with_backoff(mut self, backoff: BackoffPolicy) -> Self {
        self.backoff = backoff;
        self
    }
}

/// Statistics about the worker pool.
#[derive(Debug, Clone, Default)]
pub struct PoolStats {
    pub num_workers: usize,
    pub active_workers: usize,
    pub jobs_completed: u64,
    pub jobs_failed: u64,
    pub jobs_retried: u64,
    pub average_job_duration: Duration,
}

impl PoolStats {
    pub fn total_processed(&self) -> u64 {
        self.jobs_completed + self.jobs_failed
    }
}

/// Shared counters updated by workers.
struct SharedPoolStats {
    jobs_completed: AtomicU64,
    jobs_failed: AtomicU64,
    jobs_retried: AtomicU64,
    total_duration_ms: AtomicU64,
    active_workers: AtomicU64,
}

impl SharedPoolStats {
    fn new() -> Self {
        Self {
            jobs_completed: AtomicU64::new(0),
            jobs_failed: AtomicU64::new(0),
            jobs_retried: AtomicU64::new(0),
            total_duration_ms: AtomicU64::new(0),
            active_workers: AtomicU64::new(0),
        }
    }

    fn record_completion(&self, duration: Duration) {
        self.jobs_completed.fetch_add(1, Ordering::SeqCst);
        self.total_duration_ms
            .fetch_add(duration.as_millis() as u64, Ordering::SeqCst);
    }

    fn record_failure(&self, duration: Duration) {
        self.jobs_failed.fetch_add(1, Ordering::SeqCst);
        self.total_duration_ms
            .fetch_add(duration.as_millis() as u64, Ordering::SeqCst);
    }

    fn to_pool_stats(&self, num_workers: usize) -> PoolStats {
        let completed = self.jobs_completed.load(Ordering::SeqCst);
        let failed = self.jobs_failed.load(Ordering::SeqCst);
        let total = completed + failed;
        let average = if total > 0 {
            Duration::from_millis(self.total_duration_ms.load(Ordering::SeqCst) / total)
        } else {
            Duration::ZERO
        };

        PoolStats {
            num_workers,
            active_workers: self.active_workers.load(Ordering::SeqCst) as usize,
            jobs_completed: completed,
            jobs_failed: failed,
            jobs_retried: self.jobs_retried.load(Ordering::SeqCst),
            average_job_duration: average,
        }
    }
}

/// Pool of workers pulling jobs from a shared queue.
pub struct WorkerPool {
    config: WorkerPoolConfig,
    queue: Arc<JobQueue>,
    processor: Arc<dyn JobProcessor>,
    metrics: MetricsCollector,
    shutdown_tx: broadcast::Sender<()>,
    worker_handles: Vec<JoinHandle<()>>,
    stats: Arc<SharedPoolStats>,
    is_running: AtomicBool,
}

impl WorkerPool {
    pub fn new(
        config: WorkerPoolConfig,
        queue: Arc<JobQueue>,
        processor: Arc<dyn JobProcessor>,
    ) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);

        Self {
            config,
            queue,
            processor,
            metrics: MetricsCollector::new(),
            shutdown_tx,
            worker_handles: Vec::new(),
            stats: Arc::new(SharedPoolStats::new()),
            is_running: AtomicBool::new(false),
        }
    }

    /// Starts all workers. They begin polling the queue immediately.
    pub fn start(&mut self) -> Result<(), PoolError> {
        if self.is_running.load(Ordering::SeqCst) {
            return Err(PoolError::AlreadyRunning);
        }

        for i in 0..self.config.num_workers {
            let worker = Worker {
                id: format!("worker-{}", i),
                queue: Arc::clone(&self.queue),
                processor: Arc::clone(&self.processor),
                metrics: self.metrics.clone(),
                shutdown_rx: self.shutdown_tx.subscribe(),
                poll_interval: self.config.poll_interval,
                job_timeout: self.config.job_timeout,
                backoff: self.config.backoff.clone(),
                stats: Arc::clone(&self.stats),
            };

            self.worker_handles.push(tokio::spawn(async move {
                worker.run().await;
            }));
        }

        self.is_running.store(true, Ordering::SeqCst);
        self.metrics.update_workers(self.config.num_workers);
        info!(num_workers = self.config.num_workers, "Worker pool started");

        Ok(())
    }

    /// Gracefully shuts down: signals all workers and waits for them to
    /// finish their current jobs.
    pub async fn shutdown(&mut self) -> Result<(), PoolError> {
        if !self.is_running.load(Ordering::SeqCst) {
            return Err(PoolError::NotRunning);
        }

        info!("Initiating worker pool shutdown");
        let _ = self.shutdown_tx.send(());

        let drain = async {
            for handle in self.worker_handles.drain(..) {
                if let Err(e) = handle.await {
                    error!(error = %e, "Worker task panicked during shutdown");
                }
            }
        };

        let result = match tokio::time::timeout(self.config.shutdown_timeout, drain).await {
            Ok(()) => Ok(()),
            Err(_) => Err(PoolError::ShutdownTimeout(self.config.shutdown_timeout)),
        };

        self.is_running.store(false, Ordering::SeqCst);
        self.metrics.update_workers(0);
        result
    }

    /// Current pool statistics.
    pub fn stats(&self) -> PoolStats {
        self.stats.to_pool_stats(self.config.num_workers)
    }

    pub fn is_running(&self) -> bool {
        self.is_running.load(Ordering::SeqCst)
    }

    pub fn num_workers(&self) -> usize {
        self.config.num_workers
    }
}

/// A single worker task.
struct Worker {
    id: String,
    queue: Arc<JobQueue>,
    processor: Arc<dyn JobProcessor>,
    metrics: MetricsCollector,
    shutdown_rx: broadcast::Receiver<()>,
    poll_interval: Duration,
    job_timeout: Duration,
    backoff: BackoffPolicy,
    stats: Arc<SharedPoolStats>,
}

impl Worker {
    async fn run(mut self) {
        info!(worker_id = %self.id, "Worker started");

        loop {
            match self.shutdown_rx.try_recv() {
                Ok(()) | Err(broadcast::error::TryRecvError::Closed) => {
                    info!(worker_id = %self.id, "Worker received shutdown signal");
                    break;
                }
                Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
                Err(broadcast::error::TryRecvError::Empty) => {}
            }

            match self.queue.dequeue(self.poll_interval).await {
                Some(job) => self.process_job(job).await,
                None => {
                    debug!(worker_id = %self.id, "No jobs available");
                }
            }
        }

        info!(worker_id = %self.id, "Worker stopped");
    }

    async fn process_job(&self, mut job: Job) {
        let start = Instant::now();
        job.increment_attempts();

        info!(
            worker_id = %self.id,
            request_id = %job.request_id,
            attempt = job.attempts,
            slots = job.slot_count(),
            "Processing job"
        );

        self.stats.active_workers.fetch_add(1, Ordering::SeqCst);
        self.metrics.inc_jobs_in_progress();

        let result = match tokio::time::timeout(self.job_timeout, self.processor.process(&job)).await
        {
            Ok(result) => result,
            Err(_) => Err(GenerationError::JobTimeout),
        };

        let duration = start.elapsed();
        self.stats.active_workers.fetch_sub(1, Ordering::SeqCst);
        self.metrics.dec_jobs_in_progress();
        self.metrics.update_queue_depth(self.queue.len());

        match result {
            Ok(outcome) => {
                self.stats.record_completion(duration);
                info!(
                    worker_id = %self.id,
                    request_id = %job.request_id,
                    questions = outcome.question_count,
                    retries = outcome.retries,
                    degraded = outcome.degraded,
                    duration_ms = duration.as_millis() as u64,
                    "Job completed"
                );
            }
            Err(e) if e.is_retryable() && job.should_retry() => {
                self.stats.jobs_retried.fetch_add(1, Ordering::SeqCst);
                let delay = self.backoff.delay_for(job.attempts.saturating_sub(1));
                warn!(
                    worker_id = %self.id,
                    request_id = %job.request_id,
                    error = %e,
                    remaining_attempts = job.remaining_attempts(),
                    delay_ms = delay.as_millis() as u64,
                    "Job failed, re-enqueueing with backoff"
                );
                Arc::clone(&self.queue).schedule_retry(job, delay);
            }
            Err(e) => {
                self.stats.record_failure(duration);
                error!(
                    worker_id = %self.id,
                    request_id = %job.request_id,
                    error = %e,
                    "Job failed terminally, dead-lettering"
                );
                self.processor.mark_failed(&job, &e).await;
                self.queue.dead_letter(job, e.to_string());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::curriculum::{CurriculumMapping, Difficulty};
    use crate::intake::GenerationRequest;
    use std::sync::atomic::AtomicU32;
    use uuid::Uuid;

    fn test_job() -> Job {
        Job::new(
            Uuid::new_v4(),
            GenerationRequest::new(
                CurriculumMapping::new("mathematics", 3, "fractions"),
                Difficulty::Medium,
                1,
            ),
        )
    }

    /// Processor that fails a configurable number of times before
    /// succeeding.
    struct FlakyProcessor {
        failures: AtomicU32,
        failed_jobs: AtomicU32,
    }

    impl FlakyProcessor {
        fn new(failures: u32) -> Self {
            Self {
                failures: AtomicU32::new(failures),
                failed_jobs: AtomicU32::new(0),
            }
        }
    }

    #[async_trait]
    impl JobProcessor for FlakyProcessor {
        async fn process(&self, job: &Job) -> Result<JobOutcome, GenerationError> {
            let remaining = self.failures.load(Ordering::SeqCst);
            if remaining > 0 {
                self.failures.store(remaining - 1, Ordering::SeqCst);
                return Err(GenerationError::Internal("transient".to_string()));
            }
            Ok(JobOutcome {
                request_id: job.request_id,
                question_count: 1,
                retries: 0,
                degraded: false,
            })
        }

        async fn mark_failed(&self, _job: &Job, _error: &GenerationError) {
            self.failed_jobs.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn fast_config() -> WorkerPoolConfig {
        WorkerPoolConfig::new(2)
            .with_poll_interval(Duration::from_millis(20))
            .with_backoff(BackoffPolicy {
                base_delay: Duration::from_millis(5),
                factor: 2.0,
                max_delay: Duration::from_millis(50),
            })
    }

    async fn wait_for<F: Fn() -> bool>(cond: F) {
        for _ in 0..200 {
            if cond() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("condition not reached in time");
    }

    #[tokio::test]
    async fn test_pool_processes_jobs() {
        let queue = Arc::new(JobQueue::new());
        let processor = Arc::new(FlakyProcessor::new(0));
        let mut pool = WorkerPool::new(fast_config(), Arc::clone(&queue), processor);

        pool.start().expect("pool should start");
        queue.enqueue(test_job());
        queue.enqueue(test_job());

        wait_for(|| pool.stats().jobs_completed == 2).await;
        pool.shutdown().await.expect("shutdown should work");
        assert!(!pool.is_running());
    }

    #[tokio::test]
    async fn test_retryable_failure_is_retried_then_succeeds() {
        let queue = Arc::new(JobQueue::new());
        let processor = Arc::new(FlakyProcessor::new(2));
        let mut pool = WorkerPool::new(fast_config(), Arc::clone(&queue), Arc::clone(&processor) as Arc<dyn JobProcessor>);

        pool.start().expect("pool should start");
        queue.enqueue(test_job());

        wait_for(|| pool.stats().jobs_completed == 1).await;
        let stats = pool.stats();
        assert_eq!(stats.jobs_retried, 2);
        assert_eq!(stats.jobs_failed, 0);
        pool.shutdown().await.expect("shutdown should work");
    }

    #[tokio::test]
    async fn test_exhausted_retries_dead_letter() {
        let queue = Arc::new(JobQueue::new());
        // More failures than the job's 3 attempts allow.
        let processor = Arc::new(FlakyProcessor::new(10));
        let mut pool = WorkerPool::new(fast_config(), Arc::clone(&queue), Arc::clone(&processor) as Arc<dyn JobProcessor>);

        pool.start().expect("pool should start");
        queue.enqueue(test_job());

        wait_for(|| pool.stats().jobs_failed == 1).await;
        assert_eq!(queue.stats().dead_letter_jobs, 1);
        assert_eq!(processor.failed_jobs.load(Ordering::SeqCst), 1);
        pool.shutdown().await.expect("shutdown should work");
    }

    #[tokio::test]
    async fn test_double_start_rejected() {
        let queue = Arc::new(JobQueue::new());
        let processor = Arc::new(FlakyProcessor::new(0));
        let mut pool = WorkerPool::new(fast_config(), queue, processor);

        pool.start().expect("first start should work");
        assert!(matches!(pool.start(), Err(PoolError::AlreadyRunning)));
        pool.shutdown().await.expect("shutdown should work");
    }
}
