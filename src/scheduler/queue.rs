//! In-process FIFO job queue with delayed retry and dead-lettering.
//!
//! Jobs are enqueued at the back and dequeued from the front. Retried jobs
//! re-enter at the back after their backoff delay, so overall completion
//! order is best-effort FIFO only. The backoff delay is a scheduling hint:
//! a busy pool may pick up a ready retry later than its nominal time.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use tokio::sync::Notify;
use tracing::debug;

use super::job::Job;

/// Exponential backoff between job-level retries:
/// `base_delay * factor^attempt`, capped at `max_delay`.
#[derive(Debug, Clone)]
pub struct BackoffPolicy {
    pub base_delay: Duration,
    pub factor: f64,
    pub max_delay: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_millis(500),
            factor: 2.0,
            max_delay: Duration::from_secs(30),
        }
    }
}

impl BackoffPolicy {
    /// Delay before retry number `attempt` (0-based: the first retry uses
    /// the base delay).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let multiplier = self.factor.powi(attempt.min(31) as i32);
        let delay = self.base_delay.mul_f64(multiplier.max(1.0));
        delay.min(self.max_delay)
    }
}

/// A job that exhausted its job-level attempts, kept for inspection.
#[derive(Debug, Clone)]
pub struct DeadLetter {
    pub job: Job,
    pub error: String,
    pub moved_at: chrono::DateTime<Utc>,
}

/// Statistics about queue state.
#[derive(Debug, Clone)]
pub struct QueueStats {
    /// Jobs waiting to be claimed.
    pub pending_jobs: usize,
    /// Jobs ever enqueued, including retries.
    pub total_enqueued: u64,
    /// Jobs created (first enqueue only).
    pub jobs_created: u64,
    /// Jobs that exhausted their attempts.
    pub dead_letter_jobs: usize,
}

/// Shared FIFO queue feeding the worker pool.
pub struct JobQueue {
    pending: Mutex<VecDeque<Job>>,
    dead_letters: Mutex<Vec<DeadLetter>>,
    notify: Notify,
    total_enqueued: AtomicU64,
    jobs_created: AtomicU64,
}

impl Default for JobQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl JobQueue {
    pub fn new() -> Self {
        Self {
            pending: Mutex::new(VecDeque::new()),
            dead_letters: Mutex::new(Vec::new()),
            notify: Notify::new(),
            total_enqueued: AtomicU64::new(0),
            jobs_created: AtomicU64::new(0),
        }
    }

    /// Enqueues a new job at the back of the queue.
    pub fn enqueue(&self, mut job: Job) {
        job.enqueued_at = Utc::now();
        if job.attempts == 0 {
            self.jobs_created.fetch_add(1, Ordering::SeqCst);
        }
        self.total_enqueued.fetch_add(1, Ordering::SeqCst);

        self.pending
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(job);
        self.notify.notify_one();
    }

    /// Claims the next job, waiting up to `timeout` for one to arrive.
    ///
    /// Ownership of the returned job transfers to the caller for the
    /// job's lifetime.
    pub async fn dequeue(&self, timeout: Duration) -> Option<Job> {
        tokio::time::timeout(timeout, self.dequeue_wait())
            .await
            .ok()
    }

    async fn dequeue_wait(&self) -> Job {
        loop {
            if let Some(job) = self
                .pending
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .pop_front()
            {
                return job;
            }
            self.notify.notified().await;
        }
    }

    /// Re-enqueues a failed job at the back after `delay`.
    ///
    /// The job's attempt counter must already have been incremented by
    /// the worker.
    pub fn schedule_retry(self: Arc<Self>, job: Job, delay: Duration) {
        debug!(
            request_id = %job.request_id,
            attempt = job.attempts,
            delay_ms = delay.as_millis() as u64,
            "Scheduling job retry"
        );

        let queue = self;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            queue.enqueue(job);
        });
    }

    /// Records a job that exhausted its attempts.
    pub fn dead_letter(&self, job: Job, error: impl Into<String>) {
        self.dead_letters
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(DeadLetter {
                job,
                error: error.into(),
                moved_at: Utc::now(),
            });
    }

    /// Jobs currently waiting.
    pub fn len(&self) -> usize {
        self.pending
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of jobs created (first enqueues, excluding retries).
    pub fn jobs_created(&self) -> u64 {
        self.jobs_created.load(Ordering::SeqCst)
    }

    /// Snapshot of dead letters for inspection.
    pub fn peek_dead_letters(&self, limit: usize) -> Vec<DeadLetter> {
        let letters = self.dead_letters.lock().unwrap_or_else(|e| e.into_inner());
        letters.iter().take(limit).cloned().collect()
    }

    /// Queue statistics.
    pub fn stats(&self) -> QueueStats {
        QueueStats {
            pending_jobs: self.len(),
            total_enqueued: self.total_enqueued.load(Ordering::SeqCst),
            jobs_created: self.jobs_created(),
            dead_letter_jobs: self
                .dead_letters
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .len(),
        }
    }
}
