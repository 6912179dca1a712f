//! Job descriptors for the scheduler.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::intake::{CacheKey, GenerationRequest};

/// Default maximum number of job-level attempts.
const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// A unit of work: one generation request to be driven through the
/// generation loop.
///
/// A job is owned exclusively by the queue until a worker claims it;
/// ownership then transfers to that worker for the job's lifetime, so the
/// attempt counter needs no synchronization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    /// Request identifier, also used for status polling.
    pub request_id: Uuid,
    /// The accepted, validated request.
    pub request: GenerationRequest,
    /// Cache key the finished result will be stored under.
    pub cache_key: CacheKey,
    /// When the job was created.
    pub created_at: DateTime<Utc>,
    /// When the job was (last) enqueued.
    pub enqueued_at: DateTime<Utc>,
    /// Number of job-level processing attempts so far.
    pub attempts: u32,
    /// Maximum job-level attempts before dead-lettering.
    pub max_attempts: u32,
}

impl Job {
    /// Creates a new job for an accepted request.
    pub fn new(request_id: Uuid, request: GenerationRequest) -> Self {
        let cache_key = request.cache_key();
        let now = Utc::now();
        Self {
            request_id,
            request,
            cache_key,
            created_at: now,
            enqueued_at: now,
            attempts: 0,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    /// Sets the maximum number of job-level attempts.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Increments the attempt counter. Called once per processing attempt.
    pub fn increment_attempts(&mut self) {
        self.attempts += 1;
    }

    /// Whether the queue retry policy may re-enqueue this job.
    pub fn should_retry(&self) -> bool {
        self.attempts < self.max_attempts
    }

    /// Remaining job-level attempts.
    pub fn remaining_attempts(&self) -> u32 {
        self.max_attempts.saturating_sub(self.attempts)
    }

    /// Total question slots this job must fill.
    pub fn slot_count(&self) -> u32 {
        self.request.count
    }
}

/// Result of a successfully processed job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobOutcome {
    pub request_id: Uuid,
    /// Number of questions generated (equals the requested count).
    pub question_count: usize,
    /// Total regeneration attempts across all slots.
    pub retries: u32,
    /// True when the persistence write failed but the result is still
    /// available from the cache.
    pub degraded: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::curriculum::{CurriculumMapping, Difficulty};

    fn job() -> Job {
        let request = GenerationRequest::new(
            CurriculumMapping::new("mathematics", 3, "fractions"),
            Difficulty::Medium,
            2,
        );
        Job::new(Uuid::new_v4(), request)
    }

    #[test]
    fn test_new_job_defaults() {
        let job = job();
        assert_eq!(job.attempts, 0);
        assert_eq!(job.max_attempts, 3);
        assert_eq!(job.slot_count(), 2);
        assert!(job.should_retry());
        assert_eq!(job.cache_key, job.request.cache_key());
    }

    #[test]
    fn test_attempt_counting() {
        let mut job = job().with_max_attempts(2);

        job.increment_attempts();
        assert!(job.should_retry());
        assert_eq!(job.remaining_attempts(), 1);

        job.increment_attempts();
        assert!(!job.should_retry());
        assert_eq!(job.remaining_attempts(), 0);
    }

    #[test]
    fn test_job_serialization() {
        let job = job();
        let json = serde_json::to_string(&job).expect("serialization should work");
        let parsed: Job = serde_json::from_str(&json).expect("deserialization should work");
        assert_eq!(parsed.request_id, job.request_id);
        assert_eq!(parsed.cache_key, job.cache_key);
    }
}
