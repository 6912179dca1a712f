//! Pipeline orchestrator coordinating intake, queue, workers, cache,
//! persistence and status.
//!
//! The orchestrator owns the front of the pipeline (validation, dedup,
//! enqueue, status reads); `GenerationService` is the worker-side
//! processor that drives a claimed job through the generation loop and
//! finalizes it.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::cache::{CachedResult, ResultCache};
use crate::error::{CacheError, GenerationError, IntakeError, SinkError, TemplateError};
use crate::intake::{CacheKey, GenerationRequest};
use crate::metrics::MetricsCollector;
use crate::scheduler::worker_pool::PoolError;
use crate::scheduler::{Job, JobOutcome, JobProcessor, JobQueue, PoolStats, QueueStats, WorkerPool, WorkerPoolConfig};
use crate::sink::QuestionSink;
use crate::status::{GenerationStatus, StatusStore};
use crate::synthesis::Synthesizer;
use crate::template::TemplateSelector;
use crate::validation::QuestionValidator;

use super::config::{ConfigError, PipelineConfig};
use super::generation::GenerationLoop;

/// Errors from pipeline assembly and lifecycle.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Template error: {0}")]
    Template(#[from] TemplateError),

    #[error("Worker pool error: {0}")]
    Pool(#[from] PoolError),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("Sink error: {0}")]
    Sink(#[from] SinkError),
}

/// Acknowledgement returned to the caller at intake.
#[derive(Debug, Clone)]
pub struct SubmitReceipt {
    /// Identifier for status polling.
    pub request_id: Uuid,
    /// Cache key the result is (or will be) stored under.
    pub cache_key: CacheKey,
    /// True when an identical request's result was already cached and no
    /// job was enqueued.
    pub deduplicated: bool,
}

/// Worker-side processor: drives one job through the generation loop,
/// then persists, caches and finalizes its status.
pub struct GenerationService {
    generation: GenerationLoop,
    cache: Arc<dyn ResultCache>,
    sink: Arc<dyn QuestionSink>,
    status: Arc<StatusStore>,
    metrics: MetricsCollector,
    cache_ttl: Duration,
}

impl GenerationService {
    pub fn new(
        generation: GenerationLoop,
        cache: Arc<dyn ResultCache>,
        sink: Arc<dyn QuestionSink>,
        status: Arc<StatusStore>,
        cache_ttl: Duration,
    ) -> Self {
        Self {
            generation,
            cache,
            sink,
            status,
            metrics: MetricsCollector::new(),
            cache_ttl,
        }
    }
}

#[async_trait]
impl JobProcessor for GenerationService {
    async fn process(&self, job: &Job) -> Result<JobOutcome, GenerationError> {
        let request_id = job.request_id;
        self.status.mark_in_progress(request_id);

        let status = Arc::clone(&self.status);
        let output = self
            .generation
            .run(&job.request, |progress| {
                status.update_progress(request_id, progress)
            })
            .await?;

        // Persistence failure degrades the result to cache-only instead
        // of failing the job.
        let mut degraded = false;
        if let Err(e) = self.sink.store(request_id, &output.questions).await {
            warn!(
                request_id = %request_id,
                error = %e,
                "Persistence failed; result remains cache-only"
            );
            self.metrics.record_sink_failure();
            degraded = true;
        }

        let cached = CachedResult {
            request_id,
            questions: output.questions,
        };
        if let Err(e) = self
            .cache
            .set(job.cache_key.as_str(), &cached, self.cache_ttl)
            .await
        {
            warn!(
                request_id = %request_id,
                error = %e,
                "Result cache write failed"
            );
        }

        self.status.mark_completed(request_id, job.cache_key.as_str());

        let elapsed = (Utc::now() - job.created_at)
            .to_std()
            .unwrap_or(Duration::ZERO);
        self.metrics.record_request(
            "completed",
            job.request.difficulty.as_str(),
            elapsed.as_secs_f64(),
        );

        Ok(JobOutcome {
            request_id,
            question_count: cached.questions.len(),
            retries: output.total_retries,
            degraded,
        })
    }

    async fn mark_failed(&self, job: &Job, error: &GenerationError) {
        self.status.mark_failed(job.request_id, &error.to_string());
        self.metrics.record_request_outcome("failed");
    }
}

/// Front door of the pipeline.
pub struct PipelineOrchestrator {
    config: PipelineConfig,
    queue: Arc<JobQueue>,
    cache: Arc<dyn ResultCache>,
    status: Arc<StatusStore>,
    metrics: MetricsCollector,
    pool: WorkerPool,
}

impl PipelineOrchestrator {
    /// Assembles the pipeline from its collaborators.
    pub fn new(
        config: PipelineConfig,
        selector: Arc<TemplateSelector>,
        synthesizer: Arc<dyn Synthesizer>,
        validator: Arc<dyn QuestionValidator>,
        cache: Arc<dyn ResultCache>,
        sink: Arc<dyn QuestionSink>,
    ) -> Self {
        let queue = Arc::new(JobQueue::new());
        let status = Arc::new(StatusStore::new());

        let generation = GenerationLoop::new(selector, synthesizer, validator, config.max_retries);
        let service = Arc::new(GenerationService::new(
            generation,
            Arc::clone(&cache),
            sink,
            Arc::clone(&status),
            config.cache_ttl,
        ));

        let pool_config = WorkerPoolConfig::new(config.worker_count)
            .with_job_timeout(config.job_timeout)
            .with_backoff(config.backoff.clone());
        let pool = WorkerPool::new(pool_config, Arc::clone(&queue), service);

        Self {
            config,
            queue,
            cache,
            status,
            metrics: MetricsCollector::new(),
            pool,
        }
    }

    /// Starts the worker pool.
    pub fn start(&mut self) -> Result<(), PipelineError> {
        self.pool.start()?;
        info!(workers = self.config.worker_count, "Pipeline started");
        Ok(())
    }

    /// Gracefully shuts down the worker pool.
    pub async fn shutdown(&mut self) -> Result<(), PipelineError> {
        self.pool.shutdown().await?;
        info!("Pipeline stopped");
        Ok(())
    }

    /// Accepts a generation request.
    ///
    /// Validates it, consults the result cache, and either short-circuits
    /// on a hit or enqueues a job. Cache backend failures degrade to a
    /// forced miss.
    ///
    /// # Errors
    ///
    /// Returns `IntakeError` for malformed requests; these never enter
    /// the queue.
    pub async fn submit(&self, request: GenerationRequest) -> Result<SubmitReceipt, IntakeError> {
        request.validate()?;

        let request_id = Uuid::new_v4();
        let cache_key = request.cache_key();

        match self.cache.get(cache_key.as_str()).await {
            Ok(Some(_)) => {
                self.metrics.record_cache_lookup("hit");
                self.metrics.record_request_outcome("cache_hit");
                self.status
                    .set(GenerationStatus::completed(request_id, cache_key.as_str()));
                info!(
                    request_id = %request_id,
                    cache_key = %cache_key,
                    "Request deduplicated against cached result"
                );
                return Ok(SubmitReceipt {
                    request_id,
                    cache_key,
                    deduplicated: true,
                });
            }
            Ok(None) => self.metrics.record_cache_lookup("miss"),
            Err(e) => {
                warn!(error = %e, "Cache lookup failed; treating as miss");
                self.metrics.record_cache_lookup("error");
            }
        }

        self.status.set(GenerationStatus::queued(request_id));
        let job = Job::new(request_id, request).with_max_attempts(self.config.max_job_attempts);
        self.queue.enqueue(job);
        self.metrics.update_queue_depth(self.queue.len());

        info!(
            request_id = %request_id,
            cache_key = %cache_key,
            "Request enqueued"
        );
        Ok(SubmitReceipt {
            request_id,
            cache_key,
            deduplicated: false,
        })
    }

    /// Current status of a request, if known.
    pub fn status(&self, request_id: Uuid) -> Option<GenerationStatus> {
        self.status.get(request_id)
    }

    /// Fetches a finished result set from the cache.
    pub async fn result(&self, cache_key: &CacheKey) -> Result<Option<CachedResult>, CacheError> {
        self.cache.get(cache_key.as_str()).await
    }

    /// Polls until the request reaches a terminal state or `timeout`
    /// elapses. Returns the last observed status.
    pub async fn wait_for(
        &self,
        request_id: Uuid,
        timeout: Duration,
        poll_interval: Duration,
    ) -> Option<GenerationStatus> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let status = self.status.get(request_id);
            if status.as_ref().is_some_and(|s| s.state.is_terminal()) {
                return status;
            }
            if tokio::time::Instant::now() >= deadline {
                return status;
            }
            tokio::time::sleep(poll_interval).await;
        }
    }

    pub fn queue_stats(&self) -> QueueStats {
        self.queue.stats()
    }

    pub fn pool_stats(&self) -> PoolStats {
        self.pool.stats()
    }

    pub fn is_running(&self) -> bool {
        self.pool.is_running()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;
    use crate::curriculum::{CurriculumMapping, Difficulty};
    use crate::error::SynthesisError;
    use crate::question::QuestionType;
    use crate::sink::MemorySink;
    use crate::synthesis::SynthesizedContent;
    use crate::template::{QuestionTemplate, TemplateRegistry};
    use crate::validation::RuleValidator;

    struct NeverSynthesizer;

    #[async_trait]
    impl Synthesizer for NeverSynthesizer {
        async fn synthesize(
            &self,
            _template: &QuestionTemplate,
            _curriculum: &CurriculumMapping,
        ) -> Result<SynthesizedContent, SynthesisError> {
            Err(SynthesisError::RequestFailed("unreachable".to_string()))
        }
    }

    fn orchestrator(cache: Arc<dyn ResultCache>) -> PipelineOrchestrator {
        let mut registry = TemplateRegistry::new();
        registry
            .insert(QuestionTemplate {
                id: "fb-001".to_string(),
                question_type: QuestionType::FillBlank,
                pattern: "Fill in the blank about {{ topic }}.".to_string(),
                curriculum: CurriculumMapping::new("mathematics", 3, "fractions"),
                difficulty: Difficulty::Medium,
                distractor_count: 3,
            })
            .unwrap();

        PipelineOrchestrator::new(
            PipelineConfig::default(),
            Arc::new(TemplateSelector::new(Arc::new(registry))),
            Arc::new(NeverSynthesizer),
            Arc::new(RuleValidator::new()),
            cache,
            Arc::new(MemorySink::new()),
        )
    }

    fn request() -> GenerationRequest {
        GenerationRequest::new(
            CurriculumMapping::new("mathematics", 3, "fractions"),
            Difficulty::Medium,
            1,
        )
    }

    #[tokio::test]
    async fn test_submit_rejects_invalid_request() {
        let orch = orchestrator(Arc::new(MemoryCache::new()));

        let mut bad = request();
        bad.count = 0;
        assert!(matches!(
            orch.submit(bad).await,
            Err(IntakeError::InvalidCount(0))
        ));
        assert_eq!(orch.queue_stats().jobs_created, 0);
    }

    #[tokio::test]
    async fn test_submit_enqueues_on_miss() {
        let orch = orchestrator(Arc::new(MemoryCache::new()));

        let receipt = orch.submit(request()).await.expect("submit should work");
        assert!(!receipt.deduplicated);
        assert_eq!(orch.queue_stats().jobs_created, 1);

        let status = orch.status(receipt.request_id).expect("status exists");
        assert_eq!(status.state, crate::status::GenerationState::Queued);
    }

    #[tokio::test]
    async fn test_submit_short_circuits_on_hit() {
        let cache = Arc::new(MemoryCache::new());
        let key = request().cache_key();
        cache
            .set(
                key.as_str(),
                &CachedResult {
                    request_id: Uuid::new_v4(),
                    questions: Vec::new(),
                },
                Duration::from_secs(60),
            )
            .await
            .unwrap();

        let orch = orchestrator(cache);
        let receipt = orch.submit(request()).await.expect("submit should work");

        assert!(receipt.deduplicated);
        assert_eq!(orch.queue_stats().jobs_created, 0);

        let status = orch.status(receipt.request_id).expect("status exists");
        assert_eq!(status.state, crate::status::GenerationState::Completed);
        assert_eq!(status.result.as_deref(), Some(key.as_str()));
    }
}
