//! Error types for quizforge operations.
//!
//! Defines error types for the major subsystems:
//! - Request intake and validation
//! - Template loading and selection
//! - Content synthesis (external collaborator)
//! - The generation loop
//! - Result cache and persistence sink

use thiserror::Error;

/// Errors rejected synchronously at request intake.
///
/// These never enter the job queue.
#[derive(Debug, Error)]
pub enum IntakeError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Field '{0}' must not be empty")]
    EmptyField(&'static str),

    #[error("Requested count must be at least 1, got {0}")]
    InvalidCount(u32),

    #[error("Year {0} is outside the supported range 1-13")]
    InvalidYear(u8),
}

/// Errors that can occur during template operations.
#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("Template '{0}' not found")]
    NotFound(String),

    #[error("Failed to parse template file '{path}': {message}")]
    ParseError { path: String, message: String },

    #[error("Duplicate template ID '{0}' found during loading")]
    DuplicateTemplateId(String),

    #[error("Invalid template ID '{0}': must be non-empty and contain only alphanumeric characters, hyphens, and underscores")]
    InvalidTemplateId(String),

    #[error("Invalid difficulty level '{0}': must be 'easy', 'medium', or 'hard'")]
    InvalidDifficultyLevel(String),

    #[error("Missing required field '{field}' in template '{template}'")]
    MissingRequiredField { template: String, field: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Errors from template selection.
#[derive(Debug, Error)]
pub enum SelectorError {
    /// The curriculum/difficulty combination has no remaining candidates.
    /// Fatal for the job; selection is never retried.
    #[error("No suitable template for subject '{subject}', year {year}, topic '{topic}', difficulty '{difficulty}' ({excluded} excluded)")]
    NoSuitableTemplate {
        subject: String,
        year: u8,
        topic: String,
        difficulty: String,
        excluded: usize,
    },
}

/// Errors from the external content-synthesis collaborator.
#[derive(Debug, Error)]
pub enum SynthesisError {
    #[error("Missing synthesis endpoint: QUIZFORGE_SYNTH_URL environment variable not set")]
    MissingEndpoint,

    #[error("HTTP request failed: {0}")]
    RequestFailed(String),

    #[error("Synthesis call timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("Failed to parse synthesis response: {0}")]
    ParseError(String),

    #[error("Prompt rendering failed: {0}")]
    PromptRendering(#[from] tera::Error),

    #[error("API error ({code}): {message}")]
    ApiError { code: u16, message: String },
}

/// Errors that can occur while a worker drives a job through the
/// generation loop.
#[derive(Debug, Error)]
pub enum GenerationError {
    /// No template candidates remain. Terminal; the job is not retried.
    #[error(transparent)]
    Selector(#[from] SelectorError),

    /// A slot failed validation on every permitted attempt. Terminal.
    #[error("Slot {slot} exhausted after {attempts} attempts: {last_issue}")]
    ValidationExhausted {
        slot: usize,
        attempts: u32,
        last_issue: String,
    },

    /// The whole job exceeded its processing deadline.
    #[error("Job processing timed out")]
    JobTimeout,

    /// Unexpected failure outside the slot retry loop.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl GenerationError {
    /// Whether the job may be re-enqueued by the queue retry policy.
    ///
    /// Exhausted slots and empty candidate sets will fail the same way on
    /// every attempt, so only infrastructure failures are retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            GenerationError::JobTimeout | GenerationError::Internal(_)
        )
    }
}

/// Errors from the result cache backend.
///
/// Cache errors are never fatal for the pipeline: a failed `get` degrades
/// to a miss and a failed `set` is logged and dropped.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Cache backend unavailable: {0}")]
    Unavailable(String),

    #[error("Cache serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors from the persistence sink.
///
/// Sink failures are logged and surfaced as a degraded-but-completed
/// status; the result remains available from the cache.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("Persistence write failed: {0}")]
    WriteFailed(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}
