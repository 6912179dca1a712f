//! Pipeline configuration for the orchestrator.
//!
//! Covers worker sizing, the two retry budgets (slot-level regeneration
//! and job-level re-enqueueing), timeouts, cache TTL, template location,
//! and the optional external backends.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::scheduler::BackoffPolicy;

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An environment variable has an invalid value.
    #[error("Invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    /// Configuration validation failed.
    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),
}

/// Configuration for the generation pipeline.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    // Worker settings
    /// Number of worker tasks processing jobs concurrently.
    pub worker_count: usize,
    /// Timeout for processing a single job end to end.
    pub job_timeout: Duration,

    // Retry settings
    /// Maximum regeneration attempts per question slot beyond the first.
    pub max_retries: u32,
    /// Maximum job-level attempts before dead-lettering.
    pub max_job_attempts: u32,
    /// Backoff policy between job-level retries.
    pub backoff: BackoffPolicy,

    // Synthesis settings
    /// Deadline for a single synthesis call.
    pub synthesis_timeout: Duration,

    // Cache settings
    /// Time-to-live for cached results.
    pub cache_ttl: Duration,

    // Template settings
    /// Directory holding question template definitions.
    pub templates_dir: PathBuf,

    // Backend settings
    /// Redis connection URL; in-memory cache is used when absent.
    pub redis_url: Option<String>,
    /// SQLite database URL; in-memory sink is used when absent.
    pub database_url: Option<String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            worker_count: 4,
            job_timeout: Duration::from_secs(300),

            max_retries: 3,
            max_job_attempts: 3,
            backoff: BackoffPolicy::default(),

            synthesis_timeout: Duration::from_secs(30),

            cache_ttl: Duration::from_secs(300),

            templates_dir: PathBuf::from("./templates"),

            redis_url: None,
            database_url: None,
        }
    }
}

impl PipelineConfig {
    /// Creates a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `QUIZFORGE_WORKERS`: Worker count (default: 4)
    /// - `QUIZFORGE_JOB_TIMEOUT_SECS`: Job processing timeout (default: 300)
    /// - `QUIZFORGE_MAX_RETRIES`: Slot regeneration budget (default: 3)
    /// - `QUIZFORGE_MAX_JOB_ATTEMPTS`: Job-level attempts (default: 3)
    /// - `QUIZFORGE_SYNTH_TIMEOUT_SECS`: Synthesis call deadline (default: 30)
    /// - `QUIZFORGE_CACHE_TTL_SECS`: Result cache TTL (default: 300)
    /// - `QUIZFORGE_TEMPLATES_DIR`: Template directory (default: ./templates)
    /// - `QUIZFORGE_REDIS_URL`: Redis URL (optional)
    /// - `QUIZFORGE_DATABASE_URL`: SQLite URL (optional)
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable has an invalid value or the
    /// resulting configuration fails validation.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("QUIZFORGE_WORKERS") {
            config.worker_count = parse_env_value(&val, "QUIZFORGE_WORKERS")?;
        }

        if let Ok(val) = std::env::var("QUIZFORGE_JOB_TIMEOUT_SECS") {
            let secs: u64 = parse_env_value(&val, "QUIZFORGE_JOB_TIMEOUT_SECS")?;
            config.job_timeout = Duration::from_secs(secs);
        }

        if let Ok(val) = std::env::var("QUIZFORGE_MAX_RETRIES") {
            config.max_retries = parse_env_value(&val, "QUIZFORGE_MAX_RETRIES")?;
        }

        if let Ok(val) = std::env::var("QUIZFORGE_MAX_JOB_ATTEMPTS") {
            config.max_job_attempts = parse_env_value(&val, "QUIZFORGE_MAX_JOB_ATTEMPTS")?;
        }

        if let Ok(val) = std::env::var("QUIZFORGE_SYNTH_TIMEOUT_SECS") {
            let secs: u64 = parse_env_value(&val, "QUIZFORGE_SYNTH_TIMEOUT_SECS")?;
            config.synthesis_timeout = Duration::from_secs(secs);
        }

        if let Ok(val) = std::env::var("QUIZFORGE_CACHE_TTL_SECS") {
            let secs: u64 = parse_env_value(&val, "QUIZFORGE_CACHE_TTL_SECS")?;
            config.cache_ttl = Duration::from_secs(secs);
        }

        if let Ok(val) = std::env::var("QUIZFORGE_TEMPLATES_DIR") {
            config.templates_dir = PathBuf::from(val);
        }

        if let Ok(val) = std::env::var("QUIZFORGE_REDIS_URL") {
            config.redis_url = Some(val);
        }

        if let Ok(val) = std::env::var("QUIZFORGE_DATABASE_URL") {
            config.database_url = Some(val);
        }

        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationFailed` if any values are invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.worker_count == 0 {
            return Err(ConfigError::ValidationFailed(
                "worker_count must be greater than 0".to_string(),
            ));
        }

        if self.job_timeout.is_zero() {
            return Err(ConfigError::ValidationFailed(
                "job_timeout must be greater than 0".to_string(),
            ));
        }

        if self.max_job_attempts == 0 {
            return Err(ConfigError::ValidationFailed(
                "max_job_attempts must be greater than 0".to_string(),
            ));
        }

        if self.synthesis_timeout.is_zero() {
            return Err(ConfigError::ValidationFailed(
                "synthesis_timeout must be greater than 0".to_string(),
            ));
        }

        if self.synthesis_timeout >= self.job_timeout {
            return Err(ConfigError::ValidationFailed(
                "synthesis_timeout must be less than job_timeout".to_string(),
            ));
        }

        if self.cache_ttl.is_zero() {
            return Err(ConfigError::ValidationFailed(
                "cache_ttl must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Builder method to set the worker count.
    pub fn with_workers(mut self, count: usize) -> Self {
        self.worker_count = count;
        self
    }

    /// Builder method to set the job processing timeout.
    pub fn with_job_timeout(mut self, timeout: Duration) -> Self {
        self.job_timeout = timeout;
        self
    }

    /// Builder method to set the slot regeneration budget.
    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    /// Builder method to set the job-level attempt bound.
    pub fn with_max_job_attempts(mut self, attempts: u32) -> Self {
        self.max_job_attempts = attempts;
        self
    }

    /// Builder method to set the backoff policy.
    pub fn with_backoff(mut self, backoff: BackoffPolicy) -> Self {
        self.backoff = backoff;
        self
    }

    /// Builder method to set the synthesis call deadline.
    pub fn with_synthesis_timeout(mut self, timeout: Duration) -> Self {
        self.synthesis_timeout = timeout;
        self
    }

    /// Builder method to set the cache TTL.
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    /// Builder method to set the template directory.
    pub fn with_templates_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.templates_dir = dir.into();
        self
    }

    /// Builder method to set the Redis URL.
    pub fn with_redis_url(mut self, url: impl Into<String>) -> Self {
        self.redis_url = Some(url.into());
        self
    }

    /// Builder method to set the database URL.
    pub fn with_database_url(mut self, url: impl Into<String>) -> Self {
        self.database_url = Some(url.into());
        self
    }
}

/// Parse an environment variable value into a type.
fn parse_env_value<T: std::str::FromStr>(value: &str, key: &str) -> Result<T, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        message: format!("could not parse '{}'", value),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PipelineConfig::default();
        assert_eq!(config.worker_count, 4);
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.max_job_attempts, 3);
        assert_eq!(config.synthesis_timeout, Duration::from_secs(30));
        assert_eq!(config.cache_ttl, Duration::from_secs(300));
        assert!(config.redis_url.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_builder() {
        let config = PipelineConfig::new()
            .with_workers(8)
            .with_max_retries(5)
            .with_max_job_attempts(2)
            .with_synthesis_timeout(Duration::from_secs(10))
            .with_cache_ttl(Duration::from_secs(600))
            .with_templates_dir("/etc/quizforge/templates")
            .with_redis_url("redis://localhost:6379");

        assert_eq!(config.worker_count, 8);
        assert_eq!(config.max_retries, 5);
        assert_eq!(config.max_job_attempts, 2);
        assert_eq!(config.synthesis_timeout, Duration::from_secs(10));
        assert_eq!(config.cache_ttl, Duration::from_secs(600));
        assert_eq!(
            config.templates_dir,
            PathBuf::from("/etc/quizforge/templates")
        );
        assert_eq!(config.redis_url.as_deref(), Some("redis://localhost:6379"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_zero_workers() {
        let config = PipelineConfig::default().with_workers(0);
        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("worker_count"));
    }

    #[test]
    fn test_validation_zero_job_attempts() {
        let config = PipelineConfig::default().with_max_job_attempts(0);
        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("max_job_attempts"));
    }

    #[test]
    fn test_validation_synthesis_timeout_exceeds_job_timeout() {
        let config = PipelineConfig::default()
            .with_job_timeout(Duration::from_secs(10))
            .with_synthesis_timeout(Duration::from_secs(20));
        let result = config.validate();
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("synthesis_timeout"));
    }

    #[test]
    fn test_validation_zero_cache_ttl() {
        let config = PipelineConfig::default().with_cache_ttl(Duration::ZERO);
        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("cache_ttl"));
    }
}
