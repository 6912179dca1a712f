//! Request intake: validation and deterministic cache keys.
//!
//! A generation request is immutable once accepted and hashes
//! deterministically to its cache key, so identical requests always map to
//! the same cache entry. Malformed requests are rejected synchronously and
//! never enter the queue.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::curriculum::{CurriculumMapping, Difficulty};
use crate::error::IntakeError;

/// A request for `count` questions in one curriculum slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// What the questions must teach/assess.
    pub curriculum: CurriculumMapping,
    /// Requested difficulty.
    pub difficulty: Difficulty,
    /// Number of questions to generate (slots).
    pub count: u32,
}

impl GenerationRequest {
    pub fn new(curriculum: CurriculumMapping, difficulty: Difficulty, count: u32) -> Self {
        Self {
            curriculum,
            difficulty,
            count,
        }
    }

    /// Validates the request at the intake boundary.
    pub fn validate(&self) -> Result<(), IntakeError> {
        if self.count < 1 {
            return Err(IntakeError::InvalidCount(self.count));
        }
        if self.curriculum.subject.trim().is_empty() {
            return Err(IntakeError::EmptyField("subject"));
        }
        if self.curriculum.topic.trim().is_empty() {
            return Err(IntakeError::EmptyField("topic"));
        }
        if self.curriculum.year < 1 || self.curriculum.year > 13 {
            return Err(IntakeError::InvalidYear(self.curriculum.year));
        }
        Ok(())
    }

    /// Deterministic cache key: a pure function of the request fields
    /// that identify the result (subject, key stage, year, topic,
    /// difficulty, count).
    pub fn cache_key(&self) -> CacheKey {
        let mut hasher = Sha256::new();
        hasher.update(self.curriculum.subject.to_lowercase().as_bytes());
        hasher.update([0]);
        hasher.update(self.curriculum.key_stage.to_string().as_bytes());
        hasher.update([0]);
        hasher.update([self.curriculum.year]);
        hasher.update(self.curriculum.topic.to_lowercase().as_bytes());
        hasher.update([0]);
        hasher.update(self.difficulty.as_str().as_bytes());
        hasher.update([0]);
        hasher.update(self.count.to_le_bytes());
        CacheKey(hex::encode(hasher.finalize()))
    }
}

/// Hex-encoded SHA-256 digest identifying a request's result.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
