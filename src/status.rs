//! Per-request status tracking.
//!
//! Status transitions are monotonic: `queued → in_progress → {completed,
//! failed}`, and progress never decreases for a given request id. The
//! store enforces this rather than trusting caller discipline alone;
//! regressive writes are dropped with a warning.

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

/// Lifecycle state of a generation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationState {
    Queued,
    InProgress,
    Completed,
    Failed,
}

impl GenerationState {
    /// Ordering rank: `queued < in_progress < {completed, failed}`.
    pub fn rank(&self) -> u8 {
        match self {
            GenerationState::Queued => 0,
            GenerationState::InProgress => 1,
            GenerationState::Completed | GenerationState::Failed => 2,
        }
    }

    /// Whether this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        self.rank() == 2
    }
}

impl std::fmt::Display for GenerationState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GenerationState::Queued => write!(f, "queued"),
            GenerationState::InProgress => write!(f, "in_progress"),
            GenerationState::Completed => write!(f, "completed"),
            GenerationState::Failed => write!(f, "failed"),
        }
    }
}

/// Pollable status of one generation request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationStatus {
    pub request_id: Uuid,
    pub state: GenerationState,
    /// Completion percentage, 0-100, non-decreasing.
    pub progress: u8,
    /// Cache key of the result set once available.
    #[serde(default)]
    pub result: Option<String>,
    /// Error message for failed requests.
    #[serde(default)]
    pub error: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl GenerationStatus {
    /// A freshly queued status.
    pub fn queued(request_id: Uuid) -> Self {
        Self {
            request_id,
            state: GenerationState::Queued,
            progress: 0,
            result: None,
            error: None,
            updated_at: Utc::now(),
        }
    }

    /// A completed status referencing a result already in the cache.
    /// Used when intake short-circuits on a cache hit.
    pub fn completed(request_id: Uuid, result_key: impl Into<String>) -> Self {
        Self {
            request_id,
            state: GenerationState::Completed,
            progress: 100,
            result: Some(result_key.into()),
            error: None,
            updated_at: Utc::now(),
        }
    }
}

/// In-memory status store with atomic per-key get/set.
///
/// One worker owns a job for its lifetime, so each request id has a single
/// writer; the store still drops regressive writes defensively.
#[derive(Debug, Default)]
pub struct StatusStore {
    statuses: RwLock<HashMap<Uuid, GenerationStatus>>,
}

impl StatusStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current status for a request, if known.
    pub fn get(&self, request_id: Uuid) -> Option<GenerationStatus> {
        self.statuses
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&request_id)
            .cloned()
    }

    /// Writes a status, enforcing monotonicity.
    ///
    /// Returns whether the write was applied.
    pub fn set(&self, status: GenerationStatus) -> bool {
        let mut statuses = self.statuses.write().unwrap_or_else(|e| e.into_inner());

        if let Some(existing) = statuses.get(&status.request_id) {
            let regresses_state = status.state.rank() < existing.state.rank()
                || (existing.state.is_terminal() && status.state != existing.state);
            let regresses_progress =
                status.state.rank() == existing.state.rank() && status.progress < existing.progress;

            if regresses_state || regresses_progress {
                warn!(
                    request_id = %status.request_id,
                    from = %existing.state,
                    to = %status.state,
                    "Dropping regressive status write"
                );
                return false;
            }
        }

        statuses.insert(status.request_id, status);
        true
    }

    /// Transitions a request to `in_progress`, keeping its progress.
    pub fn mark_in_progress(&self, request_id: Uuid) {
        if let Some(mut status) = self.get(request_id) {
            status.state = GenerationState::InProgress;
            status.updated_at = Utc::now();
            self.set(status);
        }
    }

    /// Updates the progress percentage of an in-flight request.
    pub fn update_progress(&self, request_id: Uuid, progress: u8) {
        if let Some(mut status) = self.get(request_id) {
            status.progress = progress.min(100);
            status.updated_at = Utc::now();
            self.set(status);
        }
    }

    /// Finalizes a request as completed with a result reference.
    pub fn mark_completed(&self, request_id: Uuid, result_key: &str) {
        if let Some(mut status) = self.get(request_id) {
            status.state = GenerationState::Completed;
            status.progress = 100;
            status.result = Some(result_key.to_string());
            status.updated_at = Utc::now();
            self.set(status);
        }
    }

    /// Finalizes a request as failed.
    pub fn mark_failed(&self, request_id: Uuid, error: &str) {
        if let Some(mut status) = self.get(request_id) {
            status.state = GenerationState::Failed;
            status.error = Some(error.to_string());
            status.updated_at = Utc::now();
            self.set(status);
        }
    }

    /// Number of tracked requests.
    pub fn len(&self) -> usize {
        self.statuses
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
