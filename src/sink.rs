//! Persistence sinks for accepted questions.
//!
//! A sink write failure does not fail the request: the result stays
//! available from the cache and the job completes degraded. Writes are
//! idempotent under the question id, so a job-level retry that re-stores
//! the same questions is harmless.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::SinkError;
use crate::question::Question;

/// Destination for accepted questions.
#[async_trait]
pub trait QuestionSink: Send + Sync {
    /// Stores all questions for a completed request.
    async fn store(&self, request_id: Uuid, questions: &[Question]) -> Result<(), SinkError>;
}

/// SQLite-backed sink.
///
/// One row per question, keyed by question id; content and metadata are
/// stored as JSON documents.
pub struct SqliteSink {
    pool: SqlitePool,
}

impl SqliteSink {
    /// Connects to the database and ensures the schema exists.
    pub async fn connect(database_url: &str) -> Result<Self, SinkError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS questions (
                id TEXT PRIMARY KEY,
                request_id TEXT NOT NULL,
                question_type TEXT NOT NULL,
                content TEXT NOT NULL,
                explanation TEXT NOT NULL,
                hints TEXT NOT NULL,
                metadata TEXT NOT NULL,
                validation TEXT,
                created_at TEXT NOT NULL DEFAULT (datetime('now'))
            )
            "#,
        )
        .execute(&pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_questions_request_id ON questions (request_id)",
        )
        .execute(&pool)
        .await?;

        info!(database_url = database_url, "Question sink connected");
        Ok(Self { pool })
    }

    /// Number of stored questions for a request.
    pub async fn count_for_request(&self, request_id: Uuid) -> Result<u64, SinkError> {
        let row: (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM questions WHERE request_id = ?")
                .bind(request_id.to_string())
                .fetch_one(&self.pool)
                .await?;
        Ok(row.0 as u64)
    }
}

#[async_trait]
impl QuestionSink for SqliteSink {
    async fn store(&self, request_id: Uuid, questions: &[Question]) -> Result<(), SinkError> {
        let mut tx = self.pool.begin().await?;

        for question in questions {
            let content = serde_json::to_string(&question.content)?;
            let hints = serde_json::to_string(&question.hints)?;
            let metadata = serde_json::to_string(&question.metadata)?;
            let validation = question
                .validation
                .as_ref()
                .map(serde_json::to_string)
                .transpose()?;

            sqlx::query(
                r#"
                INSERT OR REPLACE INTO questions
                    (id, request_id, question_type, content, explanation,
                     hints, metadata, validation)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(question.id.to_string())
            .bind(request_id.to_string())
            .bind(question.content.question_type().to_string())
            .bind(content)
            .bind(&question.explanation)
            .bind(hints)
            .bind(metadata)
            .bind(validation)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        debug!(
            request_id = %request_id,
            count = questions.len(),
            "Stored questions"
        );
        Ok(())
    }
}

/// In-memory sink for tests and cache-only deployments.
#[derive(Default)]
pub struct MemorySink {
    stored: RwLock<HashMap<Uuid, Vec<Question>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Questions stored for a request, if any.
    pub fn stored_for(&self, request_id: Uuid) -> Option<Vec<Question>> {
        self.stored
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&request_id)
            .cloned()
    }

    /// Number of requests with stored questions.
    pub fn len(&self) -> usize {
        self.stored.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl QuestionSink for MemorySink {
    async fn store(&self, request_id: Uuid, questions: &[Question]) -> Result<(), SinkError> {
        self.stored
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(request_id, questions.to_vec());
        Ok(())
    }
}
