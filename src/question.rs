//! Question model: a tagged content union plus generation metadata.
//!
//! Each question type carries only the fields valid for that variant.
//! A question is created by the generation loop, owned by its job until
//! persisted, then handed to the persistence sink.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::curriculum::{CurriculumMapping, Difficulty};
use crate::validation::ValidationIssue;

/// The structural type of a question, as declared by its template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    MultipleChoice,
    FillBlank,
    OpenEnded,
    Mathematical,
}

impl std::fmt::Display for QuestionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QuestionType::MultipleChoice => write!(f, "multiple_choice"),
            QuestionType::FillBlank => write!(f, "fill_blank"),
            QuestionType::OpenEnded => write!(f, "open_ended"),
            QuestionType::Mathematical => write!(f, "mathematical"),
        }
    }
}

/// Content of a question, tagged by question type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum QuestionContent {
    MultipleChoice {
        prompt: String,
        correct_answer: String,
        /// Incorrect-but-plausible options presented alongside the answer.
        distractors: Vec<String>,
    },
    FillBlank {
        /// Prompt text containing the blank marker `___`.
        prompt: String,
        correct_answer: String,
    },
    OpenEnded {
        prompt: String,
        /// A model answer used for marking guidance, not exact matching.
        model_answer: String,
    },
    Mathematical {
        prompt: String,
        correct_answer: String,
        /// Optional worked solution.
        #[serde(default)]
        working: Option<String>,
    },
}

impl QuestionContent {
    /// The question type of this content variant.
    pub fn question_type(&self) -> QuestionType {
        match self {
            QuestionContent::MultipleChoice { .. } => QuestionType::MultipleChoice,
            QuestionContent::FillBlank { .. } => QuestionType::FillBlank,
            QuestionContent::OpenEnded { .. } => QuestionType::OpenEnded,
            QuestionContent::Mathematical { .. } => QuestionType::Mathematical,
        }
    }

    /// The question prompt text.
    pub fn prompt(&self) -> &str {
        match self {
            QuestionContent::MultipleChoice { prompt, .. }
            | QuestionContent::FillBlank { prompt, .. }
            | QuestionContent::OpenEnded { prompt, .. }
            | QuestionContent::Mathematical { prompt, .. } => prompt,
        }
    }

    /// The expected answer text (model answer for open-ended questions).
    pub fn answer(&self) -> &str {
        match self {
            QuestionContent::MultipleChoice { correct_answer, .. }
            | QuestionContent::FillBlank { correct_answer, .. }
            | QuestionContent::Mathematical { correct_answer, .. } => correct_answer,
            QuestionContent::OpenEnded { model_answer, .. } => model_answer,
        }
    }
}

/// Metadata recorded when a question was generated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationMetadata {
    /// ID of the template the question was generated from.
    pub template_id: String,
    /// Curriculum slot the question addresses.
    pub curriculum: CurriculumMapping,
    /// Difficulty the question was generated at.
    pub difficulty: Difficulty,
    /// When the question was generated.
    pub generated_at: DateTime<Utc>,
    /// 1-based synthesis attempt that produced this question.
    pub attempt: u32,
}

/// Validation outcome attached to a question after the validator ran.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationOutcome {
    /// Whether the question was accepted.
    pub passed: bool,
    /// Issues found, empty on a clean pass.
    pub issues: Vec<ValidationIssue>,
}

/// A generated question with metadata and validation outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    /// Unique identifier; persistence is idempotent under this id.
    pub id: Uuid,
    /// The typed content.
    pub content: QuestionContent,
    /// Explanation of the correct answer.
    pub explanation: String,
    /// Progressive hints, easiest first.
    #[serde(default)]
    pub hints: Vec<String>,
    /// Generation provenance.
    pub metadata: GenerationMetadata,
    /// Validation outcome, set once the validator has run.
    #[serde(default)]
    pub validation: Option<ValidationOutcome>,
}

impl Question {
    /// Creates a question with a fresh id and no validation outcome.
    pub fn new(
        content: QuestionContent,
        explanation: impl Into<String>,
        hints: Vec<String>,
        metadata: GenerationMetadata,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            content,
            explanation: explanation.into(),
            hints,
            metadata,
            validation: None,
        }
    }

    /// Attaches a validation outcome.
    pub fn with_validation(mut self, passed: bool, issues: Vec<ValidationIssue>) -> Self {
        self.validation = Some(ValidationOutcome { passed, issues });
        self
    }
}
