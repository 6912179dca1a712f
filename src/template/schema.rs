//! Question template schema and validation.

use serde::{Deserialize, Serialize};

use crate::curriculum::{CurriculumMapping, Difficulty};
use crate::error::TemplateError;
use crate::question::QuestionType;

/// A reusable question structure bound to a curriculum slot.
///
/// The `pattern` field is a Tera template rendered with the curriculum
/// context to produce the synthesis prompt; it defines the structural
/// shape the synthesizer must fill ("Which of these {{ topic }} ...").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionTemplate {
    /// Unique identifier (alphanumeric, hyphens, underscores).
    pub id: String,
    /// The structural question type.
    pub question_type: QuestionType,
    /// Structural pattern rendered into the synthesis prompt.
    pub pattern: String,
    /// Curriculum slot this template targets.
    pub curriculum: CurriculumMapping,
    /// Difficulty this template is pitched at.
    pub difficulty: Difficulty,
    /// Distractor count for multiple-choice templates.
    #[serde(default = "default_distractors")]
    pub distractor_count: usize,
}

fn default_distractors() -> usize {
    3
}

impl QuestionTemplate {
    /// Validates structural requirements after deserialization.
    pub fn validate(&self) -> Result<(), TemplateError> {
        if self.id.is_empty()
            || !self
                .id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(TemplateError::InvalidTemplateId(self.id.clone()));
        }

        if self.pattern.trim().is_empty() {
            return Err(TemplateError::MissingRequiredField {
                template: self.id.clone(),
                field: "pattern".to_string(),
            });
        }

        if self.curriculum.subject.trim().is_empty() {
            return Err(TemplateError::MissingRequiredField {
                template: self.id.clone(),
                field: "curriculum.subject".to_string(),
            });
        }

        if self.curriculum.topic.trim().is_empty() {
            return Err(TemplateError::MissingRequiredField {
                template: self.id.clone(),
                field: "curriculum.topic".to_string(),
            });
        }

        Ok(())
    }
}
