//! The validate-or-regenerate generation loop.
//!
//! Each requested question occupies a slot. A slot attempt is: select a
//! template, synthesize content, build the question, validate. Rejected
//! attempts regenerate with a fresh template until the slot's retry
//! budget runs out. The exclusion set grows monotonically across the
//! whole request, so no template is tried twice anywhere in it; synthesis
//! failures consume an attempt and exclude the template exactly like a
//! validation rejection.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, warn};

use crate::curriculum::CurriculumMapping;
use crate::error::GenerationError;
use crate::intake::GenerationRequest;
use crate::metrics::MetricsCollector;
use crate::question::{GenerationMetadata, Question, QuestionContent, QuestionType};
use crate::synthesis::{SynthesizedContent, Synthesizer};
use crate::template::{QuestionTemplate, TemplateSelector};
use crate::validation::{accepts, QuestionValidator};

/// Result of a completed generation loop.
#[derive(Debug)]
pub struct GenerationOutput {
    /// One accepted question per requested slot, in slot order.
    pub questions: Vec<Question>,
    /// Total regeneration attempts across all slots.
    pub total_retries: u32,
}

/// Drives one request through selection, synthesis and validation.
pub struct GenerationLoop {
    selector: Arc<TemplateSelector>,
    synthesizer: Arc<dyn Synthesizer>,
    validator: Arc<dyn QuestionValidator>,
    metrics: MetricsCollector,
    /// Regeneration attempts permitted per slot beyond the first.
    max_retries: u32,
}

impl GenerationLoop {
    pub fn new(
        selector: Arc<TemplateSelector>,
        synthesizer: Arc<dyn Synthesizer>,
        validator: Arc<dyn QuestionValidator>,
        max_retries: u32,
    ) -> Self {
        Self {
            selector,
            synthesizer,
            validator,
            metrics: MetricsCollector::new(),
            max_retries,
        }
    }

    /// Generates all requested questions.
    ///
    /// `on_progress` is invoked with the whole-request completion
    /// percentage after each slot is filled.
    ///
    /// # Errors
    ///
    /// Fails with `Selector` when no template candidates remain for a
    /// slot, or `ValidationExhausted` when a slot's attempt budget runs
    /// out. Both are terminal for the job.
    pub async fn run(
        &self,
        request: &GenerationRequest,
        mut on_progress: impl FnMut(u8),
    ) -> Result<GenerationOutput, GenerationError> {
        let total = request.count as usize;
        let mut questions = Vec::with_capacity(total);
        let mut excluded: HashSet<String> = HashSet::new();
        let mut total_retries = 0u32;

        for slot in 0..total {
            let question = self
                .fill_slot(slot, request, &mut excluded, &mut total_retries)
                .await?;
            questions.push(question);

            let progress = (((slot + 1) as f64 / total as f64) * 100.0).round() as u8;
            on_progress(progress);
        }

        Ok(GenerationOutput {
            questions,
            total_retries,
        })
    }

    /// Fills one slot, regenerating on rejection until the budget runs
    /// out.
    async fn fill_slot(
        &self,
        slot: usize,
        request: &GenerationRequest,
        excluded: &mut HashSet<String>,
        total_retries: &mut u32,
    ) -> Result<Question, GenerationError> {
        let mut attempts = 0u32;

        loop {
            let template =
                self.selector
                    .select(&request.curriculum, request.difficulty, excluded)?;
            // Excluded up front: a template that fails synthesis is just
            // as spent as one that fails validation.
            excluded.insert(template.id.clone());
            attempts += 1;

            match self
                .attempt(&template, &request.curriculum, attempts)
                .await
            {
                Ok(question) => {
                    debug!(
                        slot = slot,
                        attempt = attempts,
                        template_id = %template.id,
                        question_id = %question.id,
                        "Slot accepted"
                    );
                    return Ok(question);
                }
                Err(last_issue) => {
                    warn!(
                        slot = slot,
                        attempt = attempts,
                        template_id = %template.id,
                        issue = %last_issue,
                        "Slot attempt rejected"
                    );

                    if attempts > self.max_retries {
                        return Err(GenerationError::ValidationExhausted {
                            slot,
                            attempts,
                            last_issue,
                        });
                    }
                    *total_retries += 1;
                    self.metrics.record_slot_retries(1);
                }
            }
        }
    }

    /// Runs one slot attempt. Returns the accepted question, or a
    /// description of why the attempt was rejected.
    async fn attempt(
        &self,
        template: &QuestionTemplate,
        curriculum: &CurriculumMapping,
        attempt: u32,
    ) -> Result<Question, String> {
        let content = self
            .synthesizer
            .synthesize(template, curriculum)
            .await
            .map_err(|e| format!("synthesis failed: {}", e))?;

        let metadata = GenerationMetadata {
            template_id: template.id.clone(),
            curriculum: curriculum.clone(),
            difficulty: template.difficulty,
            generated_at: Utc::now(),
            attempt,
        };
        let question = build_question(template, content, metadata);

        let issues = self.validator.validate(&question, curriculum);
        let accepted = accepts(&issues);
        self.metrics.record_validation(accepted);

        if accepted {
            Ok(question.with_validation(true, issues))
        } else {
            // Report the worst issue; ties broken by discovery order.
            let worst = issues
                .iter()
                .max_by_key(|i| i.severity)
                .map(|i| i.message.clone())
                .unwrap_or_else(|| "rejected".to_string());
            Err(worst)
        }
    }
}

/// Assembles a typed question from synthesized content, shaped by the
/// template's declared question type.
fn build_question(
    template: &QuestionTemplate,
    content: SynthesizedContent,
    metadata: GenerationMetadata,
) -> Question {
    let question_content = match template.question_type {
        QuestionType::MultipleChoice => QuestionContent::MultipleChoice {
            prompt: content.text,
            correct_answer: content.answer,
            distractors: content.distractors,
        },
        QuestionType::FillBlank => QuestionContent::FillBlank {
            prompt: content.text,
            correct_answer: content.answer,
        },
        QuestionType::OpenEnded => QuestionContent::OpenEnded {
            prompt: content.text,
            model_answer: content.answer,
        },
        QuestionType::Mathematical => QuestionContent::Mathematical {
            prompt: content.text,
            correct_answer: content.answer,
            working: None,
        },
    };

    Question::new(question_content, content.explanation, content.hints, metadata)
}
