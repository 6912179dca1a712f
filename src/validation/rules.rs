//! Individual validation checks.
//!
//! Each check is independent and pure: it inspects a question against the
//! requested curriculum mapping and returns the issues it found. Results
//! from different checks are merged without ordering dependency.

use crate::curriculum::CurriculumMapping;
use crate::question::{Question, QuestionContent};

use super::issue::{IssueCategory, ValidationIssue};

/// Marker expected in fill-blank prompts.
pub const BLANK_MARKER: &str = "___";

/// Checks that the content actually references the requested topic and,
/// more loosely, the learning objectives.
pub fn check_curriculum_alignment(
    question: &Question,
    curriculum: &CurriculumMapping,
) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();

    let text = format!(
        "{} {}",
        question.content.prompt(),
        question.explanation
    )
    .to_lowercase();

    if !curriculum.topic.is_empty() && !text.contains(&curriculum.topic.to_lowercase()) {
        issues.push(ValidationIssue::high(
            IssueCategory::CurriculumAlignment,
            format!("content does not reference topic '{}'", curriculum.topic),
        ));
    }

    if !curriculum.objectives.is_empty() {
        let referenced = curriculum.objectives.iter().any(|objective| {
            objective
                .split_whitespace()
                .filter(|w| w.len() > 3)
                .any(|w| text.contains(&w.to_lowercase()))
        });
        if !referenced {
            issues.push(ValidationIssue::low(
                IssueCategory::CurriculumAlignment,
                "content does not touch any stated learning objective",
            ));
        }
    }

    issues
}

/// Age-banded language heuristics: sentence length and vocabulary
/// complexity against the key stage's limits.
pub fn check_language(question: &Question, curriculum: &CurriculumMapping) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();
    let prompt = question.content.prompt();

    let max_words = curriculum.key_stage.max_sentence_words();
    let longest_sentence = prompt
        .split(['.', '?', '!'])
        .map(|s| s.split_whitespace().count())
        .max()
        .unwrap_or(0);

    if longest_sentence > max_words {
        issues.push(ValidationIssue::medium(
            IssueCategory::Language,
            format!(
                "sentence of {} words exceeds the {} limit for {}",
                longest_sentence, max_words, curriculum.key_stage
            ),
        ));
    }

    let max_word_len = curriculum.key_stage.max_word_length();
    let complex_words = prompt
        .split_whitespace()
        .filter(|w| w.trim_matches(|c: char| !c.is_alphanumeric()).len() > max_word_len)
        .count();

    if complex_words > 0 {
        issues.push(ValidationIssue::low(
            IssueCategory::Language,
            format!(
                "{} word(s) longer than {} characters for {}",
                complex_words, max_word_len, curriculum.key_stage
            ),
        ));
    }

    issues
}

/// Structural well-formedness: answer present, distractor set sane,
/// variant-specific markers in place.
pub fn check_technical_accuracy(
    question: &Question,
    expected_distractors: usize,
) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();

    if question.content.prompt().trim().is_empty() {
        issues.push(ValidationIssue::high(
            IssueCategory::TechnicalAccuracy,
            "empty question prompt",
        ));
    }

    if question.content.answer().trim().is_empty() {
        issues.push(ValidationIssue::high(
            IssueCategory::TechnicalAccuracy,
            "missing correct answer",
        ));
    }

    match &question.content {
        QuestionContent::MultipleChoice {
            correct_answer,
            distractors,
            ..
        } => {
            if distractors.len() != expected_distractors {
                issues.push(ValidationIssue::high(
                    IssueCategory::TechnicalAccuracy,
                    format!(
                        "expected {} distractors, got {}",
                        expected_distractors,
                        distractors.len()
                    ),
                ));
            }

            let mut seen = std::collections::HashSet::new();
            if distractors.iter().any(|d| !seen.insert(d.trim().to_lowercase())) {
                issues.push(ValidationIssue::medium(
                    IssueCategory::TechnicalAccuracy,
                    "duplicate distractors",
                ));
            }

            if distractors
                .iter()
                .any(|d| d.trim().eq_ignore_ascii_case(correct_answer.trim()))
            {
                issues.push(ValidationIssue::high(
                    IssueCategory::TechnicalAccuracy,
                    "a distractor duplicates the correct answer",
                ));
            }
        }
        QuestionContent::FillBlank { prompt, .. } => {
            if !prompt.contains(BLANK_MARKER) {
                issues.push(ValidationIssue::high(
                    IssueCategory::TechnicalAccuracy,
                    format!("fill-blank prompt has no '{}' marker", BLANK_MARKER),
                ));
            }
        }
        QuestionContent::Mathematical { correct_answer, .. } => {
            if !is_numeric_answer(correct_answer) {
                issues.push(ValidationIssue::medium(
                    IssueCategory::TechnicalAccuracy,
                    format!("answer '{}' is not numeric", correct_answer),
                ));
            }
        }
        QuestionContent::OpenEnded { .. } => {
            if question.explanation.trim().is_empty() {
                issues.push(ValidationIssue::medium(
                    IssueCategory::TechnicalAccuracy,
                    "open-ended question has no marking explanation",
                ));
            }
        }
    }

    issues
}

/// Accepts plain numbers and simple fractions like "3/4".
fn is_numeric_answer(answer: &str) -> bool {
    let answer = answer.trim();
    if answer.parse::<f64>().is_ok() {
        return true;
    }
    match answer.split_once('/') {
        Some((num, den)) => num.trim().parse::<f64>().is_ok() && den.trim().parse::<f64>().is_ok(),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::curriculum::Difficulty;
    use crate::question::GenerationMetadata;
    use crate::validation::Severity;
    use chrono::Utc;

    fn curriculum() -> CurriculumMapping {
        CurriculumMapping::new("mathematics", 3, "fractions")
    }

    fn question(content: QuestionContent) -> Question {
        Question::new(
            content,
            "Halving shares a quantity into two equal parts of the fractions.",
            Vec::new(),
            GenerationMetadata {
                template_id: "t-1".to_string(),
                curriculum: curriculum(),
                difficulty: Difficulty::Medium,
                generated_at: Utc::now(),
                attempt: 1,
            },
        )
    }

    #[test]
    fn test_alignment_missing_topic_is_high() {
        let q = question(QuestionContent::FillBlank {
            prompt: "What is half of 10? ___".to_string(),
            correct_answer: "5".to_string(),
        });
        let mut q = q;
        q.explanation = "Half of ten is five.".to_string();

        let issues = check_curriculum_alignment(&q, &curriculum());
        assert!(issues
            .iter()
            .any(|i| i.severity == Severity::High
                && i.category == IssueCategory::CurriculumAlignment));
    }

    #[test]
    fn test_alignment_topic_in_explanation_passes() {
        let q = question(QuestionContent::FillBlank {
            prompt: "What is half of 10? ___".to_string(),
            correct_answer: "5".to_string(),
        });
        let issues = check_curriculum_alignment(&q, &curriculum());
        assert!(issues.iter().all(|i| i.severity != Severity::High));
    }

    #[test]
    fn test_missing_answer_is_high() {
        let q = question(QuestionContent::FillBlank {
            prompt: "Fractions: half of 10 is ___".to_string(),
            correct_answer: "  ".to_string(),
        });
        let issues = check_technical_accuracy(&q, 3);
        assert!(issues
            .iter()
            .any(|i| i.severity == Severity::High && i.message.contains("missing correct answer")));
    }

    #[test]
    fn test_distractor_count_mismatch() {
        let q = question(QuestionContent::MultipleChoice {
            prompt: "Which fraction equals one half?".to_string(),
            correct_answer: "2/4".to_string(),
            distractors: vec!["1/3".to_string()],
        });
        let issues = check_technical_accuracy(&q, 3);
        assert!(issues.iter().any(|i| i.message.contains("expected 3 distractors")));
    }

    #[test]
    fn test_fill_blank_needs_marker() {
        let q = question(QuestionContent::FillBlank {
            prompt: "Fractions: what is half of 10?".to_string(),
            correct_answer: "5".to_string(),
        });
        let issues = check_technical_accuracy(&q, 3);
        assert!(issues.iter().any(|i| i.message.contains("marker")));
    }

    #[test]
    fn test_language_sentence_length() {
        let long_prompt = (0..30)
            .map(|i| format!("word{}", i))
            .collect::<Vec<_>>()
            .join(" ");
        let q = question(QuestionContent::OpenEnded {
            prompt: long_prompt,
            model_answer: "answer".to_string(),
        });
        // Year 3 is KS2 with an 18-word limit.
        let issues = check_language(&q, &curriculum());
        assert!(issues.iter().any(|i| i.severity == Severity::Medium));
    }

    #[test]
    fn test_numeric_answers() {
        assert!(is_numeric_answer("42"));
        assert!(is_numeric_answer("3.5"));
        assert!(is_numeric_answer("3/4"));
        assert!(!is_numeric_answer("four"));
    }
}
