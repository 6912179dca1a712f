//! The validator trait and the default rule-based implementation.

use crate::curriculum::CurriculumMapping;
use crate::question::Question;

use super::issue::{Severity, ValidationIssue};
use super::rules;

/// Maximum number of medium-severity issues an accepted question may carry.
pub const MAX_MEDIUM_ISSUES: usize = 2;

/// Validates a generated question against the requested curriculum slot.
///
/// Implementations must be pure with respect to pipeline state: the issue
/// list alone drives the accept / regenerate decision.
pub trait QuestionValidator: Send + Sync {
    /// Runs all checks and returns the union of issues found.
    /// An empty list is a clean pass.
    fn validate(&self, question: &Question, curriculum: &CurriculumMapping)
        -> Vec<ValidationIssue>;
}

/// Accept decision: no high-severity issues and at most
/// [`MAX_MEDIUM_ISSUES`] medium ones.
pub fn accepts(issues: &[ValidationIssue]) -> bool {
    let highs = issues.iter().filter(|i| i.severity == Severity::High).count();
    let mediums = issues
        .iter()
        .filter(|i| i.severity == Severity::Medium)
        .count();
    highs == 0 && mediums <= MAX_MEDIUM_ISSUES
}

/// Default validator running the curriculum-alignment, language and
/// technical-accuracy rule checks.
#[derive(Debug, Clone)]
pub struct RuleValidator {
    /// Expected distractor count for multiple-choice questions.
    expected_distractors: usize,
}

impl Default for RuleValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl RuleValidator {
    /// Creates a validator with the standard 4-option multiple-choice
    /// shape (three distractors).
    pub fn new() -> Self {
        Self {
            expected_distractors: 3,
        }
    }

    /// Sets the expected distractor count.
    pub fn with_expected_distractors(mut self, count: usize) -> Self {
        self.expected_distractors = count;
        self
    }
}

impl QuestionValidator for RuleValidator {
    fn validate(
        &self,
        question: &Question,
        curriculum: &CurriculumMapping,
    ) -> Vec<ValidationIssue> {
        let mut issues = rules::check_curriculum_alignment(question, curriculum);
        issues.extend(rules::check_language(question, curriculum));
        issues.extend(rules::check_technical_accuracy(
            question,
            self.expected_distractors,
        ));
        issues
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::curriculum::Difficulty;
    use crate::question::{GenerationMetadata, QuestionContent};
    use crate::validation::IssueCategory;
    use chrono::Utc;

    fn curriculum() -> CurriculumMapping {
        CurriculumMapping::new("mathematics", 3, "fractions")
    }

    fn good_question() -> Question {
        Question::new(
            QuestionContent::MultipleChoice {
                prompt: "Which of these fractions equals one half?".to_string(),
                correct_answer: "2/4".to_string(),
                distractors: vec!["1/3".to_string(), "2/3".to_string(), "3/4".to_string()],
            },
            "Two quarters simplify to one half, so the fractions are equal.",
            vec!["Try simplifying each option.".to_string()],
            GenerationMetadata {
                template_id: "mc-fractions-001".to_string(),
                curriculum: curriculum(),
                difficulty: Difficulty::Medium,
                generated_at: Utc::now(),
                attempt: 1,
            },
        )
    }

    #[test]
    fn test_clean_question_accepted() {
        let validator = RuleValidator::new();
        let issues = validator.validate(&good_question(), &curriculum());
        assert!(accepts(&issues), "unexpected issues: {:?}", issues);
    }

    #[test]
    fn test_high_severity_rejects() {
        let issues = vec![ValidationIssue::high(
            IssueCategory::TechnicalAccuracy,
            "missing correct answer",
        )];
        assert!(!accepts(&issues));
    }

    #[test]
    fn test_medium_budget() {
        let medium =
            |msg: &str| ValidationIssue::medium(IssueCategory::Language, msg.to_string());
        assert!(accepts(&[medium("a"), medium("b")]));
        assert!(!accepts(&[medium("a"), medium("b"), medium("c")]));
    }

    #[test]
    fn test_low_issues_never_reject() {
        let lows: Vec<_> = (0..10)
            .map(|i| ValidationIssue::low(IssueCategory::Language, format!("issue {}", i)))
            .collect();
        assert!(accepts(&lows));
    }

    #[test]
    fn test_validator_merges_all_checks() {
        let validator = RuleValidator::new();
        let mut question = good_question();
        question.content = QuestionContent::MultipleChoice {
            prompt: "Unrelated prompt about nothing in particular?".to_string(),
            correct_answer: String::new(),
            distractors: vec!["a".to_string()],
        };
        question.explanation = String::new();

        let issues = validator.validate(&question, &curriculum());
        assert!(issues
            .iter()
            .any(|i| i.category == IssueCategory::CurriculumAlignment));
        assert!(issues
            .iter()
            .any(|i| i.category == IssueCategory::TechnicalAccuracy));
        assert!(!accepts(&issues));
    }
}
