//! Question validation: rule checks, severities, and the accept decision.

pub mod issue;
pub mod rules;
pub mod validator;

pub use issue::{IssueCategory, Severity, ValidationIssue};
pub use validator::{accepts, QuestionValidator, RuleValidator, MAX_MEDIUM_ISSUES};
