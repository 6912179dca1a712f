//! Validation issue model.

use serde::{Deserialize, Serialize};

/// Which rule family raised the issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IssueCategory {
    CurriculumAlignment,
    Language,
    TechnicalAccuracy,
}

impl std::fmt::Display for IssueCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IssueCategory::CurriculumAlignment => write!(f, "curriculum-alignment"),
            IssueCategory::Language => write!(f, "language"),
            IssueCategory::TechnicalAccuracy => write!(f, "technical-accuracy"),
        }
    }
}

/// Importance of an issue: drives the accept / regenerate / fail decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Low => write!(f, "low"),
            Severity::Medium => write!(f, "medium"),
            Severity::High => write!(f, "high"),
        }
    }
}

/// A single problem found by a validation check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub category: IssueCategory,
    pub severity: Severity,
    pub message: String,
}

impl ValidationIssue {
    pub fn low(category: IssueCategory, message: impl Into<String>) -> Self {
        Self {
            category,
            severity: Severity::Low,
            message: message.into(),
        }
    }

    pub fn medium(category: IssueCategory, message: impl Into<String>) -> Self {
        Self {
            category,
            severity: Severity::Medium,
            message: message.into(),
        }
    }

    pub fn high(category: IssueCategory, message: impl Into<String>) -> Self {
        Self {
            category,
            severity: Severity::High,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Low < Severity::Medium);
        assert!(Severity::Medium < Severity::High);
    }

    #[test]
    fn test_issue_serde() {
        let issue = ValidationIssue::high(IssueCategory::TechnicalAccuracy, "missing answer");
        let json = serde_json::to_value(&issue).expect("serialization should work");
        assert_eq!(json["category"], "technical-accuracy");
        assert_eq!(json["severity"], "high");
    }
}
