//! Curriculum value types shared across the pipeline.
//!
//! A curriculum mapping is the (subject, key stage, year, term, topic,
//! objectives) tuple identifying what a question must teach or assess.
//! These are immutable value types; many jobs read the same mapping
//! concurrently.

use serde::{Deserialize, Serialize};

use crate::error::TemplateError;

/// UK key stages, used for age-banded language checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyStage {
    Ks1,
    Ks2,
    Ks3,
    Ks4,
    Ks5,
}

impl KeyStage {
    /// Derives the key stage from a school year (1-13).
    pub fn from_year(year: u8) -> Self {
        match year {
            0..=2 => KeyStage::Ks1,
            3..=6 => KeyStage::Ks2,
            7..=9 => KeyStage::Ks3,
            10..=11 => KeyStage::Ks4,
            _ => KeyStage::Ks5,
        }
    }

    /// Maximum sentence length (in words) considered age-appropriate.
    pub fn max_sentence_words(&self) -> usize {
        match self {
            KeyStage::Ks1 => 12,
            KeyStage::Ks2 => 18,
            KeyStage::Ks3 => 25,
            KeyStage::Ks4 => 32,
            KeyStage::Ks5 => 40,
        }
    }

    /// Maximum word length (in characters) before a word counts as
    /// complex vocabulary for this age band.
    pub fn max_word_length(&self) -> usize {
        match self {
            KeyStage::Ks1 => 8,
            KeyStage::Ks2 => 11,
            KeyStage::Ks3 => 14,
            KeyStage::Ks4 | KeyStage::Ks5 => 18,
        }
    }
}

impl std::fmt::Display for KeyStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            KeyStage::Ks1 => write!(f, "ks1"),
            KeyStage::Ks2 => write!(f, "ks2"),
            KeyStage::Ks3 => write!(f, "ks3"),
            KeyStage::Ks4 => write!(f, "ks4"),
            KeyStage::Ks5 => write!(f, "ks5"),
        }
    }
}

/// Difficulty level of a question or template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }
}

impl std::fmt::Display for Difficulty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Difficulty {
    type Err = TemplateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "easy" => Ok(Difficulty::Easy),
            "medium" => Ok(Difficulty::Medium),
            "hard" => Ok(Difficulty::Hard),
            other => Err(TemplateError::InvalidDifficultyLevel(other.to_string())),
        }
    }
}

/// The curriculum slot a question must address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurriculumMapping {
    /// Subject name (e.g. "mathematics").
    pub subject: String,
    /// Key stage the content is pitched at.
    pub key_stage: KeyStage,
    /// School year (1-13).
    pub year: u8,
    /// Optional term within the year (e.g. "autumn").
    #[serde(default)]
    pub term: Option<String>,
    /// Topic within the subject (e.g. "fractions").
    pub topic: String,
    /// Learning objectives the question should exercise.
    #[serde(default)]
    pub objectives: Vec<String>,
}

impl CurriculumMapping {
    /// Creates a mapping with the key stage derived from the year.
    pub fn new(subject: impl Into<String>, year: u8, topic: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            key_stage: KeyStage::from_year(year),
            year,
            term: None,
            topic: topic.into(),
            objectives: Vec::new(),
        }
    }

    /// Sets the term.
    pub fn with_term(mut self, term: impl Into<String>) -> Self {
        self.term = Some(term.into());
        self
    }

    /// Sets the learning objectives.
    pub fn with_objectives(mut self, objectives: Vec<String>) -> Self {
        self.objectives = objectives;
        self
    }

    /// Whether two mappings target the same curriculum slot.
    ///
    /// This is the template selection predicate: key stage, year and topic
    /// must match. Term and objectives are advisory and do not constrain
    /// selection.
    pub fn matches_slot(&self, other: &CurriculumMapping) -> bool {
        self.key_stage == other.key_stage
            && self.year == other.year
            && self.topic.eq_ignore_ascii_case(&other.topic)
    }
}
