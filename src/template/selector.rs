//! Template selection with exclusion tracking.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

use rand::seq::IndexedRandom;

use crate::curriculum::{CurriculumMapping, Difficulty};
use crate::error::SelectorError;

use super::registry::TemplateRegistry;
use super::schema::QuestionTemplate;

/// How to pick among matching candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SelectionStrategy {
    /// Uniform random among matches. Varies questions across repeated
    /// requests for the same curriculum slot.
    #[default]
    Uniform,
    /// Prefer the least-recently-used candidates to dampen repetition
    /// across separate requests. Usage counts are process-local.
    LeastUsed,
}

/// Selects templates matching a curriculum slot and difficulty, never
/// returning an ID in the caller's exclusion set.
pub struct TemplateSelector {
    registry: Arc<TemplateRegistry>,
    strategy: SelectionStrategy,
    usage: RwLock<HashMap<String, u64>>,
}

impl TemplateSelector {
    /// Creates a selector with the default uniform strategy.
    pub fn new(registry: Arc<TemplateRegistry>) -> Self {
        Self {
            registry,
            strategy: SelectionStrategy::default(),
            usage: RwLock::new(HashMap::new()),
        }
    }

    /// Sets the selection strategy.
    pub fn with_strategy(mut self, strategy: SelectionStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Picks a template for the given slot.
    ///
    /// Candidates must match the curriculum mapping (key stage, year,
    /// topic) and difficulty exactly, and must not appear in
    /// `excluded`. Fails with `NoSuitableTemplate` when the filtered
    /// candidate set is empty.
    pub fn select(
        &self,
        curriculum: &CurriculumMapping,
        difficulty: Difficulty,
        excluded: &HashSet<String>,
    ) -> Result<QuestionTemplate, SelectorError> {
        let candidates: Vec<&QuestionTemplate> = self
            .registry
            .iter()
            .filter(|t| {
                t.difficulty == difficulty
                    && t.curriculum.matches_slot(curriculum)
                    && !excluded.contains(&t.id)
            })
            .collect();

        if candidates.is_empty() {
            return Err(SelectorError::NoSuitableTemplate {
                subject: curriculum.subject.clone(),
                year: curriculum.year,
                topic: curriculum.topic.clone(),
                difficulty: difficulty.to_string(),
                excluded: excluded.len(),
            });
        }

        let chosen: &QuestionTemplate = match self.strategy {
            SelectionStrategy::Uniform => *candidates
                .choose(&mut rand::rng())
                .expect("candidates is non-empty"),
            SelectionStrategy::LeastUsed => {
                let usage = self.usage.read().unwrap_or_else(|e| e.into_inner());
                let min_usage = candidates
                    .iter()
                    .map(|t| usage.get(&t.id).copied().unwrap_or(0))
                    .min()
                    .expect("candidates is non-empty");
                let least_used: Vec<&QuestionTemplate> = candidates
                    .iter()
                    .filter(|t| usage.get(&t.id).copied().unwrap_or(0) == min_usage)
                    .copied()
                    .collect();
                drop(usage);
                *least_used
                    .choose(&mut rand::rng())
                    .expect("least_used is non-empty")
            }
        };

        let mut usage = self.usage.write().unwrap_or_else(|e| e.into_inner());
        *usage.entry(chosen.id.clone()).or_insert(0) += 1;

        Ok(chosen.clone())
    }
}
