//! Ordered migration plans.

use super::step::MigrationStep;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Ordered sequence of steps. Order is part of the contract.
///
/// `base_index` is the absolute index of the first step, so a plan resumed
/// after a partial run reports the same step numbers as the original.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationPlan {
    #[serde(default)]
    base_index: usize,
    steps: Vec<MigrationStep>,
}

impl MigrationPlan {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_steps(steps: Vec<MigrationStep>) -> Self {
        Self {
            base_index: 0,
            steps,
        }
    }

    /// Append a step (builder style).
    pub fn then(mut self, step: MigrationStep) -> Self {
        self.steps.push(step);
        self
    }

    pub fn push(&mut self, step: MigrationStep) {
        self.steps.push(step);
    }

    pub fn steps(&self) -> &[MigrationStep] {
        &self.steps
    }

    pub fn base_index(&self) -> usize {
        self.base_index
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Steps paired with their absolute indices.
    pub fn indexed(&self) -> impl Iterator<Item = (usize, &MigrationStep)> {
        self.steps
            .iter()
            .enumerate()
            .map(move |(offset, step)| (self.base_index + offset, step))
    }

    /// Remaining suffix starting at absolute index `index`.
    ///
    /// An index past the end yields an empty plan.
    pub fn resume_from(&self, index: usize) -> MigrationPlan {
        let start = index.saturating_sub(self.base_index).min(self.steps.len());
        MigrationPlan {
            base_index: self.base_index + start,
            steps: self.steps[start..].to_vec(),
        }
    }

    /// Hex SHA-256 over the canonical encoding of every step.
    ///
    /// Lets an operator confirm that the executed plan is the one that was
    /// reviewed.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        for (index, step) in self.indexed() {
            hasher.update(format!("{}:{}\n", index, step.canonical()).as_bytes());
        }
        hex::encode(hasher.finalize())
    }
}
