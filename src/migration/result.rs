//! Execution outcomes for `run` and `teardown`.

use super::step::MigrationStep;
use crate::error::MigrationError;
use crate::registry::Capability;
use std::fmt;

/// Per-plan execution state.
///
/// `Validated → Executing(i) → {Executing(i+1) | Aborted(i) | Completed}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionState {
    Validated,
    Executing(usize),
    Aborted(usize),
    Completed,
}

impl ExecutionState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Aborted(_) | Self::Completed)
    }
}

/// A step whose effect was applied to the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedStep {
    pub index: usize,
    pub step: MigrationStep,
}

/// The step that stopped a plan, and why.
///
/// `step` is `None` when the whole run was refused before any step was
/// reached, e.g. a re-entrant call on an empty plan.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error(
    "step {index}{} failed: {error}",
    .step.as_ref().map(|step| format!(" ({})", step)).unwrap_or_default()
)]
pub struct StepFailure {
    pub index: usize,
    pub step: Option<MigrationStep>,
    pub error: MigrationError,
}

/// Outcome of `Orchestrator::run`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationResult {
    base_index: usize,
    applied: Vec<AppliedStep>,
    failure: Option<StepFailure>,
}

impl MigrationResult {
    pub(crate) fn new(
        base_index: usize,
        applied: Vec<AppliedStep>,
        failure: Option<StepFailure>,
    ) -> Self {
        Self {
            base_index,
            applied,
            failure,
        }
    }

    /// Steps applied, in execution order.
    pub fn applied(&self) -> &[AppliedStep] {
        &self.applied
    }

    pub fn failure(&self) -> Option<&StepFailure> {
        self.failure.as_ref()
    }

    pub fn is_completed(&self) -> bool {
        self.failure.is_none()
    }

    pub fn state(&self) -> ExecutionState {
        match &self.failure {
            Some(failure) => ExecutionState::Aborted(failure.index),
            None => ExecutionState::Completed,
        }
    }

    /// Absolute index of the last applied step.
    pub fn last_applied_index(&self) -> Option<usize> {
        self.applied.last().map(|applied| applied.index)
    }

    /// Absolute index an operator should resume from.
    pub fn resume_index(&self) -> usize {
        self.last_applied_index()
            .map(|index| index + 1)
            .unwrap_or(self.base_index)
    }

    pub fn into_result(self) -> Result<Vec<AppliedStep>, StepFailure> {
        match self.failure {
            Some(failure) => Err(failure),
            None => Ok(self.applied),
        }
    }
}

impl fmt::Display for MigrationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.failure {
            None => write!(f, "completed: {} step(s) applied", self.applied.len()),
            Some(failure) => write!(
                f,
                "aborted at step {} after {} applied step(s): {}",
                failure.index,
                self.applied.len(),
                failure.error
            ),
        }
    }
}

/// Outcome of one teardown revoke.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeardownEntry {
    pub capability: Capability,
    pub outcome: Result<(), MigrationError>,
}

/// Best-effort teardown report; every capability is attempted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TeardownReport {
    pub entries: Vec<TeardownEntry>,
}

impl TeardownReport {
    pub fn revoked(&self) -> impl Iterator<Item = &Capability> {
        self.entries
            .iter()
            .filter(|entry| entry.outcome.is_ok())
            .map(|entry| &entry.capability)
    }

    pub fn failures(&self) -> impl Iterator<Item = (&Capability, &MigrationError)> {
        self.entries.iter().filter_map(|entry| match &entry.outcome {
            Err(err) => Some((&entry.capability, err)),
            Ok(()) => None,
        })
    }

    pub fn is_clean(&self) -> bool {
        self.failures().next().is_none()
    }
}
