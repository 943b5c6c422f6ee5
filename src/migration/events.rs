//! Step-level migration events and the sinks that receive them.
//!
//! The orchestrator never prints; it reports every state transition to an
//! injected [`EventSink`]. [`TracingSink`] forwards to `tracing`,
//! [`RecordingSink`] keeps events in memory for assertions.

use crate::error::ErrorKind;
use crate::registry::Capability;
use std::sync::{Arc, Mutex};

/// Observable orchestrator transitions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MigrationEvent {
    PlanValidated {
        steps: usize,
        fingerprint: String,
    },
    PlanRejected {
        index: usize,
        kind: ErrorKind,
        reason: String,
    },
    StepStarted {
        index: usize,
        description: String,
    },
    StepSucceeded {
        index: usize,
    },
    StepFailed {
        index: usize,
        kind: ErrorKind,
        reason: String,
    },
    Completed {
        applied: usize,
    },
    Aborted {
        index: usize,
        applied: usize,
    },
    TeardownRevoked {
        capability: Capability,
    },
    TeardownFailed {
        capability: Capability,
        kind: ErrorKind,
        reason: String,
    },
}

/// Receiver of migration events.
pub trait EventSink: Send + Sync {
    fn record(&self, event: &MigrationEvent);
}

/// Forwards events to `tracing` with structured fields.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn record(&self, event: &MigrationEvent) {
        match event {
            MigrationEvent::PlanValidated { steps, fingerprint } => {
                tracing::info!(steps, %fingerprint, "migration plan validated")
            }
            MigrationEvent::PlanRejected {
                index,
                kind,
                reason,
            } => tracing::error!(step = index, %kind, %reason, "migration plan rejected"),
            MigrationEvent::StepStarted { index, description } => {
                tracing::info!(step = index, %description, "step started")
            }
            MigrationEvent::StepSucceeded { index } => {
                tracing::info!(step = index, "step succeeded")
            }
            MigrationEvent::StepFailed {
                index,
                kind,
                reason,
            } => tracing::error!(step = index, %kind, %reason, "step failed"),
            MigrationEvent::Completed { applied } => {
                tracing::info!(applied, "migration completed")
            }
            MigrationEvent::Aborted { index, applied } => {
                tracing::warn!(step = index, applied, "migration aborted, manual remediation required")
            }
            MigrationEvent::TeardownRevoked { capability } => {
                tracing::info!(%capability, "teardown revoked capability")
            }
            MigrationEvent::TeardownFailed {
                capability,
                kind,
                reason,
            } => tracing::warn!(%capability, %kind, %reason, "teardown step failed"),
        }
    }
}

/// Keeps every event in memory.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    events: Arc<Mutex<Vec<MigrationEvent>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<MigrationEvent> {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Indices of steps that were started, in order.
    pub fn started_steps(&self) -> Vec<usize> {
        self.events()
            .iter()
            .filter_map(|event| match event {
                MigrationEvent::StepStarted { index, .. } => Some(*index),
                _ => None,
            })
            .collect()
    }
}

impl EventSink for RecordingSink {
    fn record(&self, event: &MigrationEvent) {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(event.clone());
    }
}
