//! Migration steps: one atomic intended effect against the registry.

use crate::registry::{ActorContext, Capability, Holder, Role};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Step category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    Grant,
    Revoke,
    TransferSingleton,
    RatioWithdraw,
}

impl fmt::Display for StepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StepKind::Grant => "grant",
            StepKind::Revoke => "revoke",
            StepKind::TransferSingleton => "transfer_singleton",
            StepKind::RatioWithdraw => "ratio_withdraw",
        };
        write!(f, "{}", name)
    }
}

/// The registry mutation a step performs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StepAction {
    Grant {
        role: Role,
        holder: Holder,
    },
    Revoke {
        role: Role,
        holder: Holder,
    },
    TransferSingleton {
        role: Role,
        from: Holder,
        to: Holder,
    },
    /// Move a fraction of `from`'s managed balance to `to` through `controller`.
    RatioWithdraw {
        controller: Holder,
        from: Holder,
        to: Holder,
        basis_points: u16,
    },
}

/// One step of a migration plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationStep {
    pub action: StepAction,

    #[serde(default)]
    pub actor: ActorContext,

    /// Capabilities that must already exist when this step runs.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub requires: Vec<Capability>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl MigrationStep {
    fn from_action(action: StepAction) -> Self {
        Self {
            action,
            actor: ActorContext::Default,
            requires: Vec::new(),
            label: None,
        }
    }

    pub fn grant(role: Role, holder: Holder) -> Self {
        Self::from_action(StepAction::Grant { role, holder })
    }

    pub fn revoke(role: Role, holder: Holder) -> Self {
        Self::from_action(StepAction::Revoke { role, holder })
    }

    /// Singleton transfer issued under the given timelock.
    pub fn transfer_singleton(role: Role, from: Holder, to: Holder, timelock: Holder) -> Self {
        Self::from_action(StepAction::TransferSingleton { role, from, to })
            .with_actor(ActorContext::Timelock(timelock))
    }

    pub fn ratio_withdraw(controller: Holder, from: Holder, to: Holder, basis_points: u16) -> Self {
        Self::from_action(StepAction::RatioWithdraw {
            controller,
            from,
            to,
            basis_points,
        })
    }

    pub fn with_actor(mut self, actor: ActorContext) -> Self {
        self.actor = actor;
        self
    }

    /// Declare that `holder` must hold `role` before this step runs.
    pub fn requiring(mut self, role: Role, holder: Holder) -> Self {
        self.requires.push(Capability::new(role, holder));
        self
    }

    pub fn labelled(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn kind(&self) -> StepKind {
        match self.action {
            StepAction::Grant { .. } => StepKind::Grant,
            StepAction::Revoke { .. } => StepKind::Revoke,
            StepAction::TransferSingleton { .. } => StepKind::TransferSingleton,
            StepAction::RatioWithdraw { .. } => StepKind::RatioWithdraw,
        }
    }

    /// Role the step acts on. Ratio withdrawals act through `PcvController`.
    pub fn role(&self) -> Role {
        match &self.action {
            StepAction::Grant { role, .. }
            | StepAction::Revoke { role, .. }
            | StepAction::TransferSingleton { role, .. } => *role,
            StepAction::RatioWithdraw { .. } => Role::PcvController,
        }
    }

    /// Holder whose state the step changes.
    pub fn target(&self) -> &Holder {
        match &self.action {
            StepAction::Grant { holder, .. } | StepAction::Revoke { holder, .. } => holder,
            StepAction::TransferSingleton { to, .. } | StepAction::RatioWithdraw { to, .. } => to,
        }
    }

    /// Capability this step brings into existence, if any.
    pub fn establishes(&self) -> Option<Capability> {
        match &self.action {
            StepAction::Grant { role, holder } => Some(Capability::new(*role, holder.clone())),
            StepAction::TransferSingleton { role, to, .. } => {
                Some(Capability::new(*role, to.clone()))
            }
            _ => None,
        }
    }

    /// Capabilities that must be held before this step runs: the declared
    /// `requires` list, plus `PcvController` on the controller of a ratio
    /// withdrawal.
    pub fn prerequisites(&self) -> impl Iterator<Item = Capability> + '_ {
        let implicit = match &self.action {
            StepAction::RatioWithdraw { controller, .. } => {
                Some(Capability::new(Role::PcvController, controller.clone()))
            }
            _ => None,
        };
        self.requires.iter().cloned().chain(implicit)
    }

    /// Grant and revoke can be re-issued safely; transfers and withdrawals
    /// must be re-checked against registry state first.
    pub fn is_idempotent(&self) -> bool {
        matches!(self.kind(), StepKind::Grant | StepKind::Revoke)
    }

    /// Stable single-line encoding used for plan fingerprints.
    pub fn canonical(&self) -> String {
        let mut line = format!("{}|{}", self, self.actor);
        for capability in &self.requires {
            line.push_str(&format!("|requires {}", capability));
        }
        line
    }
}

impl fmt::Display for MigrationStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.action {
            StepAction::Grant { role, holder } => write!(f, "grant {} to {}", role, holder),
            StepAction::Revoke { role, holder } => write!(f, "revoke {} from {}", role, holder),
            StepAction::TransferSingleton { role, from, to } => {
                write!(f, "transfer {} from {} to {}", role, from, to)
            }
            StepAction::RatioWithdraw {
                controller,
                from,
                to,
                basis_points,
            } => write!(
                f,
                "withdraw {} bps from {} to {} via {}",
                basis_points, from, to, controller
            ),
        }
    }
}
