//! Access registry trait abstractions.
//!
//! The registry is the external authority that records which holders carry
//! which roles. The orchestrator only ever talks to it through
//! [`AccessRegistry`], which lets tests substitute the in-memory registry.

use crate::error::MigrationError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Denominator for ratio withdrawals (100% = 10_000 basis points).
pub const MAX_BASIS_POINTS: u16 = 10_000;

/// Capability category gating a class of privileged operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Minter,
    Burner,
    PcvController,
    /// Sole-holder role, e.g. a token's single minter.
    Governor,
}

impl Role {
    pub const ALL: [Role; 4] = [Role::Minter, Role::Burner, Role::PcvController, Role::Governor];

    /// Exactly one holder may carry a singleton role at any time.
    pub fn is_singleton(self) -> bool {
        matches!(self, Role::Governor)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Minter => "minter",
            Role::Burner => "burner",
            Role::PcvController => "pcv_controller",
            Role::Governor => "governor",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Role {
    type Err = MigrationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "minter" => Ok(Role::Minter),
            "burner" => Ok(Role::Burner),
            "pcv_controller" | "pcvcontroller" => Ok(Role::PcvController),
            "governor" => Ok(Role::Governor),
            other => Err(MigrationError::Configuration(format!(
                "unknown role '{}'",
                other
            ))),
        }
    }
}

/// External identity (a 20-byte address, stored lowercase with `0x` prefix).
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Holder(String);

impl Holder {
    /// Build a holder from a raw 20-byte address.
    pub fn from_bytes(bytes: [u8; 20]) -> Self {
        Self(format!("0x{}", hex::encode(bytes)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for Holder {
    type Err = MigrationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let digits = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .ok_or_else(|| {
                MigrationError::Configuration(format!("address '{}' is missing 0x prefix", s))
            })?;

        let bytes = hex::decode(digits).map_err(|e| {
            MigrationError::Configuration(format!("address '{}' is not valid hex: {}", s, e))
        })?;

        if bytes.len() != 20 {
            return Err(MigrationError::Configuration(format!(
                "address '{}' must be 20 bytes, got {}",
                s,
                bytes.len()
            )));
        }

        Ok(Self(format!("0x{}", digits.to_ascii_lowercase())))
    }
}

impl TryFrom<String> for Holder {
    type Error = MigrationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Holder> for String {
    fn from(holder: Holder) -> Self {
        holder.0
    }
}

impl fmt::Display for Holder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for Holder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Holder({})", self.0)
    }
}

/// A role held by a specific holder.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Capability {
    pub role: Role,
    pub holder: Holder,
}

impl Capability {
    pub fn new(role: Role, holder: Holder) -> Self {
        Self { role, holder }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} on {}", self.role, self.holder)
    }
}

/// Privileged identity under whose authority a mutating call is issued.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "actor", content = "holder")]
pub enum ActorContext {
    /// The registry's ordinary governing actor.
    #[default]
    Default,
    /// The governance timelock, required for singleton-role transfers.
    Timelock(Holder),
}

impl ActorContext {
    pub fn is_timelock(&self) -> bool {
        matches!(self, ActorContext::Timelock(_))
    }
}

impl fmt::Display for ActorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActorContext::Default => write!(f, "default"),
            ActorContext::Timelock(holder) => write!(f, "timelock({})", holder),
        }
    }
}

/// Result type for registry operations.
pub type RegistryResult<T> = Result<T, RegistryError>;

/// Registry call failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Invalid transition: {0}")]
    InvalidTransition(String),

    #[error("Network error: {0}")]
    Network(String),
}

/// Capability interface over the external access-control authority.
///
/// `grant` and `revoke` are idempotent: the contract is the end state, not the
/// transition. `transfer_singleton` and `withdraw_ratio` are not, and callers
/// must re-check registry state before repeating them.
#[async_trait]
pub trait AccessRegistry: Send + Sync {
    /// Grant `role` to `holder`. Granting an already-held role succeeds.
    async fn grant(&self, role: Role, holder: &Holder, actor: &ActorContext)
        -> RegistryResult<()>;

    /// Revoke `role` from `holder`. Revoking an absent role succeeds.
    async fn revoke(
        &self,
        role: Role,
        holder: &Holder,
        actor: &ActorContext,
    ) -> RegistryResult<()>;

    /// Atomically move a singleton role from `from` to `to`.
    ///
    /// Fails with `InvalidTransition` if `from` is not the current holder.
    async fn transfer_singleton(
        &self,
        role: Role,
        from: &Holder,
        to: &Holder,
        actor: &ActorContext,
    ) -> RegistryResult<()>;

    /// Point query; never mutates.
    async fn has_role(&self, role: Role, holder: &Holder) -> RegistryResult<bool>;

    /// Move `basis_points / 10_000` of `from`'s managed balance to `to`,
    /// acting through `controller`. Returns the amount moved.
    async fn withdraw_ratio(
        &self,
        controller: &Holder,
        from: &Holder,
        to: &Holder,
        basis_points: u16,
        actor: &ActorContext,
    ) -> RegistryResult<u128>;

    /// Managed balance held by `holder`.
    async fn balance_of(&self, holder: &Holder) -> RegistryResult<u128>;
}
