//! In-process access registry.
//!
//! Backs the CLI's offline rehearsals (state is loaded from and saved to a
//! JSON snapshot) and every test in the crate. Authority rules mirror the
//! live registry: ordinary roles may be administered by the default actor or
//! the designated timelock, singleton roles only by the timelock.

use super::traits::*;
use crate::error::MigrationError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Serializable registry state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrySnapshot {
    /// Designated timelock identity.
    pub timelock: Holder,

    #[serde(default)]
    pub roles: Vec<RoleAssignment>,

    #[serde(default)]
    pub balances: BTreeMap<Holder, u128>,
}

/// Holders of a single role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleAssignment {
    pub role: Role,
    pub holders: BTreeSet<Holder>,
}

impl RegistrySnapshot {
    pub fn new(timelock: Holder) -> Self {
        Self {
            timelock,
            roles: Vec::new(),
            balances: BTreeMap::new(),
        }
    }

    /// Load a snapshot from a JSON file.
    pub fn load(path: &Path) -> Result<Self, MigrationError> {
        let contents = fs::read_to_string(path).map_err(|e| {
            MigrationError::Configuration(format!(
                "failed to read registry snapshot '{}': {}",
                path.display(),
                e
            ))
        })?;

        let snapshot: RegistrySnapshot = serde_json::from_str(&contents).map_err(|e| {
            MigrationError::Configuration(format!(
                "failed to parse registry snapshot '{}': {}",
                path.display(),
                e
            ))
        })?;

        snapshot.validate()?;
        Ok(snapshot)
    }

    /// Save the snapshot as pretty-printed JSON.
    pub fn save(&self, path: &Path) -> Result<(), MigrationError> {
        let contents = serde_json::to_string_pretty(self).map_err(|e| {
            MigrationError::Configuration(format!("failed to serialize snapshot: {}", e))
        })?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                MigrationError::Configuration(format!(
                    "failed to create snapshot directory: {}",
                    e
                ))
            })?;
        }

        fs::write(path, contents).map_err(|e| {
            MigrationError::Configuration(format!(
                "failed to write registry snapshot '{}': {}",
                path.display(),
                e
            ))
        })
    }

    /// Reject duplicate role entries and singleton roles with several holders.
    pub fn validate(&self) -> Result<(), MigrationError> {
        let mut seen = BTreeSet::new();
        for assignment in &self.roles {
            if !seen.insert(assignment.role) {
                return Err(MigrationError::Configuration(format!(
                    "role {} listed more than once in snapshot",
                    assignment.role
                )));
            }
            if assignment.role.is_singleton() && assignment.holders.len() > 1 {
                return Err(MigrationError::Configuration(format!(
                    "singleton role {} has {} holders",
                    assignment.role,
                    assignment.holders.len()
                )));
            }
        }
        Ok(())
    }
}

/// In-memory [`AccessRegistry`].
///
/// Cloning shares the underlying state.
#[derive(Clone)]
pub struct InMemoryRegistry {
    state: Arc<Mutex<RegistryState>>,
}

struct RegistryState {
    timelock: Holder,
    roles: HashMap<Role, BTreeSet<Holder>>,
    balances: BTreeMap<Holder, u128>,
    /// Mutating calls attempted so far.
    calls: usize,
    /// Failures to return at a given mutating call index.
    injected: HashMap<usize, RegistryError>,
}

impl InMemoryRegistry {
    /// Create an empty registry with the given designated timelock.
    pub fn new(timelock: Holder) -> Self {
        Self::from_snapshot(RegistrySnapshot::new(timelock))
    }

    pub fn from_snapshot(snapshot: RegistrySnapshot) -> Self {
        let roles = snapshot
            .roles
            .into_iter()
            .map(|assignment| (assignment.role, assignment.holders))
            .collect();

        Self {
            state: Arc::new(Mutex::new(RegistryState {
                timelock: snapshot.timelock,
                roles,
                balances: snapshot.balances,
                calls: 0,
                injected: HashMap::new(),
            })),
        }
    }

    /// Capture current state.
    pub async fn snapshot(&self) -> RegistrySnapshot {
        let state = self.state.lock().await;
        let roles = Role::ALL
            .iter()
            .filter_map(|role| {
                state
                    .roles
                    .get(role)
                    .filter(|holders| !holders.is_empty())
                    .map(|holders| RoleAssignment {
                        role: *role,
                        holders: holders.clone(),
                    })
            })
            .collect();

        RegistrySnapshot {
            timelock: state.timelock.clone(),
            roles,
            balances: state.balances.clone(),
        }
    }

    /// Seed a capability directly (test and snapshot setup).
    pub async fn seed_role(&self, role: Role, holder: Holder) {
        let mut state = self.state.lock().await;
        let holders = state.roles.entry(role).or_default();
        if role.is_singleton() {
            holders.clear();
        }
        holders.insert(holder);
    }

    /// Seed a managed balance directly.
    pub async fn seed_balance(&self, holder: Holder, amount: u128) {
        self.state.lock().await.balances.insert(holder, amount);
    }

    /// Make the mutating call with index `call` fail with `error`.
    ///
    /// Calls are counted from zero across the registry's lifetime.
    pub async fn fail_call(&self, call: usize, error: RegistryError) {
        self.state.lock().await.injected.insert(call, error);
    }

    /// Number of mutating calls attempted, including failed ones.
    pub async fn mutating_calls(&self) -> usize {
        self.state.lock().await.calls
    }

    /// All holders of `role`, sorted.
    pub async fn holders(&self, role: Role) -> Vec<Holder> {
        let state = self.state.lock().await;
        state
            .roles
            .get(&role)
            .map(|holders| holders.iter().cloned().collect())
            .unwrap_or_default()
    }
}

impl RegistryState {
    fn begin_call(&mut self) -> RegistryResult<()> {
        let call = self.calls;
        self.calls += 1;
        match self.injected.remove(&call) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn authorize(&self, role: Role, actor: &ActorContext) -> RegistryResult<()> {
        match actor {
            ActorContext::Timelock(holder) if *holder != self.timelock => {
                Err(RegistryError::Unauthorized(format!(
                    "{} is not the designated timelock",
                    holder
                )))
            }
            ActorContext::Default if role.is_singleton() => Err(RegistryError::Unauthorized(
                format!("singleton role {} requires the timelock actor", role),
            )),
            _ => Ok(()),
        }
    }

    fn holds(&self, role: Role, holder: &Holder) -> bool {
        self.roles
            .get(&role)
            .is_some_and(|holders| holders.contains(holder))
    }
}

/// `floor(balance * basis_points / 10_000)` without overflowing.
pub(crate) fn ratio_of(balance: u128, basis_points: u16) -> u128 {
    let denominator = u128::from(MAX_BASIS_POINTS);
    let bps = u128::from(basis_points);
    (balance / denominator) * bps + (balance % denominator) * bps / denominator
}

#[async_trait]
impl AccessRegistry for InMemoryRegistry {
    async fn grant(
        &self,
        role: Role,
        holder: &Holder,
        actor: &ActorContext,
    ) -> RegistryResult<()> {
        let mut state = self.state.lock().await;
        state.begin_call()?;
        state.authorize(role, actor)?;

        if role.is_singleton() {
            return Err(RegistryError::InvalidTransition(format!(
                "singleton role {} must be transferred, not granted",
                role
            )));
        }

        state.roles.entry(role).or_default().insert(holder.clone());
        Ok(())
    }

    async fn revoke(
        &self,
        role: Role,
        holder: &Holder,
        actor: &ActorContext,
    ) -> RegistryResult<()> {
        let mut state = self.state.lock().await;
        state.begin_call()?;
        state.authorize(role, actor)?;

        if role.is_singleton() {
            return Err(RegistryError::InvalidTransition(format!(
                "singleton role {} cannot be revoked, only transferred",
                role
            )));
        }

        if let Some(holders) = state.roles.get_mut(&role) {
            holders.remove(holder);
        }
        Ok(())
    }

    async fn transfer_singleton(
        &self,
        role: Role,
        from: &Holder,
        to: &Holder,
        actor: &ActorContext,
    ) -> RegistryResult<()> {
        let mut state = self.state.lock().await;
        state.begin_call()?;
        state.authorize(role, actor)?;

        if !role.is_singleton() {
            return Err(RegistryError::InvalidTransition(format!(
                "role {} is not a singleton role",
                role
            )));
        }

        if !state.holds(role, from) {
            return Err(RegistryError::InvalidTransition(format!(
                "{} does not currently hold {}",
                from, role
            )));
        }

        let holders = state.roles.entry(role).or_default();
        holders.clear();
        holders.insert(to.clone());
        Ok(())
    }

    async fn has_role(&self, role: Role, holder: &Holder) -> RegistryResult<bool> {
        Ok(self.state.lock().await.holds(role, holder))
    }

    async fn withdraw_ratio(
        &self,
        controller: &Holder,
        from: &Holder,
        to: &Holder,
        basis_points: u16,
        actor: &ActorContext,
    ) -> RegistryResult<u128> {
        let mut state = self.state.lock().await;
        state.begin_call()?;
        state.authorize(Role::PcvController, actor)?;

        if basis_points > MAX_BASIS_POINTS {
            return Err(RegistryError::InvalidTransition(format!(
                "ratio {} exceeds {} basis points",
                basis_points, MAX_BASIS_POINTS
            )));
        }

        if !state.holds(Role::PcvController, controller) {
            return Err(RegistryError::Unauthorized(format!(
                "{} does not hold {}",
                controller,
                Role::PcvController
            )));
        }

        let balance = state.balances.get(from).copied().unwrap_or(0);
        let amount = ratio_of(balance, basis_points);
        if amount == 0 || from == to {
            return Ok(0);
        }

        let destination = state.balances.get(to).copied().unwrap_or(0);
        let credited = destination.checked_add(amount).ok_or_else(|| {
            RegistryError::InvalidTransition(format!("balance of {} would overflow", to))
        })?;

        state.balances.insert(from.clone(), balance - amount);
        state.balances.insert(to.clone(), credited);
        Ok(amount)
    }

    async fn balance_of(&self, holder: &Holder) -> RegistryResult<u128> {
        Ok(self
            .state
            .lock()
            .await
            .balances
            .get(holder)
            .copied()
            .unwrap_or(0))
    }
}
