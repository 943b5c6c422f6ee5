//! Proposal catalog: proposal id → execution metadata.
//!
//! Consumed by whatever harness stages a proposal. `deploy` decides between
//! deploying fresh components first and running against already-deployed
//! holders; `skip_dao` decides between simulating a governance vote around
//! `run` and invoking it directly.

use super::definition::ProposalDefinition;
use super::pcv_upgrade::PcvUpgrade;
use crate::error::MigrationError;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// How the harness obtains the holders `run` operates on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Staging {
    DeployThenRun,
    AgainstLiveState,
}

/// How the harness authorizes `run`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Governance {
    SimulatedVote,
    Direct,
}

/// Execution metadata for one proposal.
#[derive(Clone)]
pub struct ProposalConfig {
    pub deploy: bool,
    pub skip_dao: bool,
    /// Native value attached to the DAO execution.
    pub total_value: u128,
    pub proposal: Arc<dyn ProposalDefinition>,
}

impl ProposalConfig {
    pub fn new(proposal: Arc<dyn ProposalDefinition>) -> Self {
        Self {
            deploy: false,
            skip_dao: false,
            total_value: 0,
            proposal,
        }
    }

    pub fn staging(&self) -> Staging {
        if self.deploy {
            Staging::DeployThenRun
        } else {
            Staging::AgainstLiveState
        }
    }

    pub fn governance(&self) -> Governance {
        if self.skip_dao {
            Governance::Direct
        } else {
            Governance::SimulatedVote
        }
    }
}

impl fmt::Debug for ProposalConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProposalConfig")
            .field("deploy", &self.deploy)
            .field("skip_dao", &self.skip_dao)
            .field("total_value", &self.total_value)
            .field("proposal", &self.proposal.name())
            .finish()
    }
}

/// Read-only lookup table of proposals.
#[derive(Debug, Clone, Default)]
pub struct ProposalCatalog {
    entries: BTreeMap<String, ProposalConfig>,
}

impl ProposalCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalog of the proposals this crate ships.
    pub fn builtin() -> Self {
        let upgrade: Arc<dyn ProposalDefinition> = Arc::new(PcvUpgrade);
        let mut catalog = Self::new();

        // Ids are static and well-formed; insertion cannot fail.
        let entries = [
            (
                "fip_999",
                ProposalConfig {
                    deploy: true,
                    ..ProposalConfig::new(upgrade.clone())
                },
            ),
            ("merger", ProposalConfig::new(upgrade)),
        ];
        for (id, config) in entries {
            catalog.entries.insert(id.to_string(), config);
        }
        catalog
    }

    /// Register a proposal. Ids are lowercase `[a-z0-9_]` and unique.
    pub fn insert(&mut self, id: &str, config: ProposalConfig) -> Result<(), MigrationError> {
        validate_id(id)?;

        if config.proposal.name().trim().is_empty() {
            return Err(MigrationError::Configuration(format!(
                "proposal '{}' has an unnamed definition",
                id
            )));
        }

        if self.entries.contains_key(id) {
            return Err(MigrationError::Configuration(format!(
                "proposal '{}' is already registered",
                id
            )));
        }

        self.entries.insert(id.to_string(), config);
        Ok(())
    }

    pub fn get(&self, id: &str) -> Result<&ProposalConfig, MigrationError> {
        self.entries.get(id).ok_or_else(|| {
            let known: Vec<&str> = self.ids().collect();
            MigrationError::Configuration(format!(
                "unknown proposal '{}' (known: {})",
                id,
                known.join(", ")
            ))
        })
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ProposalConfig)> {
        self.entries.iter().map(|(id, config)| (id.as_str(), config))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn validate_id(id: &str) -> Result<(), MigrationError> {
    let well_formed = !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');

    if well_formed {
        Ok(())
    } else {
        Err(MigrationError::Configuration(format!(
            "invalid proposal id '{}': must be lowercase alphanumeric with underscores",
            id
        )))
    }
}
