//! Loaded operator inputs shared by the plan/run/teardown commands.

use super::config::{default_config_path, OperatorConfig};
use super::init_logging;
use role_migrator::registry::{InMemoryRegistry, RegistrySnapshot};
use role_migrator::{AddressBook, MigrationError};
use std::path::PathBuf;

/// Name of the timelock entry in the current address book.
const TIMELOCK_KEY: &str = "timelock";

pub struct Workspace {
    pub config_path: PathBuf,
    pub config: OperatorConfig,
    pub addresses: AddressBook,
    pub old_addresses: AddressBook,
}

impl Workspace {
    /// Load config, install logging, then load both address books.
    pub fn load(config_path: Option<String>) -> Result<Self, Box<dyn std::error::Error>> {
        let config_path = config_path
            .map(PathBuf::from)
            .unwrap_or_else(default_config_path);

        if !config_path.exists() {
            return Err(format!(
                "No config file at '{}'. Run `role-migrator init` first.",
                config_path.display()
            )
            .into());
        }

        let config = OperatorConfig::load(&config_path)?;
        init_logging(&config.logging);

        let addresses = AddressBook::load(&config.paths.addresses)?;
        let old_addresses = AddressBook::load(&config.paths.old_addresses)?;
        tracing::debug!(
            config = %config_path.display(),
            holders = addresses.holders().count(),
            old_holders = old_addresses.holders().count(),
            "workspace loaded"
        );

        Ok(Self {
            config_path,
            config,
            addresses,
            old_addresses,
        })
    }

    /// Open the registry snapshot, or start an empty one.
    ///
    /// A fresh registry takes its timelock from `[registry] timelock`, falling
    /// back to the `timelock` holder of the current address book.
    pub fn open_registry(&self) -> Result<InMemoryRegistry, MigrationError> {
        let path = &self.config.paths.registry;
        if path.exists() {
            let snapshot = RegistrySnapshot::load(path)?;
            return Ok(InMemoryRegistry::from_snapshot(snapshot));
        }

        let timelock = match &self.config.registry.timelock {
            Some(timelock) => timelock.clone(),
            None => self.addresses.holder(TIMELOCK_KEY)?.clone(),
        };
        tracing::info!(
            snapshot = %path.display(),
            %timelock,
            "no registry snapshot found, starting empty"
        );
        Ok(InMemoryRegistry::new(timelock))
    }

    pub async fn save_registry(&self, registry: &InMemoryRegistry) -> Result<(), MigrationError> {
        registry
            .snapshot()
            .await
            .save(&self.config.paths.registry)
    }
}
