//! Operator configuration file handling
//!
//! Provides default configuration generation and loading for the migrator.
//! Configuration files are TOML and live in the data directory next to the
//! address books and the registry snapshot.
//!
//! ## Operator Settings vs Economic Parameters
//!
//! This file contains OPERATOR configuration only: where the address books
//! and registry snapshot live, and how to log. Fee levels, rate limits and
//! caps belong in the address book `[params]` table and are never
//! interpreted by the migrator.

use role_migrator::Holder;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Default log level
const DEFAULT_LOG_LEVEL: &str = "info";

/// Migrator configuration (operator settings only)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperatorConfig {
    /// Input and state file locations
    pub paths: PathsConfig,

    /// Registry settings used when no snapshot exists yet
    #[serde(default)]
    pub registry: RegistryConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// File locations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Address book for the replacement components
    pub addresses: PathBuf,

    /// Address book for the components being retired
    pub old_addresses: PathBuf,

    /// Registry snapshot (JSON) the migration is rehearsed against
    pub registry: PathBuf,
}

/// Registry configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RegistryConfig {
    /// Designated timelock for a freshly created snapshot
    pub timelock: Option<Holder>,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file path (optional, logs to stderr if not specified)
    pub file: Option<PathBuf>,
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: DEFAULT_LOG_LEVEL.to_string(),
            file: None,
        }
    }
}

impl OperatorConfig {
    /// Load configuration from a TOML file
    ///
    /// Relative paths inside the file are resolved against its directory.
    pub fn load(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let contents = fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file '{}': {}", path.display(), e))?;

        let mut config: OperatorConfig = toml::from_str(&contents)
            .map_err(|e| format!("Failed to parse config file '{}': {}", path.display(), e))?;

        if let Some(base) = path.parent() {
            config.paths.resolve_against(base);
            if let Some(file) = config.logging.file.take() {
                config.logging.file = Some(resolve(base, file));
            }
        }

        Ok(config)
    }

    /// Generate default configuration content as a string with comments
    pub fn generate_default_toml(data_dir: &Path) -> String {
        format!(
            r#"# Role Migrator Configuration (Operator Settings)
#
# This file contains OPERATOR configuration only: file locations and logging.
# Economic parameters (fees, rate limits, caps) belong in the address book
# [params] table and are passed through untouched.

[paths]
# Address book for the replacement components
addresses = "{addresses}"

# Address book for the components being retired
old_addresses = "{old_addresses}"

# Registry snapshot the migration is rehearsed against (JSON)
registry = "{registry}"

[registry]
# Designated governance timelock, used only when the snapshot does not exist yet
# timelock = "0x..."

[logging]
# Log level: trace, debug, info, warn, error (RUST_LOG overrides)
level = "info"

# Log file path (optional, logs to stderr if not specified)
# file = "/var/log/role-migrator/migrator.log"
"#,
            addresses = data_dir.join("addresses.toml").display(),
            old_addresses = data_dir.join("old-addresses.toml").display(),
            registry = data_dir.join("registry.json").display(),
        )
    }

    /// Create and save a default configuration file
    pub fn create_default(
        config_path: &Path,
        data_dir: &Path,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let contents = Self::generate_default_toml(data_dir);

        // Create parent directory if needed
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| format!("Failed to create config directory: {}", e))?;
        }

        fs::write(config_path, contents).map_err(|e| {
            format!(
                "Failed to write config file '{}': {}",
                config_path.display(),
                e
            )
        })?;

        Ok(())
    }
}

impl PathsConfig {
    fn resolve_against(&mut self, base: &Path) {
        self.addresses = resolve(base, std::mem::take(&mut self.addresses));
        self.old_addresses = resolve(base, std::mem::take(&mut self.old_addresses));
        self.registry = resolve(base, std::mem::take(&mut self.registry));
    }
}

fn resolve(base: &Path, path: PathBuf) -> PathBuf {
    if path.is_absolute() {
        path
    } else {
        base.join(path)
    }
}

/// Default data directory: ~/.local/share/role-migrator
pub fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("role-migrator")
}

/// Default config file path inside the data directory
pub fn default_config_path() -> PathBuf {
    default_data_dir().join("config.toml")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config_roundtrip() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.toml");

        OperatorConfig::create_default(&config_path, temp_dir.path()).unwrap();
        let config = OperatorConfig::load(&config_path).unwrap();

        assert_eq!(config.paths.addresses, temp_dir.path().join("addresses.toml"));
        assert_eq!(config.paths.registry, temp_dir.path().join("registry.json"));
        assert_eq!(config.logging.level, "info");
        assert!(config.logging.file.is_none());
        assert!(config.registry.timelock.is_none());
    }

    #[test]
    fn test_relative_paths_resolve_against_config_dir() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.toml");
        fs::write(
            &config_path,
            r#"
[paths]
addresses = "books/new.toml"
old_addresses = "books/old.toml"
registry = "state/registry.json"

[registry]
timelock = "0xd51dbA7a94e1adEa403553A8235C302cEbF41a3c"
"#,
        )
        .unwrap();

        let config = OperatorConfig::load(&config_path).unwrap();
        assert_eq!(config.paths.addresses, temp_dir.path().join("books/new.toml"));
        assert_eq!(
            config.registry.timelock.unwrap().as_str(),
            "0xd51dba7a94e1adea403553a8235c302cebf41a3c"
        );
    }

    #[test]
    fn test_load_missing_file() {
        let result = OperatorConfig::load(Path::new("/nonexistent/config.toml"));
        assert!(result.is_err());
    }
}
