//! Address book: symbolic names to holder identities and scalar parameters.
//!
//! Loaded once from TOML and read-only afterwards. Scalar parameters (fee
//! basis points, rate limits, caps) are opaque to the orchestrator and are
//! passed through untouched.
//!
//! ```toml
//! [holders]
//! core = "0xEC7AD284f7Ad256b64c6E69b84Eb0F48f42e8196"
//! timelock = "0xd51dbA7a94e1adEa403553A8235C302cEbF41a3c"
//!
//! [params]
//! mint_fee_basis_points = 10
//! max_buffer_cap = "10000000000000000000000000"
//! ```

use crate::error::MigrationError;
use crate::registry::Holder;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;

/// Opaque scalar configuration value.
///
/// Amounts that overflow a TOML integer are written as strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Param {
    Flag(bool),
    Integer(i64),
    Text(String),
}

impl fmt::Display for Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Param::Flag(value) => write!(f, "{}", value),
            Param::Integer(value) => write!(f, "{}", value),
            Param::Text(value) => write!(f, "{}", value),
        }
    }
}

/// Immutable name → identity mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressBook {
    #[serde(default)]
    holders: BTreeMap<String, Holder>,

    #[serde(default)]
    params: BTreeMap<String, Param>,
}

impl AddressBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a holder entry (builder style, used before the book is shared).
    pub fn with_holder(mut self, name: impl Into<String>, holder: Holder) -> Self {
        self.holders.insert(name.into(), holder);
        self
    }

    /// Add a scalar parameter (builder style).
    pub fn with_param(mut self, name: impl Into<String>, value: Param) -> Self {
        self.params.insert(name.into(), value);
        self
    }

    /// Parse an address book from TOML text.
    pub fn from_toml_str(contents: &str) -> Result<Self, MigrationError> {
        let book: AddressBook = toml::from_str(contents).map_err(|e| {
            MigrationError::Configuration(format!("malformed address book: {}", e))
        })?;
        book.validate()?;
        Ok(book)
    }

    /// Load an address book from a TOML file.
    pub fn load(path: &Path) -> Result<Self, MigrationError> {
        let contents = fs::read_to_string(path).map_err(|e| {
            MigrationError::Configuration(format!(
                "failed to read address book '{}': {}",
                path.display(),
                e
            ))
        })?;

        Self::from_toml_str(&contents)
            .map_err(|e| e.with_context(format!("address book '{}'", path.display())))
    }

    fn validate(&self) -> Result<(), MigrationError> {
        let names = self.holders.keys().chain(self.params.keys());
        for name in names {
            if name.trim().is_empty() {
                return Err(MigrationError::Configuration(
                    "address book entry with empty name".to_string(),
                ));
            }
        }

        if let Some(name) = self.holders.keys().find(|name| self.params.contains_key(*name)) {
            return Err(MigrationError::Configuration(format!(
                "'{}' is defined both as a holder and as a parameter",
                name
            )));
        }

        Ok(())
    }

    /// Look up a holder, failing with a configuration error naming the key.
    pub fn holder(&self, name: &str) -> Result<&Holder, MigrationError> {
        self.holders.get(name).ok_or_else(|| {
            MigrationError::Configuration(format!("address book has no holder '{}'", name))
        })
    }

    /// Check that every name in `names` resolves to a holder.
    pub fn require(&self, names: &[&str]) -> Result<(), MigrationError> {
        let missing: Vec<&str> = names
            .iter()
            .copied()
            .filter(|name| !self.holders.contains_key(*name))
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(MigrationError::Configuration(format!(
                "address book is missing holders: {}",
                missing.join(", ")
            )))
        }
    }

    pub fn param(&self, name: &str) -> Option<&Param> {
        self.params.get(name)
    }

    pub fn holders(&self) -> impl Iterator<Item = (&str, &Holder)> {
        self.holders.iter().map(|(name, holder)| (name.as_str(), holder))
    }

    pub fn params(&self) -> impl Iterator<Item = (&str, &Param)> {
        self.params.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn is_empty(&self) -> bool {
        self.holders.is_empty() && self.params.is_empty()
    }
}
