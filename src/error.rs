//! Migration error taxonomy.
//!
//! Every failure the orchestrator reports falls into one of four kinds:
//! configuration problems caught before any external call, authorization
//! failures, logic errors (the plan disagrees with live registry state) and
//! transient network failures. Only the last kind is retryable, and only by the
//! caller.

use crate::registry::RegistryError;
use std::fmt;

/// Result type for migration operations.
pub type MigrationOutcome<T> = Result<T, MigrationError>;

/// Migration errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MigrationError {
    /// Unknown role, malformed address book entry, incomplete proposal or an
    /// ordering violation. Detected before any external call.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The actor context lacks authority for the requested mutation.
    #[error("Authorization error: {0}")]
    Authorization(String),

    /// The transition is inconsistent with current registry state.
    #[error("Logic error: {0}")]
    Logic(String),

    /// Transient failure talking to the registry.
    #[error("Network error: {0}")]
    Network(String),

    /// The plan was truncated before the step started.
    #[error("Cancelled before step started")]
    Cancelled,
}

/// Error category, used for reporting and events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Configuration,
    Authorization,
    Logic,
    Network,
    Cancelled,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Configuration => "configuration",
            Self::Authorization => "authorization",
            Self::Logic => "logic",
            Self::Network => "network",
            Self::Cancelled => "cancelled",
        };
        write!(f, "{}", name)
    }
}

impl MigrationError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Configuration(_) => ErrorKind::Configuration,
            Self::Authorization(_) => ErrorKind::Authorization,
            Self::Logic(_) => ErrorKind::Logic,
            Self::Network(_) => ErrorKind::Network,
            Self::Cancelled => ErrorKind::Cancelled,
        }
    }

    /// Whether a caller may retry the failed call as-is.
    ///
    /// Only network failures qualify. The orchestrator itself never retries.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network(_))
    }

    /// Prefix the message with extra context, keeping the kind.
    pub fn with_context(self, context: impl fmt::Display) -> Self {
        match self {
            Self::Configuration(msg) => Self::Configuration(format!("{}: {}", context, msg)),
            Self::Authorization(msg) => Self::Authorization(format!("{}: {}", context, msg)),
            Self::Logic(msg) => Self::Logic(format!("{}: {}", context, msg)),
            Self::Network(msg) => Self::Network(format!("{}: {}", context, msg)),
            Self::Cancelled => Self::Cancelled,
        }
    }
}

impl From<RegistryError> for MigrationError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::Unauthorized(msg) => Self::Authorization(msg),
            RegistryError::InvalidTransition(msg) => Self::Logic(msg),
            RegistryError::Network(msg) => Self::Network(msg),
        }
    }
}
