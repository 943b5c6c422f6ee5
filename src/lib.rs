//! Role Migrator - sequenced capability handover between protocol components
//!
//! Transfers mint, burn and PCV-control authority from a retiring set of
//! components to their replacements through an external access registry.
//!
//! Key principles:
//! - Whole plan validated before the first external call
//! - Steps applied strictly in order, one awaited call at a time
//! - Fail fast, never auto-rollback; resumption is a manual act
//! - Teardown of retired holders is a separate, explicit operation

pub mod address_book;
pub mod error;
pub mod migration;
pub mod proposals;
pub mod registry;

pub use address_book::{AddressBook, Param};
pub use error::{ErrorKind, MigrationError, MigrationOutcome};
pub use migration::{MigrationPlan, MigrationResult, MigrationStep, Orchestrator};
pub use proposals::{ProposalCatalog, ProposalConfig, ProposalDefinition};
pub use registry::{AccessRegistry, ActorContext, Capability, Holder, InMemoryRegistry, Role};
