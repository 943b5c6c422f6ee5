//! Migration proposals and the catalog that stages them.

pub mod catalog;
pub mod definition;
pub mod pcv_upgrade;

pub use catalog::{Governance, ProposalCatalog, ProposalConfig, Staging};
pub use definition::ProposalDefinition;
pub use pcv_upgrade::PcvUpgrade;
