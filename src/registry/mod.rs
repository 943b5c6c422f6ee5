//! Access registry client.
//!
//! Trait abstraction over the external authority that stores role
//! assignments, plus an in-memory implementation used for rehearsals and
//! tests.

pub mod memory;
pub mod traits;

pub use memory::{InMemoryRegistry, RegistrySnapshot, RoleAssignment};
pub use traits::{
    AccessRegistry, ActorContext, Capability, Holder, RegistryError, RegistryResult, Role,
    MAX_BASIS_POINTS,
};
