//! Proposal lifecycle hooks.

use crate::address_book::AddressBook;
use crate::error::MigrationError;
use crate::migration::MigrationPlan;
use crate::registry::Capability;

/// One migration, expressed as three lifecycle hooks.
///
/// - `setup` prepares and checks inputs; it never touches the registry
/// - `run` builds the plan executed against the live authority
/// - `teardown` lists the capabilities retired holders still carry, for a
///   separate and manually triggered decommission
///
/// Every hook receives the current address book and the snapshot of the
/// addresses being retired.
pub trait ProposalDefinition: Send + Sync {
    /// Human-readable name used in logs and listings.
    fn name(&self) -> &str;

    fn setup(&self, addresses: &AddressBook, old: &AddressBook) -> Result<(), MigrationError>;

    fn run(&self, addresses: &AddressBook, old: &AddressBook)
        -> Result<MigrationPlan, MigrationError>;

    fn teardown(
        &self,
        addresses: &AddressBook,
        old: &AddressBook,
    ) -> Result<Vec<Capability>, MigrationError>;
}
