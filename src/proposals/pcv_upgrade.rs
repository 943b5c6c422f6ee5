//! PCV upgrade: hand mint, burn and PCV-control authority from the retiring
//! deposit/controller/stabilizer set to their replacements.
//!
//! New components are granted their roles first. The TRIBE minter singleton
//! moves to the new TribeReserveStabilizer under the timelock. Finally the old
//! RatioPCVController moves 100% of PCV from the old deposit to the new one,
//! which must already be a Minter by then.

use super::definition::ProposalDefinition;
use crate::address_book::AddressBook;
use crate::error::MigrationError;
use crate::migration::{MigrationPlan, MigrationStep};
use crate::registry::{Capability, Role, MAX_BASIS_POINTS};

pub const UNISWAP_PCV_DEPOSIT: &str = "uniswap_pcv_deposit";
pub const UNISWAP_PCV_CONTROLLER: &str = "uniswap_pcv_controller";
pub const BONDING_CURVE: &str = "bonding_curve";
pub const ETH_RESERVE_STABILIZER: &str = "eth_reserve_stabilizer";
pub const TRIBE_RESERVE_STABILIZER: &str = "tribe_reserve_stabilizer";
pub const RATIO_PCV_CONTROLLER: &str = "ratio_pcv_controller";
pub const PCV_DRIP_CONTROLLER: &str = "pcv_drip_controller";
pub const TIMELOCK: &str = "timelock";
/// Current holder of the TRIBE minter role (old address book).
pub const TRIBE_MINTER: &str = "tribe_minter";

const NEW_HOLDERS: [&str; 8] = [
    UNISWAP_PCV_DEPOSIT,
    UNISWAP_PCV_CONTROLLER,
    BONDING_CURVE,
    ETH_RESERVE_STABILIZER,
    TRIBE_RESERVE_STABILIZER,
    RATIO_PCV_CONTROLLER,
    PCV_DRIP_CONTROLLER,
    TIMELOCK,
];

const OLD_HOLDERS: [&str; 6] = [
    UNISWAP_PCV_DEPOSIT,
    UNISWAP_PCV_CONTROLLER,
    BONDING_CURVE,
    ETH_RESERVE_STABILIZER,
    RATIO_PCV_CONTROLLER,
    TRIBE_MINTER,
];

#[derive(Debug, Clone, Copy, Default)]
pub struct PcvUpgrade;

impl ProposalDefinition for PcvUpgrade {
    fn name(&self) -> &str {
        "pcv-upgrade"
    }

    fn setup(&self, addresses: &AddressBook, old: &AddressBook) -> Result<(), MigrationError> {
        addresses
            .require(&NEW_HOLDERS)
            .map_err(|e| e.with_context("current addresses"))?;
        old.require(&OLD_HOLDERS)
            .map_err(|e| e.with_context("old addresses"))
    }

    fn run(
        &self,
        addresses: &AddressBook,
        old: &AddressBook,
    ) -> Result<MigrationPlan, MigrationError> {
        self.setup(addresses, old)?;

        let new = |name: &str| addresses.holder(name).cloned();
        let retired = |name: &str| old.holder(name).cloned();

        let deposit = new(UNISWAP_PCV_DEPOSIT)?;
        let controller = new(UNISWAP_PCV_CONTROLLER)?;
        let tribe_stabilizer = new(TRIBE_RESERVE_STABILIZER)?;
        let drip_controller = new(PCV_DRIP_CONTROLLER)?;

        let plan = MigrationPlan::new()
            .then(
                MigrationStep::grant(Role::Burner, controller.clone())
                    .labelled("Granting Burner to new UniswapPCVController"),
            )
            .then(
                MigrationStep::grant(Role::Minter, controller)
                    .labelled("Granting Minter to new UniswapPCVController"),
            )
            .then(
                MigrationStep::grant(Role::Minter, new(BONDING_CURVE)?)
                    .labelled("Granting Minter to new BondingCurve"),
            )
            .then(
                MigrationStep::grant(Role::Minter, deposit.clone())
                    .labelled("Granting Minter to new UniswapPCVDeposit"),
            )
            .then(
                MigrationStep::grant(Role::Burner, tribe_stabilizer.clone())
                    .labelled("Granting Burner to new TribeReserveStabilizer"),
            )
            .then(
                MigrationStep::transfer_singleton(
                    Role::Governor,
                    retired(TRIBE_MINTER)?,
                    tribe_stabilizer,
                    new(TIMELOCK)?,
                )
                .labelled("Transferring TRIBE Minter role to TribeReserveStabilizer"),
            )
            .then(
                MigrationStep::grant(Role::Burner, new(ETH_RESERVE_STABILIZER)?)
                    .labelled("Granting Burner to new EthReserveStabilizer"),
            )
            .then(
                MigrationStep::grant(Role::PcvController, new(RATIO_PCV_CONTROLLER)?)
                    .labelled("Granting PCVController to new RatioPCVController"),
            )
            .then(
                MigrationStep::grant(Role::PcvController, drip_controller.clone())
                    .labelled("Granting PCVController to new PCVDripController"),
            )
            .then(
                MigrationStep::grant(Role::Minter, drip_controller)
                    .labelled("Granting Minter to new PCVDripController"),
            )
            .then(
                MigrationStep::ratio_withdraw(
                    retired(RATIO_PCV_CONTROLLER)?,
                    retired(UNISWAP_PCV_DEPOSIT)?,
                    deposit.clone(),
                    MAX_BASIS_POINTS,
                )
                .requiring(Role::Minter, deposit)
                .labelled("Moving 100% of PCV from old UniswapPCVDeposit to new"),
            );

        Ok(plan)
    }

    fn teardown(
        &self,
        addresses: &AddressBook,
        old: &AddressBook,
    ) -> Result<Vec<Capability>, MigrationError> {
        self.setup(addresses, old)?;

        let retired = |name: &str| old.holder(name).cloned();
        let controller = retired(UNISWAP_PCV_CONTROLLER)?;

        Ok(vec![
            Capability::new(Role::Minter, controller.clone()),
            Capability::new(Role::Minter, retired(UNISWAP_PCV_DEPOSIT)?),
            Capability::new(Role::Minter, retired(BONDING_CURVE)?),
            Capability::new(Role::Burner, controller.clone()),
            Capability::new(Role::Burner, retired(ETH_RESERVE_STABILIZER)?),
            Capability::new(Role::PcvController, retired(RATIO_PCV_CONTROLLER)?),
            Capability::new(Role::PcvController, controller),
        ])
    }
}
