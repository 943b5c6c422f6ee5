//! Property-based tests for migration execution
//!
//! Tests for:
//! - Idempotence: repeated grant/revoke settle to the same end state
//! - Fail-fast: a failure at step k applies exactly the steps before k
//! - Singleton: a transfer never leaves two holders
//! - Ratio: withdrawals move floor(balance * bps / 10000)

use super::{MigrationPlan, MigrationStep, Orchestrator};
use crate::registry::{
    AccessRegistry, ActorContext, Holder, InMemoryRegistry, RegistryError, Role,
    MAX_BASIS_POINTS,
};
use proptest::prelude::*;

fn addr(n: u8) -> Holder {
    let mut bytes = [0u8; 20];
    bytes[19] = n;
    Holder::from_bytes(bytes)
}

fn block_on<F: std::future::Future>(future: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
        .block_on(future)
}

fn role_strategy() -> impl Strategy<Value = Role> {
    prop_oneof![
        Just(Role::Minter),
        Just(Role::Burner),
        Just(Role::PcvController)
    ]
}

proptest! {
    /// Property: granting twice is indistinguishable from granting once
    #[test]
    fn grant_is_idempotent(role in role_strategy(), holder in any::<u8>(), times in 1usize..5) {
        let holds = block_on(async {
            let registry = InMemoryRegistry::new(addr(0xff));
            for _ in 0..times {
                registry.grant(role, &addr(holder), &ActorContext::Default).await.unwrap();
            }
            (
                registry.has_role(role, &addr(holder)).await.unwrap(),
                registry.holders(role).await.len(),
            )
        });
        prop_assert_eq!(holds, (true, 1));
    }

    /// Property: revoking twice is indistinguishable from revoking once
    #[test]
    fn revoke_is_idempotent(role in role_strategy(), holder in any::<u8>(), seeded in any::<bool>(), times in 1usize..5) {
        let holds = block_on(async {
            let registry = InMemoryRegistry::new(addr(0xff));
            if seeded {
                registry.seed_role(role, addr(holder)).await;
            }
            for _ in 0..times {
                registry.revoke(role, &addr(holder), &ActorContext::Default).await.unwrap();
            }
            registry.has_role(role, &addr(holder)).await.unwrap()
        });
        prop_assert!(!holds);
    }

    /// Property: failure at step k applies exactly k steps and attempts nothing after
    #[test]
    fn fail_fast_applies_exact_prefix(len in 1usize..12, fail_seed in any::<usize>()) {
        let fail_at = fail_seed % len;
        let (applied, failed_index, calls, later_held) = block_on(async {
            let registry = InMemoryRegistry::new(addr(0xff));
            registry.fail_call(fail_at, RegistryError::Network("injected".into())).await;

            let plan = MigrationPlan::from_steps(
                (0..len).map(|n| MigrationStep::grant(Role::Minter, addr(n as u8))).collect(),
            );
            let result = Orchestrator::new(registry.clone()).run(&plan).await;

            let mut later_held = false;
            for n in fail_at..len {
                later_held |= registry.has_role(Role::Minter, &addr(n as u8)).await.unwrap();
            }
            (
                result.applied().len(),
                result.failure().map(|f| f.index),
                registry.mutating_calls().await,
                later_held,
            )
        });

        prop_assert_eq!(applied, fail_at);
        prop_assert_eq!(failed_index, Some(fail_at));
        prop_assert_eq!(calls, fail_at + 1);
        prop_assert!(!later_held);
    }

    /// Property: after a singleton transfer only the destination holds the role
    #[test]
    fn singleton_transfer_has_one_holder(from in 0u8..100, to in 100u8..200) {
        let (from_holds, to_holds, count) = block_on(async {
            let registry = InMemoryRegistry::new(addr(0xff));
            registry.seed_role(Role::Governor, addr(from)).await;
            registry
                .transfer_singleton(
                    Role::Governor,
                    &addr(from),
                    &addr(to),
                    &ActorContext::Timelock(addr(0xff)),
                )
                .await
                .unwrap();
            (
                registry.has_role(Role::Governor, &addr(from)).await.unwrap(),
                registry.has_role(Role::Governor, &addr(to)).await.unwrap(),
                registry.holders(Role::Governor).await.len(),
            )
        });
        prop_assert!(!from_holds);
        prop_assert!(to_holds);
        prop_assert_eq!(count, 1);
    }

    /// Property: withdrawals conserve the total and move the floored share
    #[test]
    fn ratio_withdraw_conserves_balance(balance in any::<u64>(), bps in 0u16..=MAX_BASIS_POINTS) {
        let (moved, source, destination) = block_on(async {
            let registry = InMemoryRegistry::new(addr(0xff));
            registry.seed_role(Role::PcvController, addr(9)).await;
            registry.seed_balance(addr(1), u128::from(balance)).await;
            let moved = registry
                .withdraw_ratio(&addr(9), &addr(1), &addr(2), bps, &ActorContext::Default)
                .await
                .unwrap();
            (
                moved,
                registry.balance_of(&addr(1)).await.unwrap(),
                registry.balance_of(&addr(2)).await.unwrap(),
            )
        });

        let expected = u128::from(balance) * u128::from(bps) / 10_000;
        prop_assert_eq!(moved, expected);
        prop_assert_eq!(source + destination, u128::from(balance));
        prop_assert_eq!(destination, expected);
    }

    /// Property: any ratio above 10000 bps is rejected
    #[test]
    fn ratio_withdraw_rejects_excess(bps in (MAX_BASIS_POINTS + 1)..=u16::MAX) {
        let result = block_on(async {
            let registry = InMemoryRegistry::new(addr(0xff));
            registry.seed_role(Role::PcvController, addr(9)).await;
            registry.seed_balance(addr(1), 1_000).await;
            registry
                .withdraw_ratio(&addr(9), &addr(1), &addr(2), bps, &ActorContext::Default)
                .await
        });
        prop_assert!(matches!(result, Err(RegistryError::InvalidTransition(_))));
    }
}
