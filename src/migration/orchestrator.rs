//! Role migration orchestrator.
//!
//! Executes a [`MigrationPlan`] against an [`AccessRegistry`]:
//!
//! 1. Validate the whole plan before any external call
//! 2. Execute steps strictly in declared order, checking each step's
//!    prerequisites against the registry first
//! 3. Stop at the first failure, never rolling back applied steps
//! 4. Report applied steps plus the aborting step, if any
//!
//! Teardown is a separate, explicitly invoked operation and is never chained
//! onto `run`.

use super::events::{EventSink, MigrationEvent, TracingSink};
use super::plan::MigrationPlan;
use super::result::{
    AppliedStep, ExecutionState, MigrationResult, StepFailure, TeardownEntry, TeardownReport,
};
use super::step::{MigrationStep, StepAction};
use crate::error::MigrationError;
use crate::registry::{AccessRegistry, ActorContext, Capability, Role, MAX_BASIS_POINTS};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::watch;

/// Requests cancellation of a running plan.
///
/// Cancellation only takes effect between steps; an in-flight registry call
/// always completes.
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

/// Observed by the orchestrator before each step.
#[derive(Debug, Clone)]
pub struct CancelToken {
    rx: watch::Receiver<bool>,
}

/// Create a linked cancel handle and token.
pub fn cancellation() -> (CancelHandle, CancelToken) {
    let (tx, rx) = watch::channel(false);
    (CancelHandle { tx }, CancelToken { rx })
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }
}

impl CancelToken {
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }
}

/// Validate a plan without touching the registry.
///
/// Checks, per step in order:
/// - singleton roles move only through `TransferSingleton`, and only under the
///   timelock actor
/// - transfers and withdrawals name distinct endpoints
/// - a prerequisite (declared, or the withdrawal controller's
///   `PcvController`) is never granted only by a later step
pub fn validate_plan(plan: &MigrationPlan) -> Result<(), StepFailure> {
    let steps: Vec<(usize, &MigrationStep)> = plan.indexed().collect();

    for (position, (index, step)) in steps.iter().enumerate() {
        let fail = |error: MigrationError| StepFailure {
            index: *index,
            step: Some((*step).clone()),
            error,
        };

        check_step_shape(step).map_err(fail)?;

        for required in step.prerequisites() {
            let established = |(_, candidate): &&(usize, &MigrationStep)| {
                candidate.establishes().as_ref() == Some(&required)
            };

            if steps[..position].iter().any(|entry| established(&entry)) {
                continue;
            }

            if let Some((later, _)) = steps[position + 1..].iter().find(|entry| established(entry))
            {
                return Err(fail(MigrationError::Configuration(format!(
                    "step {} requires {}, which is only granted later at step {}",
                    index, required, later
                ))));
            }
        }
    }

    Ok(())
}

fn check_step_shape(step: &MigrationStep) -> Result<(), MigrationError> {
    match &step.action {
        StepAction::Grant { role, .. } | StepAction::Revoke { role, .. } if role.is_singleton() => {
            Err(MigrationError::Configuration(format!(
                "singleton role {} can only be moved with a singleton transfer",
                role
            )))
        }
        StepAction::TransferSingleton { role, from, to } => {
            if !role.is_singleton() {
                return Err(MigrationError::Configuration(format!(
                    "role {} is not a singleton role",
                    role
                )));
            }
            if !step.actor.is_timelock() {
                return Err(MigrationError::Authorization(format!(
                    "transferring singleton role {} requires the timelock actor, got {}",
                    role, step.actor
                )));
            }
            if from == to {
                return Err(MigrationError::Configuration(format!(
                    "singleton transfer of {} from {} to itself",
                    role, from
                )));
            }
            Ok(())
        }
        StepAction::RatioWithdraw { from, to, .. } if from == to => {
            Err(MigrationError::Configuration(format!(
                "withdrawal source and destination are both {}",
                from
            )))
        }
        _ => Ok(()),
    }
}

/// Sequential, fail-fast plan executor.
pub struct Orchestrator<R: AccessRegistry> {
    registry: R,
    sink: Arc<dyn EventSink>,
    cancel: Option<CancelToken>,
    running: AtomicBool,
}

/// Clears the running flag when a run ends, however it ends.
struct RunGuard<'a>(&'a AtomicBool);

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl<R: AccessRegistry> Orchestrator<R> {
    /// Create an orchestrator reporting to `tracing`.
    pub fn new(registry: R) -> Self {
        Self {
            registry,
            sink: Arc::new(TracingSink),
            cancel: None,
            running: AtomicBool::new(false),
        }
    }

    pub fn with_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn with_cancellation(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn registry(&self) -> &R {
        &self.registry
    }

    /// Side-effect-free preparation: static validation only.
    ///
    /// `run` validates again; a successful `setup` is not an ordering
    /// guarantee.
    pub fn setup(&self, plan: &MigrationPlan) -> Result<(), StepFailure> {
        validate_plan(plan)?;
        tracing::debug!(steps = plan.len(), "migration plan prepared");
        Ok(())
    }

    /// Execute `plan` in order, stopping at the first failure.
    pub async fn run(&self, plan: &MigrationPlan) -> MigrationResult {
        let _guard = match self.enter() {
            Ok(guard) => guard,
            Err(error) => {
                let failure = StepFailure {
                    index: plan.base_index(),
                    step: plan.steps().first().cloned(),
                    error,
                };
                return MigrationResult::new(plan.base_index(), Vec::new(), Some(failure));
            }
        };

        if let Err(failure) = validate_plan(plan) {
            self.sink.record(&MigrationEvent::PlanRejected {
                index: failure.index,
                kind: failure.error.kind(),
                reason: failure.error.to_string(),
            });
            return MigrationResult::new(plan.base_index(), Vec::new(), Some(failure));
        }

        self.sink.record(&MigrationEvent::PlanValidated {
            steps: plan.len(),
            fingerprint: plan.fingerprint(),
        });
        tracing::debug!(state = ?ExecutionState::Validated, "state transition");

        let mut applied = Vec::with_capacity(plan.len());
        for (index, step) in plan.indexed() {
            if self.is_cancelled() {
                let failure = StepFailure {
                    index,
                    step: Some(step.clone()),
                    error: MigrationError::Cancelled,
                };
                return self.abort(plan, applied, failure);
            }

            tracing::debug!(state = ?ExecutionState::Executing(index), "state transition");
            self.sink.record(&MigrationEvent::StepStarted {
                index,
                description: step.to_string(),
            });

            match self.execute_step(index, step).await {
                Ok(()) => {
                    self.sink.record(&MigrationEvent::StepSucceeded { index });
                    applied.push(AppliedStep {
                        index,
                        step: step.clone(),
                    });
                }
                Err(error) => {
                    self.sink.record(&MigrationEvent::StepFailed {
                        index,
                        kind: error.kind(),
                        reason: error.to_string(),
                    });
                    let failure = StepFailure {
                        index,
                        step: Some(step.clone()),
                        error,
                    };
                    return self.abort(plan, applied, failure);
                }
            }
        }

        tracing::debug!(state = ?ExecutionState::Completed, "state transition");
        self.sink.record(&MigrationEvent::Completed {
            applied: applied.len(),
        });
        MigrationResult::new(plan.base_index(), applied, None)
    }

    /// Re-check a (typically resumed) plan against current registry state.
    ///
    /// Grant and revoke are idempotent and need no check. Singleton transfers
    /// must still find `from` holding the role, and withdrawals must still
    /// find a controller with `PcvController` and a non-empty source. Effects
    /// of earlier steps in the same plan are taken into account.
    pub async fn revalidate(&self, plan: &MigrationPlan) -> Result<(), StepFailure> {
        validate_plan(plan)?;

        let mut established: HashSet<Capability> = HashSet::new();
        let mut removed: HashSet<Capability> = HashSet::new();

        for (index, step) in plan.indexed() {
            let fail = |error: MigrationError| StepFailure {
                index,
                step: Some(step.clone()),
                error: error.with_context(format!("step {}", index)),
            };

            match &step.action {
                StepAction::Grant { role, holder } => {
                    let capability = Capability::new(*role, holder.clone());
                    removed.remove(&capability);
                    established.insert(capability);
                }
                StepAction::Revoke { role, holder } => {
                    let capability = Capability::new(*role, holder.clone());
                    established.remove(&capability);
                    removed.insert(capability);
                }
                StepAction::TransferSingleton { role, from, to } => {
                    let source = Capability::new(*role, from.clone());
                    let holds = self
                        .holds(&source, &established, &removed)
                        .await
                        .map_err(fail)?;
                    if !holds {
                        return Err(fail(MigrationError::Logic(format!(
                            "{} no longer holds {}; rebuild the plan from a fresh snapshot",
                            from, role
                        ))));
                    }
                    established.remove(&source);
                    removed.insert(source);
                    established.insert(Capability::new(*role, to.clone()));
                }
                StepAction::RatioWithdraw {
                    controller,
                    from,
                    basis_points,
                    ..
                } => {
                    if *basis_points > MAX_BASIS_POINTS {
                        return Err(fail(MigrationError::Logic(format!(
                            "ratio {} exceeds {} basis points",
                            basis_points, MAX_BASIS_POINTS
                        ))));
                    }

                    let authority = Capability::new(Role::PcvController, controller.clone());
                    let authorized = self
                        .holds(&authority, &established, &removed)
                        .await
                        .map_err(fail)?;
                    if !authorized {
                        return Err(fail(MigrationError::Logic(format!(
                            "controller {} does not hold {}",
                            controller,
                            Role::PcvController
                        ))));
                    }

                    let balance = self
                        .registry
                        .balance_of(from)
                        .await
                        .map_err(|e| fail(e.into()))?;
                    if balance == 0 && *basis_points > 0 {
                        return Err(fail(MigrationError::Logic(format!(
                            "{} has no balance left; the withdrawal may already have been applied",
                            from
                        ))));
                    }
                }
            }
        }

        Ok(())
    }

    /// Revoke every capability in `old_holders`.
    ///
    /// Best effort: a failed revoke is reported and the remaining revokes are
    /// still attempted.
    pub async fn teardown(
        &self,
        old_holders: &[Capability],
        actor: &ActorContext,
    ) -> TeardownReport {
        let mut report = TeardownReport::default();

        for capability in old_holders {
            let outcome = if capability.role.is_singleton() {
                Err(MigrationError::Configuration(format!(
                    "singleton role {} cannot be revoked during teardown; transfer it instead",
                    capability.role
                )))
            } else {
                self.registry
                    .revoke(capability.role, &capability.holder, actor)
                    .await
                    .map_err(MigrationError::from)
            };

            match &outcome {
                Ok(()) => self.sink.record(&MigrationEvent::TeardownRevoked {
                    capability: capability.clone(),
                }),
                Err(error) => self.sink.record(&MigrationEvent::TeardownFailed {
                    capability: capability.clone(),
                    kind: error.kind(),
                    reason: error.to_string(),
                }),
            }

            report.entries.push(TeardownEntry {
                capability: capability.clone(),
                outcome,
            });
        }

        report
    }

    fn enter(&self) -> Result<RunGuard<'_>, MigrationError> {
        self.running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| RunGuard(&self.running))
            .map_err(|_| {
                MigrationError::Configuration(
                    "orchestrator is already executing a plan".to_string(),
                )
            })
    }

    fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(|token| token.is_cancelled())
    }

    fn abort(
        &self,
        plan: &MigrationPlan,
        applied: Vec<AppliedStep>,
        failure: StepFailure,
    ) -> MigrationResult {
        tracing::debug!(state = ?ExecutionState::Aborted(failure.index), "state transition");
        self.sink.record(&MigrationEvent::Aborted {
            index: failure.index,
            applied: applied.len(),
        });
        MigrationResult::new(plan.base_index(), applied, Some(failure))
    }

    async fn execute_step(&self, index: usize, step: &MigrationStep) -> Result<(), MigrationError> {
        let context = format!("step {} ({} on {})", index, step.role(), step.target());

        self.check_prerequisites(step)
            .await
            .map_err(|e| e.with_context(&context))?;

        let actor = &step.actor;
        let outcome = match &step.action {
            StepAction::Grant { role, holder } => self.registry.grant(*role, holder, actor).await,
            StepAction::Revoke { role, holder } => {
                self.registry.revoke(*role, holder, actor).await
            }
            StepAction::TransferSingleton { role, from, to } => {
                self.registry
                    .transfer_singleton(*role, from, to, actor)
                    .await
            }
            StepAction::RatioWithdraw {
                controller,
                from,
                to,
                basis_points,
            } => self
                .registry
                .withdraw_ratio(controller, from, to, *basis_points, actor)
                .await
                .map(|moved| tracing::debug!(step = index, %moved, "ratio withdrawal applied")),
        };

        outcome.map_err(|e| MigrationError::from(e).with_context(&context))
    }

    async fn check_prerequisites(&self, step: &MigrationStep) -> Result<(), MigrationError> {
        for required in step.prerequisites() {
            if !self.registry.has_role(required.role, &required.holder).await? {
                return Err(MigrationError::Logic(format!(
                    "{} is required but not held",
                    required
                )));
            }
        }
        Ok(())
    }

    async fn holds(
        &self,
        capability: &Capability,
        established: &HashSet<Capability>,
        removed: &HashSet<Capability>,
    ) -> Result<bool, MigrationError> {
        if established.contains(capability) {
            return Ok(true);
        }
        if removed.contains(capability) {
            return Ok(false);
        }
        Ok(self
            .registry
            .has_role(capability.role, &capability.holder)
            .await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::migration::events::RecordingSink;
    use crate::registry::{Holder, InMemoryRegistry, RegistryError, RegistryResult};

    fn addr(n: u8) -> Holder {
        let mut bytes = [0u8; 20];
        bytes[19] = n;
        Holder::from_bytes(bytes)
    }

    const TIMELOCK: u8 = 0xff;

    fn setup() -> (InMemoryRegistry, Orchestrator<InMemoryRegistry>, RecordingSink) {
        let registry = InMemoryRegistry::new(addr(TIMELOCK));
        let sink = RecordingSink::new();
        let orchestrator =
            Orchestrator::new(registry.clone()).with_sink(Arc::new(sink.clone()));
        (registry, orchestrator, sink)
    }

    #[tokio::test]
    async fn test_minter_handover_scenario() {
        let (registry, orchestrator, _) = setup();
        let old_minter = addr(0xa1);
        let new_minter = addr(0xb2);
        registry.seed_role(Role::Minter, old_minter.clone()).await;

        let plan = MigrationPlan::new()
            .then(MigrationStep::grant(Role::Minter, new_minter.clone()))
            .then(MigrationStep::revoke(Role::Minter, old_minter.clone()));

        let result = orchestrator.run(&plan).await;

        assert!(result.is_completed());
        assert_eq!(result.applied().len(), 2);
        assert!(registry.has_role(Role::Minter, &new_minter).await.unwrap());
        assert!(!registry.has_role(Role::Minter, &old_minter).await.unwrap());
    }

    #[tokio::test]
    async fn test_singleton_transfer_without_timelock_applies_nothing() {
        let (registry, orchestrator, sink) = setup();
        registry.seed_role(Role::Governor, addr(0xa1)).await;

        let plan = MigrationPlan::new().then(
            MigrationStep::transfer_singleton(Role::Governor, addr(0xa1), addr(0xb2), addr(TIMELOCK))
                .with_actor(ActorContext::Default),
        );

        let result = orchestrator.run(&plan).await;

        let failure = result.failure().unwrap();
        assert_eq!(failure.index, 0);
        assert_eq!(failure.error.kind(), ErrorKind::Authorization);
        assert!(result.applied().is_empty());
        assert_eq!(registry.mutating_calls().await, 0);
        assert!(sink.started_steps().is_empty());
        assert!(registry.has_role(Role::Governor, &addr(0xa1)).await.unwrap());
    }

    #[tokio::test]
    async fn test_fail_fast_stops_at_failing_step() {
        let (registry, orchestrator, sink) = setup();
        registry
            .fail_call(2, RegistryError::Network("connection reset".into()))
            .await;

        let plan = MigrationPlan::from_steps(
            (1..=5).map(|n| MigrationStep::grant(Role::Burner, addr(n))).collect(),
        );

        let result = orchestrator.run(&plan).await;

        assert_eq!(result.applied().len(), 2);
        assert_eq!(result.last_applied_index(), Some(1));
        assert_eq!(result.resume_index(), 2);
        let failure = result.failure().unwrap();
        assert_eq!(failure.index, 2);
        assert!(failure.error.is_retryable());
        assert_eq!(sink.started_steps(), vec![0, 1, 2]);
        assert_eq!(registry.mutating_calls().await, 3);
        assert!(!registry.has_role(Role::Burner, &addr(4)).await.unwrap());
    }

    #[tokio::test]
    async fn test_resume_after_network_failure() {
        let (registry, orchestrator, _) = setup();
        registry
            .fail_call(1, RegistryError::Network("timeout".into()))
            .await;

        let plan = MigrationPlan::new()
            .then(MigrationStep::grant(Role::Minter, addr(1)))
            .then(MigrationStep::grant(Role::Minter, addr(2)))
            .then(MigrationStep::revoke(Role::Minter, addr(3)));

        let first = orchestrator.run(&plan).await;
        assert!(!first.is_completed());

        let remaining = plan.resume_from(first.resume_index());
        assert!(orchestrator.revalidate(&remaining).await.is_ok());
        let second = orchestrator.run(&remaining).await;

        assert!(second.is_completed());
        let indices: Vec<usize> = second.applied().iter().map(|a| a.index).collect();
        assert_eq!(indices, vec![1, 2]);
        assert!(registry.has_role(Role::Minter, &addr(2)).await.unwrap());
    }

    #[tokio::test]
    async fn test_grant_ordered_after_dependent_is_rejected() {
        let (registry, orchestrator, _) = setup();
        registry.seed_role(Role::PcvController, addr(9)).await;

        let plan = MigrationPlan::new()
            .then(
                MigrationStep::ratio_withdraw(addr(9), addr(1), addr(2), 10_000)
                    .requiring(Role::Minter, addr(2)),
            )
            .then(MigrationStep::grant(Role::Minter, addr(2)));

        let result = orchestrator.run(&plan).await;

        let failure = result.failure().unwrap();
        assert_eq!(failure.index, 0);
        assert_eq!(failure.error.kind(), ErrorKind::Configuration);
        assert_eq!(registry.mutating_calls().await, 0);
    }

    #[tokio::test]
    async fn test_controller_granted_after_withdraw_is_rejected() {
        let (registry, orchestrator, _) = setup();
        registry.seed_balance(addr(1), 500).await;

        let plan = MigrationPlan::new()
            .then(MigrationStep::ratio_withdraw(addr(9), addr(1), addr(2), 10_000))
            .then(MigrationStep::grant(Role::PcvController, addr(9)));

        let rejected = validate_plan(&plan).unwrap_err();
        assert_eq!(rejected.index, 0);
        assert_eq!(rejected.error.kind(), ErrorKind::Configuration);

        let result = orchestrator.run(&plan).await;
        let failure = result.failure().unwrap();
        assert_eq!(failure.index, 0);
        assert_eq!(failure.error.kind(), ErrorKind::Configuration);
        assert_eq!(registry.mutating_calls().await, 0);
        assert_eq!(registry.balance_of(&addr(1)).await.unwrap(), 500);
    }

    #[tokio::test]
    async fn test_controller_without_role_fails_with_logic_error() {
        let (registry, orchestrator, _) = setup();
        registry.seed_balance(addr(1), 500).await;

        let plan =
            MigrationPlan::new().then(MigrationStep::ratio_withdraw(addr(9), addr(1), addr(2), 10_000));

        let result = orchestrator.run(&plan).await;

        let failure = result.failure().unwrap();
        assert_eq!(failure.index, 0);
        assert_eq!(failure.error.kind(), ErrorKind::Logic);
        assert_eq!(registry.mutating_calls().await, 0);
        assert_eq!(registry.balance_of(&addr(1)).await.unwrap(), 500);
    }

    #[tokio::test]
    async fn test_missing_prerequisite_fails_with_logic_error() {
        let (registry, orchestrator, _) = setup();
        registry.seed_role(Role::PcvController, addr(9)).await;
        registry.seed_balance(addr(1), 500).await;

        let plan = MigrationPlan::new().then(
            MigrationStep::ratio_withdraw(addr(9), addr(1), addr(2), 10_000)
                .requiring(Role::Minter, addr(2)),
        );

        let result = orchestrator.run(&plan).await;

        let failure = result.failure().unwrap();
        assert_eq!(failure.error.kind(), ErrorKind::Logic);
        assert!(failure.error.to_string().contains("step 0"));
        assert_eq!(registry.balance_of(&addr(1)).await.unwrap(), 500);
    }

    #[tokio::test]
    async fn test_grant_then_withdraw_moves_balance() {
        let (registry, orchestrator, _) = setup();
        registry.seed_role(Role::PcvController, addr(9)).await;
        registry.seed_balance(addr(1), 500).await;

        let plan = MigrationPlan::new()
            .then(MigrationStep::grant(Role::Minter, addr(2)))
            .then(
                MigrationStep::ratio_withdraw(addr(9), addr(1), addr(2), 10_000)
                    .requiring(Role::Minter, addr(2)),
            );

        assert!(orchestrator.run(&plan).await.is_completed());
        assert_eq!(registry.balance_of(&addr(2)).await.unwrap(), 500);
        assert_eq!(registry.balance_of(&addr(1)).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_stale_singleton_transfer_is_logic_error() {
        let (registry, orchestrator, _) = setup();
        registry.seed_role(Role::Governor, addr(3)).await;

        let plan = MigrationPlan::new().then(MigrationStep::transfer_singleton(
            Role::Governor,
            addr(1),
            addr(2),
            addr(TIMELOCK),
        ));

        let result = orchestrator.run(&plan).await;
        let failure = result.failure().unwrap();
        assert_eq!(failure.error.kind(), ErrorKind::Logic);
        assert!(registry.has_role(Role::Governor, &addr(3)).await.unwrap());
    }

    #[tokio::test]
    async fn test_singleton_grant_rejected_in_validation() {
        let (registry, orchestrator, _) = setup();
        let plan = MigrationPlan::new()
            .then(MigrationStep::grant(Role::Minter, addr(1)))
            .then(MigrationStep::grant(Role::Governor, addr(2)));

        let result = orchestrator.run(&plan).await;
        let failure = result.failure().unwrap();
        assert_eq!(failure.index, 1);
        assert_eq!(failure.error.kind(), ErrorKind::Configuration);
        assert_eq!(registry.mutating_calls().await, 0);
    }

    #[tokio::test]
    async fn test_cancellation_truncates_plan() {
        let registry = InMemoryRegistry::new(addr(TIMELOCK));
        let (handle, token) = cancellation();
        let orchestrator = Orchestrator::new(registry.clone()).with_cancellation(token);
        handle.cancel();

        let plan = MigrationPlan::new().then(MigrationStep::grant(Role::Minter, addr(1)));
        let result = orchestrator.run(&plan).await;

        assert_eq!(result.failure().unwrap().error, MigrationError::Cancelled);
        assert_eq!(registry.mutating_calls().await, 0);
    }

    #[tokio::test]
    async fn test_revalidate_detects_applied_transfer() {
        let (registry, orchestrator, _) = setup();
        registry.seed_role(Role::Governor, addr(1)).await;

        let plan = MigrationPlan::new().then(MigrationStep::transfer_singleton(
            Role::Governor,
            addr(1),
            addr(2),
            addr(TIMELOCK),
        ));

        assert!(orchestrator.revalidate(&plan).await.is_ok());
        assert!(orchestrator.run(&plan).await.is_completed());

        let stale = orchestrator.revalidate(&plan).await.unwrap_err();
        assert_eq!(stale.error.kind(), ErrorKind::Logic);
    }

    #[tokio::test]
    async fn test_revalidate_accounts_for_earlier_steps() {
        let (registry, orchestrator, _) = setup();
        registry.seed_balance(addr(1), 100).await;

        let plan = MigrationPlan::new()
            .then(MigrationStep::grant(Role::PcvController, addr(9)))
            .then(MigrationStep::ratio_withdraw(addr(9), addr(1), addr(2), 10_000));
        assert!(orchestrator.revalidate(&plan).await.is_ok());

        let drained = MigrationPlan::new()
            .then(MigrationStep::grant(Role::PcvController, addr(9)))
            .then(MigrationStep::ratio_withdraw(addr(9), addr(5), addr(2), 10_000));
        let failure = orchestrator.revalidate(&drained).await.unwrap_err();
        assert_eq!(failure.index, 1);
        assert_eq!(failure.error.kind(), ErrorKind::Logic);
    }

    #[tokio::test]
    async fn test_teardown_is_best_effort() {
        let (registry, orchestrator, _) = setup();
        registry.seed_role(Role::Minter, addr(1)).await;
        registry.seed_role(Role::Burner, addr(1)).await;
        registry.seed_role(Role::PcvController, addr(2)).await;
        registry
            .fail_call(0, RegistryError::Network("reset".into()))
            .await;

        let old = vec![
            Capability::new(Role::Minter, addr(1)),
            Capability::new(Role::Burner, addr(1)),
            Capability::new(Role::PcvController, addr(2)),
        ];
        let report = orchestrator.teardown(&old, &ActorContext::Default).await;

        assert_eq!(report.entries.len(), 3);
        assert_eq!(report.failures().count(), 1);
        assert!(registry.has_role(Role::Minter, &addr(1)).await.unwrap());
        assert!(!registry.has_role(Role::Burner, &addr(1)).await.unwrap());
        assert!(!registry.has_role(Role::PcvController, &addr(2)).await.unwrap());
    }

    #[tokio::test]
    async fn test_teardown_refuses_singleton() {
        let (registry, orchestrator, _) = setup();
        registry.seed_role(Role::Governor, addr(1)).await;

        let report = orchestrator
            .teardown(
                &[Capability::new(Role::Governor, addr(1))],
                &ActorContext::Timelock(addr(TIMELOCK)),
            )
            .await;

        assert!(!report.is_clean());
        assert!(registry.has_role(Role::Governor, &addr(1)).await.unwrap());
    }

    /// Registry whose grants park until released.
    struct GatedRegistry {
        inner: InMemoryRegistry,
        entered: Arc<tokio::sync::Notify>,
        release: Arc<tokio::sync::Notify>,
    }

    #[async_trait::async_trait]
    impl AccessRegistry for GatedRegistry {
        async fn grant(&self, role: Role, holder: &Holder, actor: &ActorContext) -> RegistryResult<()> {
            self.entered.notify_one();
            self.release.notified().await;
            self.inner.grant(role, holder, actor).await
        }

        async fn revoke(&self, role: Role, holder: &Holder, actor: &ActorContext) -> RegistryResult<()> {
            self.inner.revoke(role, holder, actor).await
        }

        async fn transfer_singleton(
            &self,
            role: Role,
            from: &Holder,
            to: &Holder,
            actor: &ActorContext,
        ) -> RegistryResult<()> {
            self.inner.transfer_singleton(role, from, to, actor).await
        }

        async fn has_role(&self, role: Role, holder: &Holder) -> RegistryResult<bool> {
            self.inner.has_role(role, holder).await
        }

        async fn withdraw_ratio(
            &self,
            controller: &Holder,
            from: &Holder,
            to: &Holder,
            basis_points: u16,
            actor: &ActorContext,
        ) -> RegistryResult<u128> {
            self.inner
                .withdraw_ratio(controller, from, to, basis_points, actor)
                .await
        }

        async fn balance_of(&self, holder: &Holder) -> RegistryResult<u128> {
            self.inner.balance_of(holder).await
        }
    }

    #[tokio::test]
    async fn test_concurrent_run_is_rejected() {
        let inner = InMemoryRegistry::new(addr(TIMELOCK));
        let entered = Arc::new(tokio::sync::Notify::new());
        let release = Arc::new(tokio::sync::Notify::new());
        let orchestrator = Orchestrator::new(GatedRegistry {
            inner: inner.clone(),
            entered: entered.clone(),
            release: release.clone(),
        });
        let plan = MigrationPlan::new().then(MigrationStep::grant(Role::Minter, addr(1)));

        let first = orchestrator.run(&plan);
        let second = async {
            entered.notified().await;
            let rejected = orchestrator.run(&plan).await;
            release.notify_one();
            rejected
        };
        let (first, second) = tokio::join!(first, second);

        assert!(first.is_completed());
        let failure = second.failure().unwrap();
        assert_eq!(failure.error.kind(), ErrorKind::Configuration);
        assert!(second.applied().is_empty());
        assert_eq!(inner.mutating_calls().await, 1);
    }

    #[tokio::test]
    async fn test_rejected_reentry_on_empty_plan_is_not_completed() {
        let (registry, orchestrator, _) = setup();
        orchestrator.running.store(true, Ordering::Release);

        let result = orchestrator.run(&MigrationPlan::new()).await;

        assert!(!result.is_completed());
        assert_eq!(result.state(), ExecutionState::Aborted(0));
        let failure = result.failure().unwrap();
        assert_eq!(failure.step, None);
        assert_eq!(failure.error.kind(), ErrorKind::Configuration);
        assert!(failure.to_string().starts_with("step 0 failed:"));
        assert_eq!(registry.mutating_calls().await, 0);
    }

    #[test]
    fn test_setup_is_pure_validation() {
        let registry = InMemoryRegistry::new(addr(TIMELOCK));
        let orchestrator = Orchestrator::new(registry);
        let plan = MigrationPlan::new().then(MigrationStep::revoke(Role::Governor, addr(1)));
        assert!(orchestrator.setup(&plan).is_err());
        assert!(orchestrator.setup(&MigrationPlan::new()).is_ok());
    }
}
