use super::plan::print_plan;
use super::workspace::Workspace;
use role_migrator::proposals::{Governance, Staging};
use role_migrator::{Orchestrator, ProposalCatalog};

/// Execute a proposal's migration plan
///
/// ## Staging
///
/// The catalog entry decides how the run is staged:
/// - `deploy: true` expects the replacement components to have been deployed
///   by external tooling; their addresses come from the address book
/// - `skip_dao: false` wraps the run in a simulated governance vote
///
/// ## Failure Handling
///
/// The first failing step aborts the run. Steps already applied are real and
/// are saved to the snapshot (unless `--dry-run`). Resume with
/// `--resume-from <index>` once the cause is fixed. Every run, resumed or
/// not, re-checks transfers and withdrawals against the registry before
/// anything is sent.
pub async fn execute(
    proposal_id: String,
    config_path: Option<String>,
    dry_run: bool,
    resume_from: Option<usize>,
) -> Result<(), Box<dyn std::error::Error>> {
    let workspace = Workspace::load(config_path)?;
    let catalog = ProposalCatalog::builtin();
    let entry = catalog.get(&proposal_id)?;

    println!("Config: {}", workspace.config_path.display());
    println!("Registry: {}", workspace.config.paths.registry.display());
    match entry.staging() {
        Staging::DeployThenRun => {
            println!("Staging: deploy then run (components deployed by external tooling)")
        }
        Staging::AgainstLiveState => println!("Staging: against live state"),
    }
    if dry_run {
        println!("Mode: dry run (snapshot will not be saved)");
    }
    println!();

    let full_plan = entry
        .proposal
        .run(&workspace.addresses, &workspace.old_addresses)?;
    let plan = match resume_from {
        Some(index) => full_plan.resume_from(index),
        None => full_plan,
    };
    print_plan(&proposal_id, &plan);

    let registry = workspace.open_registry()?;
    let orchestrator = Orchestrator::new(registry.clone());
    orchestrator.setup(&plan)?;

    // Transfers and withdrawals are re-checked against the snapshot on every
    // run, so a rerun after a partial abort cannot repeat them silently.
    orchestrator.revalidate(&plan).await.map_err(|failure| {
        format!(
            "registry state does not match the plan: {}; check the snapshot or resume past the applied steps",
            failure
        )
    })?;

    match entry.governance() {
        Governance::SimulatedVote => tracing::info!(
            proposal = %proposal_id,
            total_value = %entry.total_value,
            "simulating governance vote before execution"
        ),
        Governance::Direct => tracing::info!(
            proposal = %proposal_id,
            "executing directly, governance vote skipped"
        ),
    }

    let result = orchestrator.run(&plan).await;

    if !dry_run {
        workspace.save_registry(&registry).await?;
    }

    for applied in result.applied() {
        println!("  ✅ [{:>2}] {}", applied.index, applied.step);
    }

    match result.failure() {
        None => {
            println!();
            println!("Migration {}", result);
            Ok(())
        }
        Some(failure) => {
            match &failure.step {
                Some(step) => println!("  ❌ [{:>2}] {}", failure.index, step),
                None => println!("  ❌ [{:>2}] run refused", failure.index),
            }
            println!("        {}", failure.error);
            println!();
            println!("Migration {}", result);
            if failure.error.is_retryable() {
                println!("The failure looks transient; retrying is safe for grant/revoke steps.");
            }
            Err(format!(
                "migration aborted at step {}; fix the cause and rerun with --resume-from {}",
                failure.index,
                result.resume_index()
            )
            .into())
        }
    }
}
