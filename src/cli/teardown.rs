use super::workspace::Workspace;
use role_migrator::{ActorContext, Orchestrator, ProposalCatalog};

/// Revoke capabilities still held by retired components
///
/// Teardown is never chained onto `run`: between upgrade and decommission the
/// registry may have been governed by a separate decision. Without `--yes`
/// this only lists what would be revoked.
pub async fn execute(
    proposal_id: String,
    config_path: Option<String>,
    yes: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let workspace = Workspace::load(config_path)?;
    let catalog = ProposalCatalog::builtin();
    let entry = catalog.get(&proposal_id)?;

    let capabilities = entry
        .proposal
        .teardown(&workspace.addresses, &workspace.old_addresses)?;

    println!("Teardown for {}: {} capability(ies)", proposal_id, capabilities.len());
    for capability in &capabilities {
        println!("  - {}", capability);
    }
    println!();

    if !yes {
        println!("Nothing revoked. Re-run with --yes to apply.");
        return Ok(());
    }

    let registry = workspace.open_registry()?;
    let orchestrator = Orchestrator::new(registry.clone());
    let report = orchestrator
        .teardown(&capabilities, &ActorContext::Default)
        .await;
    workspace.save_registry(&registry).await?;

    for entry in &report.entries {
        match &entry.outcome {
            Ok(()) => println!("  ✅ revoked {}", entry.capability),
            Err(e) => println!("  ❌ {}: {}", entry.capability, e),
        }
    }

    let failed = report.failures().count();
    if failed == 0 {
        println!();
        println!("Teardown complete.");
        Ok(())
    } else {
        Err(format!("{} teardown step(s) failed", failed).into())
    }
}
