use super::workspace::Workspace;
use role_migrator::migration::MigrationPlan;
use role_migrator::ProposalCatalog;

/// Show the migration plan a proposal would execute
///
/// Builds the plan from the configured address books and validates it
/// statically. Nothing is sent to the registry.
pub fn execute(
    proposal_id: String,
    config_path: Option<String>,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let workspace = Workspace::load(config_path)?;
    let catalog = ProposalCatalog::builtin();
    let entry = catalog.get(&proposal_id)?;

    let plan = entry
        .proposal
        .run(&workspace.addresses, &workspace.old_addresses)?;
    let validation = role_migrator::migration::validate_plan(&plan);

    if json {
        println!("{}", serde_json::to_string_pretty(&plan)?);
    } else {
        print_plan(&proposal_id, &plan);
        match &validation {
            Ok(()) => println!("Validation: ok"),
            Err(failure) => println!("Validation: FAILED at step {}: {}", failure.index, failure.error),
        }
    }

    validation.map_err(Into::into)
}

pub fn print_plan(proposal_id: &str, plan: &MigrationPlan) {
    println!("Proposal: {}", proposal_id);
    println!("Steps: {}", plan.len());
    println!("Fingerprint: {}", plan.fingerprint());
    println!();

    for (index, step) in plan.indexed() {
        println!("  [{:>2}] {}", index, step);
        if let Some(label) = &step.label {
            println!("       {}", label);
        }
        if step.actor.is_timelock() {
            println!("       actor: {}", step.actor);
        }
        for required in &step.requires {
            println!("       requires: {}", required);
        }
    }
    println!();
}
