use role_migrator::ProposalCatalog;

/// List catalog entries
pub fn execute() {
    let catalog = ProposalCatalog::builtin();

    println!(
        "{:<12} {:<16} {:<7} {:<9} {}",
        "ID", "PROPOSAL", "DEPLOY", "SKIP_DAO", "VALUE"
    );
    for (id, config) in catalog.iter() {
        println!(
            "{:<12} {:<16} {:<7} {:<9} {}",
            id,
            config.proposal.name(),
            config.deploy,
            config.skip_dao,
            config.total_value
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_execute() {
        // Listing should not panic
        execute();
    }
}
