use super::config::{default_data_dir, OperatorConfig};
use std::path::PathBuf;

/// Write a default operator configuration
///
/// The config lands at `--config` if given, otherwise at
/// `<data-dir>/config.toml`. Address books and the registry snapshot default
/// to the same directory.
pub fn execute(
    data_dir: Option<String>,
    config_path: Option<String>,
    force: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let data_dir = data_dir.map(PathBuf::from).unwrap_or_else(default_data_dir);
    let config_path = config_path
        .map(PathBuf::from)
        .unwrap_or_else(|| data_dir.join("config.toml"));

    if config_path.exists() && !force {
        return Err(format!(
            "Config file '{}' already exists (use --force to overwrite)",
            config_path.display()
        )
        .into());
    }

    OperatorConfig::create_default(&config_path, &data_dir)?;

    println!("Created: {}", config_path.display());
    println!();
    println!("Next steps:");
    println!(
        "  1. Write the replacement address book to {}",
        data_dir.join("addresses.toml").display()
    );
    println!(
        "  2. Write the retiring address book to {}",
        data_dir.join("old-addresses.toml").display()
    );
    println!("  3. Review a plan with `role-migrator plan <proposal>`");

    Ok(())
}
