use clap::{Parser, Subcommand};
use std::fs::OpenOptions;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

pub mod catalog;
pub mod config;
pub mod init;
pub mod plan;
pub mod run;
pub mod teardown;
pub mod version;
pub mod workspace;

#[derive(Parser)]
#[command(name = "role-migrator")]
#[command(author = "Role Migrator Project")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Operator CLI for sequenced role migrations", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a default operator configuration
    Init {
        /// Directory holding address books and the registry snapshot
        #[arg(long)]
        data_dir: Option<String>,

        /// Path to config file (default: <data-dir>/config.toml)
        #[arg(long)]
        config: Option<String>,

        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },

    /// Show the migration plan a proposal would execute
    Plan {
        /// Proposal id from the catalog
        proposal: String,

        /// Path to config file
        #[arg(long)]
        config: Option<String>,

        /// Print the plan as JSON
        #[arg(long)]
        json: bool,
    },

    /// Execute a proposal's migration plan against the registry
    Run {
        /// Proposal id from the catalog
        proposal: String,

        /// Path to config file
        #[arg(long)]
        config: Option<String>,

        /// Execute without saving the registry snapshot
        #[arg(long)]
        dry_run: bool,

        /// Resume an aborted run from this step index
        #[arg(long)]
        resume_from: Option<usize>,
    },

    /// Revoke the capabilities still held by retired components
    Teardown {
        /// Proposal id from the catalog
        proposal: String,

        /// Path to config file
        #[arg(long)]
        config: Option<String>,

        /// Apply the revokes (without this flag, only list them)
        #[arg(long, short)]
        yes: bool,
    },

    /// List catalog entries
    Catalog,

    /// Display version information
    Version,
}

pub async fn execute(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Init {
            data_dir,
            config,
            force,
        } => init::execute(data_dir, config, force),
        Commands::Plan {
            proposal,
            config,
            json,
        } => plan::execute(proposal, config, json),
        Commands::Run {
            proposal,
            config,
            dry_run,
            resume_from,
        } => run::execute(proposal, config, dry_run, resume_from).await,
        Commands::Teardown {
            proposal,
            config,
            yes,
        } => teardown::execute(proposal, config, yes).await,
        Commands::Catalog => {
            catalog::execute();
            Ok(())
        }
        Commands::Version => {
            version::execute();
            Ok(())
        }
    }
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins over the configured level. Safe to call more than once:
/// returns `false` and keeps the existing subscriber if one is installed.
pub fn init_logging(logging: &config::LoggingConfig) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(logging.level.as_str()));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);

    let installed = match &logging.file {
        Some(path) => match OpenOptions::new().create(true).append(true).open(path) {
            Ok(file) => builder
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init(),
            Err(e) => {
                eprintln!(
                    "Warning: cannot open log file '{}': {}; logging to stderr",
                    path.display(),
                    e
                );
                builder.with_writer(std::io::stderr).try_init()
            }
        },
        None => builder.with_writer(std::io::stderr).try_init(),
    };

    match installed {
        Ok(()) => true,
        Err(e) => {
            tracing::debug!(error = %e, "tracing subscriber already installed");
            false
        }
    }
}
