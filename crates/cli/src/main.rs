//! snapkeep CLI - automatic snapshot scheduling and retention

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use cli_lib::config::DEFAULT_CONFIG_PATH;
use cli_lib::{logging, Config};
use std::path::PathBuf;

mod cmd;
mod util;

use cmd::BackendKind;

/// snapkeep - Create snapshots on schedule and expire them by age
#[derive(Parser)]
#[command(name = "snapkeep")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file
    #[arg(short, long, global = true, env = "SNAPKEEP_CONFIG", default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Log decisions without creating or destroying snapshots
    #[arg(short, long, global = true)]
    dry_run: bool,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the scheduler in the foreground
    Run {
        /// Run a single tick and exit
        #[arg(long)]
        once: bool,
        /// Snapshot backend
        #[arg(long, value_enum, default_value = "zfs")]
        backend: BackendKind,
    },
    /// Validate the configuration and print it
    Check {
        /// Also verify the configured datasets exist on this backend
        #[arg(long, value_enum)]
        backend: Option<BackendKind>,
    },
    /// Show what the next tick would create and destroy
    Plan {
        /// Snapshot backend
        #[arg(long, value_enum, default_value = "zfs")]
        backend: BackendKind,
        /// Print plans as JSON
        #[arg(long)]
        json: bool,
    },
    /// Configuration helpers
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Print an example configuration
    Example,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Needs no configuration
    if matches!(cli.command, Commands::Config(ConfigCommands::Example)) {
        return cmd::config::run_example().await;
    }

    let loaded = Config::load(&cli.config);
    let log_dir = loaded.as_ref().ok().and_then(|c| c.log_dir.clone());
    let _log_guard = logging::init(cli.verbose, log_dir.as_deref());

    let mut config = loaded
        .with_context(|| format!("Invalid configuration {}", cli.config.display()))?;
    if cli.dry_run {
        config.dry_run = true;
    }

    match cli.command {
        Commands::Run { once, backend } => cmd::run::run(config, backend, once).await,
        Commands::Check { backend } => cmd::check::run(&config, &cli.config, backend).await,
        Commands::Plan { backend, json } => cmd::plan::run(config, backend, json).await,
        Commands::Config(ConfigCommands::Example) => cmd::config::run_example().await,
    }
}
