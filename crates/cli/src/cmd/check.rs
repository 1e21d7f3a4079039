//! Validate the configuration and show what it describes

use super::{build_backend, BackendKind};
use anyhow::Result;
use cli_lib::locks::DaemonLock;
use cli_lib::{Config, Daemon};
use owo_colors::OwoColorize;
use std::path::Path;

pub async fn run(config: &Config, config_path: &Path, backend: Option<BackendKind>) -> Result<()> {
    println!("{} {}", "✓".green(), "Configuration is valid".bold());
    println!("{}: {}\n", "Location".dimmed(), config_path.display().dimmed());

    println!("  {} = {}", "snapshot_prefix".cyan(), config.snapshot_prefix);
    println!("  {} = {}", "check_interval".cyan(), config.check_interval);
    println!("  {} = {}", "dry_run".cyan(), config.dry_run);
    println!("  {} = {}", "zfs_binary".cyan(), config.zfs_binary.display());

    if let Some(lock_dir) = &config.lock_dir {
        match DaemonLock::holder(lock_dir) {
            Some(holder) => println!(
                "\nDaemon: {} (pid {}, since {})",
                "running".green(),
                holder.pid,
                crate::util::format_absolute_time(holder.started_at)
            ),
            None => println!("\nDaemon: {}", "not running".yellow()),
        }
    }

    println!("\n{} ({})", "Datasets".bold(), config.datasets.len());
    for dataset in &config.datasets {
        let state = if dataset.enabled() {
            "enabled".green().to_string()
        } else {
            "disabled".dimmed().to_string()
        };
        println!("\n  {} [{}]", dataset.name().yellow(), state);
        println!("    frequency: {}", dataset.frequency());
        println!("    recursive: {}", dataset.recursive());

        if dataset.retention().is_empty() {
            println!("    retention: {}", "keep forever".dimmed());
        } else {
            println!("    retention:");
            for tier in dataset.retention().tiers() {
                println!(
                    "      from age {} keep {} {}",
                    tier.age_threshold,
                    tier.keep_duration,
                    format!("(expires after {})", tier.expiry_age()).dimmed()
                );
            }
        }
    }

    if let Some(kind) = backend {
        let daemon = Daemon::new(config.clone(), build_backend(kind, config));
        let missing = daemon.verify_datasets().await;

        println!("\n{}", "Datasets on the backend".bold());
        for dataset in config.enabled_datasets() {
            if missing.iter().any(|name| name == dataset.name()) {
                println!("  {} {} {}", "✗".red(), dataset.name(), "does not exist".red());
            } else {
                println!("  {} {}", "✓".green(), dataset.name());
            }
        }
        if !missing.is_empty() {
            anyhow::bail!("{} configured dataset(s) do not exist", missing.len());
        }
    }

    Ok(())
}
