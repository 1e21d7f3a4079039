//! Run the scheduler in the foreground

use super::{build_backend, BackendKind};
use anyhow::Result;
use chrono::Utc;
use cli_lib::locks::DaemonLock;
use cli_lib::{Config, Daemon};
use std::sync::Arc;
use tracing::{error, info, warn};

pub async fn run(config: Config, backend: BackendKind, once: bool) -> Result<()> {
    let _lock = match &config.lock_dir {
        Some(dir) => {
            let lock = DaemonLock::acquire(dir)?;
            info!("Holding lock {}", lock.path().display());
            Some(lock)
        }
        None => None,
    };

    log_configuration(&config);

    let backend = build_backend(backend, &config);
    let daemon = Arc::new(Daemon::new(config, backend));

    let missing = daemon.verify_datasets().await;
    if !missing.is_empty() {
        warn!(
            "{} configured dataset(s) missing, continuing: {}",
            missing.len(),
            missing.join(", ")
        );
    }

    if once {
        let results = daemon.tick_at(Utc::now()).await;
        let failed = results.iter().filter(|(_, result)| result.is_err()).count();
        info!(
            "Tick complete: {} datasets, {} failed",
            results.len(),
            failed
        );
        if failed > 0 {
            anyhow::bail!("{} dataset(s) failed", failed);
        }
        return Ok(());
    }

    daemon.run(shutdown_signal()).await
}

fn log_configuration(config: &Config) {
    info!(
        "snapkeep {} starting: {} datasets, prefix {}, check interval {}, dry run: {}",
        env!("CARGO_PKG_VERSION"),
        config.datasets.len(),
        config.snapshot_prefix,
        config.check_interval,
        config.dry_run
    );
    for dataset in config.enabled_datasets() {
        info!(
            "  {}: frequency {}, recursive {}, {} retention tiers",
            dataset.name(),
            dataset.frequency(),
            dataset.recursive(),
            dataset.retention().tiers().len()
        );
        for tier in dataset.retention().tiers() {
            info!("    age {} -> keep {}", tier.age_threshold, tier.keep_duration);
        }
    }
}

/// Resolves on SIGINT or SIGTERM
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match (
            signal(SignalKind::interrupt()),
            signal(SignalKind::terminate()),
        ) {
            (Ok(mut sigint), Ok(mut sigterm)) => {
                tokio::select! {
                    _ = sigint.recv() => info!("Received SIGINT"),
                    _ = sigterm.recv() => info!("Received SIGTERM"),
                }
                return;
            }
            (Err(e), _) | (_, Err(e)) => {
                error!("Failed to install signal handlers: {}; falling back to Ctrl+C", e);
            }
        }
    }

    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Received Ctrl+C");
}
