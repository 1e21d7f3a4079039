//! Show what the next tick would do, without doing it

use super::{build_backend, BackendKind};
use crate::util;
use anyhow::{Context, Result};
use chrono::Utc;
use cli_lib::{Config, Daemon};
use owo_colors::OwoColorize;
use scheduler::schedule::next_due_at;

pub async fn run(config: Config, backend: BackendKind, json: bool) -> Result<()> {
    let backend = build_backend(backend, &config);
    let daemon = Daemon::new(config, backend);
    let now = Utc::now();

    let mut plans = Vec::new();
    let mut failures = 0;
    for policy in daemon.config().enabled_datasets() {
        match daemon.plan_dataset(policy, now).await {
            Ok(plan) => plans.push((policy, plan)),
            Err(e) => {
                eprintln!("{} {}", "✗".red(), e);
                failures += 1;
            }
        }
    }

    if json {
        let plans: Vec<_> = plans.iter().map(|(_, plan)| plan).collect();
        let rendered = serde_json::to_string_pretty(&plans).context("Failed to render plans")?;
        println!("{}", rendered);
    } else {
        println!("{} at {}", "Plan".bold(), util::format_absolute_time(now));
        for (policy, plan) in &plans {
            println!("\n{} ({} managed snapshots)", plan.dataset.yellow(), plan.managed);

            match plan.last_snapshot_at {
                Some(last) => println!(
                    "  last snapshot: {}",
                    util::format_relative_time(last, now)
                ),
                None => println!("  last snapshot: {}", "none".dimmed()),
            }

            if plan.actions.create {
                println!(
                    "  {} {}@{}",
                    "create".green(),
                    plan.dataset,
                    plan.snapshot_name(&daemon.config().snapshot_prefix)
                );
            } else if let Some(next) = next_due_at(policy, plan.last_snapshot_at) {
                println!("  next snapshot {}", util::format_relative_time(next, now).dimmed());
            }

            for snapshot in &plan.actions.destroy {
                println!(
                    "  {} {} {}",
                    "destroy".red(),
                    snapshot.full_name,
                    format!("(age {})", snapshot.age(now)).dimmed()
                );
            }
            for ignored in &plan.ignored {
                println!("  {} {}", "ignored".yellow(), ignored);
            }
        }
    }

    if failures > 0 {
        anyhow::bail!("{} dataset(s) could not be evaluated", failures);
    }
    Ok(())
}
