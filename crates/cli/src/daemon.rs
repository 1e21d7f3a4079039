//! Tick driver
//!
//! Every `check_interval` the daemon lists, evaluates and executes each
//! enabled dataset on its own task. A dataset whose previous tick is still
//! executing is skipped, a dataset that fails is logged and retried on the
//! next tick, and neither affects the other datasets.

use crate::config::Config;
use crate::executor::{ExecutionReport, Executor};
use anyhow::Result;
use backend::{BackendError, SnapshotBackend};
use chrono::Utc;
use dashmap::DashSet;
use scheduler::{evaluate, Plan};
use sk_core::{DatasetPolicy, Timestamp};
use std::future::Future;
use std::sync::Arc;
use tokio::task::JoinSet;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};

/// A dataset could not be evaluated this tick
#[derive(Debug, thiserror::Error)]
#[error("evaluation of dataset {dataset} failed: {source}")]
pub struct DatasetEvaluationFailure {
    pub dataset: String,
    #[source]
    pub source: BackendError,
}

/// Result of one dataset's tick
#[derive(Debug)]
pub struct DatasetOutcome {
    pub plan: Plan,
    pub report: ExecutionReport,
}

/// Per-dataset results of one tick, in configuration order
pub type TickResults = Vec<(String, Result<DatasetOutcome, DatasetEvaluationFailure>)>;

/// Names of datasets whose tick is still executing
#[derive(Default, Clone)]
struct InFlight {
    datasets: Arc<DashSet<String>>,
}

/// Held while a dataset's tick executes; releases the dataset on drop
struct InFlightGuard {
    datasets: Arc<DashSet<String>>,
    name: String,
}

impl InFlight {
    fn try_acquire(&self, name: &str) -> Option<InFlightGuard> {
        self.datasets.insert(name.to_string()).then(|| InFlightGuard {
            datasets: self.datasets.clone(),
            name: name.to_string(),
        })
    }

    fn len(&self) -> usize {
        self.datasets.len()
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.datasets.remove(&self.name);
    }
}

/// The snapshot daemon
pub struct Daemon {
    config: Arc<Config>,
    backend: Arc<dyn SnapshotBackend>,
    executor: Executor,
    in_flight: InFlight,
}

impl Daemon {
    pub fn new(config: Config, backend: Arc<dyn SnapshotBackend>) -> Self {
        let executor = Executor::new(backend.clone(), config.snapshot_prefix.clone(), config.dry_run);
        Self {
            config: Arc::new(config),
            backend,
            executor,
            in_flight: InFlight::default(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Check that every enabled dataset exists, logging each one that does not
    ///
    /// Returns the missing names. A missing dataset is not fatal: its ticks keep
    /// failing until it appears.
    pub async fn verify_datasets(&self) -> Vec<String> {
        let mut missing = Vec::new();
        for policy in self.config.enabled_datasets() {
            match self.backend.dataset_exists(policy.name()).await {
                Ok(true) => debug!("Dataset {} exists", policy.name()),
                Ok(false) => {
                    error!("Dataset {} does not exist", policy.name());
                    missing.push(policy.name().to_string());
                }
                Err(e) => warn!("Could not verify dataset {}: {}", policy.name(), e),
            }
        }
        missing
    }

    /// List the dataset's snapshots and evaluate them at `now`, without executing
    pub async fn plan_dataset(
        &self,
        policy: &DatasetPolicy,
        now: Timestamp,
    ) -> Result<Plan, DatasetEvaluationFailure> {
        let observed = self
            .backend
            .list_snapshots(policy.name(), policy.recursive())
            .await
            .map_err(|source| DatasetEvaluationFailure {
                dataset: policy.name().to_string(),
                source,
            })?;

        let plan = evaluate(policy, &self.config.snapshot_prefix, &observed, now);
        for ignored in &plan.ignored {
            warn!("Ignoring snapshot: {}", ignored);
        }
        Ok(plan)
    }

    /// Plan and execute one dataset
    pub async fn process_dataset(
        &self,
        policy: &DatasetPolicy,
        now: Timestamp,
    ) -> Result<DatasetOutcome, DatasetEvaluationFailure> {
        let plan = self.plan_dataset(policy, now).await?;

        if plan.actions.is_empty() {
            debug!(
                "Dataset {} needs nothing (last snapshot: {:?})",
                policy.name(),
                plan.last_snapshot_at
            );
        } else {
            info!(
                "Dataset {}: create={} destroy={} (frequency={}, last snapshot: {:?})",
                policy.name(),
                plan.actions.create,
                plan.actions.destroy.len(),
                policy.frequency(),
                plan.last_snapshot_at
            );
        }

        let report = self.executor.apply(&plan).await;
        Ok(DatasetOutcome { plan, report })
    }

    /// Run a single tick at `now` over every enabled dataset and wait for it
    ///
    /// Datasets are processed concurrently; a failure is reported in its slot
    /// and does not affect the others.
    pub async fn tick_at(&self, now: Timestamp) -> TickResults {
        let datasets: Vec<_> = self.config.enabled_datasets().collect();
        if datasets.is_empty() {
            warn!("No enabled datasets configured");
            return Vec::new();
        }

        futures::future::join_all(datasets.iter().map(|policy| async move {
            let result = self.process_dataset(policy, now).await;
            if let Err(e) = &result {
                error!("{}", e);
            }
            (policy.name().to_string(), result)
        }))
        .await
    }

    /// Tick every `check_interval` until `shutdown` resolves
    ///
    /// On shutdown no new tick is started, and datasets already executing are
    /// allowed to finish before this returns.
    pub async fn run(self: Arc<Self>, shutdown: impl Future<Output = ()>) -> Result<()> {
        let mut timer = interval(self.config.check_interval.to_std());
        timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut tasks = JoinSet::new();

        tokio::pin!(shutdown);

        info!(
            "Starting scheduler ({} datasets, check interval {}, dry run: {})",
            self.config.enabled_datasets().count(),
            self.config.check_interval,
            self.executor.dry_run()
        );

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Shutdown requested");
                    break;
                }
                _ = timer.tick() => {
                    self.spawn_tick(&mut tasks, Utc::now());
                }
                Some(joined) = tasks.join_next(), if !tasks.is_empty() => {
                    if let Err(e) = joined {
                        error!("Dataset task aborted: {}", e);
                    }
                }
            }
        }

        if !tasks.is_empty() {
            info!("Waiting for {} in-flight datasets", self.in_flight.len());
        }
        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                error!("Dataset task aborted: {}", e);
            }
        }

        info!("Scheduler stopped");
        Ok(())
    }

    /// Start one task per enabled dataset that is not still executing
    fn spawn_tick(self: &Arc<Self>, tasks: &mut JoinSet<()>, now: Timestamp) {
        debug!("Tick at {}", now);

        for policy in self.config.enabled_datasets() {
            let Some(guard) = self.in_flight.try_acquire(policy.name()) else {
                warn!(
                    "Dataset {} is still busy with its previous tick; skipping",
                    policy.name()
                );
                continue;
            };

            let daemon = Arc::clone(self);
            let policy = policy.clone();
            tasks.spawn(async move {
                let _guard = guard;
                if let Err(e) = daemon.process_dataset(&policy, now).await {
                    error!("{}", e);
                }
            });
        }
    }
}
