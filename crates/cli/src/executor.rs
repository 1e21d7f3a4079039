//! Applies a dataset plan against a snapshot backend

use backend::{DestroyOutcome, SnapshotBackend};
use scheduler::Plan;
use std::sync::Arc;
use tracing::{error, info, warn};

/// What happened while applying one plan
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionReport {
    /// Full name of the snapshot created, if any
    pub created: Option<String>,
    pub destroyed: usize,
    pub already_gone: usize,
    pub failed: usize,
}

/// Executes plans, or only logs them in dry-run mode
pub struct Executor {
    backend: Arc<dyn SnapshotBackend>,
    prefix: String,
    dry_run: bool,
}

impl Executor {
    pub fn new(backend: Arc<dyn SnapshotBackend>, prefix: impl Into<String>, dry_run: bool) -> Self {
        Self {
            backend,
            prefix: prefix.into(),
            dry_run,
        }
    }

    pub fn dry_run(&self) -> bool {
        self.dry_run
    }

    /// Create first, then destroy, so the dataset is never left without its
    /// newest snapshot. Failures are logged and counted; they never stop the
    /// remaining actions.
    pub async fn apply(&self, plan: &Plan) -> ExecutionReport {
        let mut report = ExecutionReport::default();
        let actions = &plan.actions;

        if actions.create {
            let name = plan.snapshot_name(&self.prefix);
            let full_name = format!("{}@{}", plan.dataset, name);

            if self.dry_run {
                info!("[dry run] Would create snapshot {} (recursive={})", full_name, actions.recursive);
            } else {
                match self
                    .backend
                    .create_snapshot(&plan.dataset, &name, actions.recursive)
                    .await
                {
                    Ok(()) => {
                        info!("Created snapshot {} (recursive={})", full_name, actions.recursive);
                        report.created = Some(full_name);
                    }
                    Err(e) => {
                        error!("Failed to create snapshot {}: {}", full_name, e);
                        report.failed += 1;
                    }
                }
            }
        }

        for snapshot in &actions.destroy {
            if self.dry_run {
                info!("[dry run] Would destroy snapshot {}", snapshot.full_name);
                continue;
            }

            match self.backend.destroy_snapshot(&snapshot.full_name).await {
                Ok(DestroyOutcome::Destroyed) => {
                    info!("Destroyed expired snapshot {}", snapshot.full_name);
                    report.destroyed += 1;
                }
                Ok(DestroyOutcome::AlreadyGone) => {
                    warn!("Snapshot {} was already gone", snapshot.full_name);
                    report.already_gone += 1;
                }
                Err(e) => {
                    error!("Failed to destroy snapshot {}: {}", snapshot.full_name, e);
                    report.failed += 1;
                }
            }
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use backend::{BackendCall, MemoryBackend};
    use chrono::{TimeZone, Utc};
    use scheduler::evaluate;
    use sk_core::{DatasetPolicy, Duration, RetentionPolicy, RetentionTier};

    fn setup() -> (Arc<MemoryBackend>, Plan) {
        let backend = Arc::new(MemoryBackend::new());
        backend.insert_snapshot("tank@autosnap_20240101_000000");
        backend.insert_snapshot("tank@autosnap_20240102_000000");

        let policy = DatasetPolicy::new("tank").unwrap().with_retention(
            RetentionPolicy::new([RetentionTier::new(
                Duration::from_days(1),
                Duration::from_days(1),
            )])
            .unwrap(),
        );
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        let plan = evaluate(&policy, "autosnap", &backend.snapshots("tank"), now);
        (backend, plan)
    }

    #[tokio::test]
    async fn test_creates_before_destroying() {
        let (backend, plan) = setup();
        let executor = Executor::new(backend.clone(), "autosnap", false);

        let report = executor.apply(&plan).await;

        assert_eq!(report.created.as_deref(), Some("tank@autosnap_20240601_000000"));
        assert_eq!(report.destroyed, 2);
        assert_eq!(report.failed, 0);

        let calls = backend.calls();
        assert_eq!(calls.len(), 3);
        assert!(matches!(calls[0], BackendCall::Create { .. }));
        assert!(matches!(calls[1], BackendCall::Destroy { .. }));
        assert_eq!(backend.snapshots("tank"), vec!["tank@autosnap_20240601_000000"]);
    }

    #[tokio::test]
    async fn test_dry_run_touches_nothing() {
        let (backend, plan) = setup();
        let executor = Executor::new(backend.clone(), "autosnap", true);

        let report = executor.apply(&plan).await;

        assert_eq!(report, ExecutionReport::default());
        assert!(backend.calls().is_empty());
        assert_eq!(backend.snapshots("tank").len(), 2);
    }

    #[tokio::test]
    async fn test_already_gone_is_not_a_failure() {
        let (backend, plan) = setup();
        let executor = Executor::new(backend.clone(), "autosnap", false);
        executor.apply(&plan).await;

        // Same plan again: the create collides, the destroys find nothing
        let report = executor.apply(&plan).await;
        assert_eq!(report.already_gone, 2);
        assert_eq!(report.failed, 1);
    }
}
