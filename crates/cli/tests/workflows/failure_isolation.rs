//! One dataset failing must not hold back the others

use crate::common::{daemon_with, now, snapshot_aged};
use backend::{BackendError, MemoryBackend};
use chrono::TimeDelta;
use cli_lib::{Config, Daemon};
use std::sync::Arc;

fn two_dataset_config() -> Config {
    Config::from_toml_str(
        r#"
        [[datasets]]
        name = "tank/broken"
        [[datasets]]
        name = "tank/healthy"
        "#,
    )
    .unwrap()
}

#[tokio::test]
async fn test_failing_dataset_does_not_block_others() {
    let (daemon, backend) = daemon_with(two_dataset_config());
    backend.fail_dataset("tank/broken");
    backend.insert_snapshot(&snapshot_aged("tank/healthy", TimeDelta::days(45)));

    let results = daemon.tick_at(now()).await;
    assert_eq!(results.len(), 2);

    let (name, broken) = &results[0];
    assert_eq!(name, "tank/broken");
    let failure = broken.as_ref().unwrap_err();
    assert_eq!(failure.dataset, "tank/broken");
    assert!(matches!(failure.source, BackendError::Injected(_)));
    assert!(failure.to_string().contains("tank/broken"));

    let (name, healthy) = &results[1];
    assert_eq!(name, "tank/healthy");
    let outcome = healthy.as_ref().unwrap();
    assert!(outcome.report.created.is_some());
    assert_eq!(outcome.report.destroyed, 1);
    assert_eq!(backend.snapshots("tank/healthy").len(), 1);
}

#[tokio::test]
async fn test_failed_dataset_is_retried_next_tick() {
    let backend = Arc::new(MemoryBackend::new());
    backend.add_dataset("tank/healthy");
    let daemon = Daemon::new(two_dataset_config(), backend.clone());

    // tank/broken does not exist yet
    let results = daemon.tick_at(now()).await;
    assert!(matches!(
        results[0].1.as_ref().unwrap_err().source,
        BackendError::DatasetNotFound(_)
    ));
    assert!(results[1].1.is_ok());

    backend.add_dataset("tank/broken");
    let results = daemon.tick_at(now() + TimeDelta::minutes(5)).await;

    let recovered = results[0].1.as_ref().unwrap();
    assert!(recovered.plan.actions.create);
    assert_eq!(backend.snapshots("tank/broken").len(), 1);

    let healthy = results[1].1.as_ref().unwrap();
    assert!(!healthy.plan.actions.create);
}

#[tokio::test]
async fn test_verify_datasets_reports_missing_and_keeps_going() {
    let backend = Arc::new(MemoryBackend::new());
    backend.add_dataset("tank/healthy");
    let daemon = Daemon::new(two_dataset_config(), backend.clone());

    assert_eq!(daemon.verify_datasets().await, vec!["tank/broken".to_string()]);

    // The existing dataset is still served
    let results = daemon.tick_at(now()).await;
    assert!(results[0].1.is_err());
    assert!(results[1].1.is_ok());

    backend.add_dataset("tank/broken");
    assert!(daemon.verify_datasets().await.is_empty());
}

#[tokio::test]
async fn test_verify_datasets_skips_disabled_and_unverifiable() {
    let config = Config::from_toml_str(
        r#"
        [[datasets]]
        name = "tank/flaky"
        [[datasets]]
        name = "tank/retired"
        enabled = false
        "#,
    )
    .unwrap();
    let backend = Arc::new(MemoryBackend::new());
    backend.add_dataset("tank/flaky");
    backend.fail_dataset("tank/flaky");
    let daemon = Daemon::new(config, backend);

    // A backend error is not proof of absence, and disabled datasets are not checked
    assert!(daemon.verify_datasets().await.is_empty());
}
