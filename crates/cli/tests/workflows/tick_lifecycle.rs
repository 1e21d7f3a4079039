//! Create and expire snapshots across ticks

use crate::common::{daemon_with, now, single_dataset_config, snapshot_aged, PREFIX};
use backend::BackendCall;
use chrono::TimeDelta;
use cli_lib::{Config, Daemon};
use sk_core::format_snapshot_name;

#[tokio::test]
async fn test_end_to_end_create_and_expire() {
    let (daemon, backend) = daemon_with(single_dataset_config());
    let recent = snapshot_aged("tank/data", TimeDelta::hours(2));
    let old = snapshot_aged("tank/data", TimeDelta::days(35));
    backend.insert_snapshot(&recent);
    backend.insert_snapshot(&old);

    let results = daemon.tick_at(now()).await;
    assert_eq!(results.len(), 1);

    let (dataset, result) = &results[0];
    assert_eq!(dataset, "tank/data");
    let outcome = result.as_ref().unwrap();
    assert!(outcome.plan.actions.create);
    assert_eq!(outcome.report.destroyed, 1);

    let created = format!("tank/data@{}", format_snapshot_name(PREFIX, now()));
    let mut expected = vec![recent, created];
    expected.sort();
    let mut remaining = backend.snapshots("tank/data");
    remaining.sort();
    assert_eq!(remaining, expected);
    assert!(!backend.snapshots("tank/data").contains(&old));
}

#[tokio::test]
async fn test_fresh_snapshot_suppresses_next_create() {
    let (daemon, backend) = daemon_with(single_dataset_config());

    daemon.tick_at(now()).await;
    daemon.tick_at(now() + TimeDelta::minutes(10)).await;
    daemon.tick_at(now() + TimeDelta::minutes(59)).await;

    assert_eq!(backend.calls().len(), 1);
    assert_eq!(backend.snapshots("tank/data").len(), 1);
}

#[tokio::test]
async fn test_missed_ticks_catch_up_once() {
    let (daemon, backend) = daemon_with(single_dataset_config());
    daemon.tick_at(now()).await;

    // Host was asleep for five hours: one catch-up snapshot, not five
    daemon.tick_at(now() + TimeDelta::hours(5)).await;
    daemon.tick_at(now() + TimeDelta::hours(5) + TimeDelta::minutes(5)).await;

    let creates = backend
        .calls()
        .into_iter()
        .filter(|call| matches!(call, BackendCall::Create { .. }))
        .count();
    assert_eq!(creates, 2);
}

#[tokio::test]
async fn test_restart_recovers_state_from_names() {
    let (daemon, backend) = daemon_with(single_dataset_config());
    daemon.tick_at(now()).await;
    drop(daemon);

    // A brand new daemon over the same pool sees the snapshot it made before
    let restarted = Daemon::new(single_dataset_config(), backend.clone());
    let results = restarted.tick_at(now() + TimeDelta::minutes(30)).await;

    let outcome = results[0].1.as_ref().unwrap();
    assert!(!outcome.plan.actions.create);
    assert_eq!(outcome.plan.last_snapshot_at, Some(now()));
    assert_eq!(backend.calls().len(), 1);
}

#[tokio::test]
async fn test_unparsable_and_foreign_snapshots_are_left_alone() {
    let (daemon, backend) = daemon_with(single_dataset_config());
    backend.insert_snapshot("tank/data@autosnap_corrupted");
    backend.insert_snapshot("tank/data@pre-upgrade");

    let results = daemon.tick_at(now()).await;
    let outcome = results[0].1.as_ref().unwrap();

    assert!(outcome.plan.actions.create);
    assert!(outcome.plan.actions.destroy.is_empty());
    assert_eq!(outcome.plan.ignored.len(), 1);

    let remaining = backend.snapshots("tank/data");
    assert!(remaining.contains(&"tank/data@autosnap_corrupted".to_string()));
    assert!(remaining.contains(&"tank/data@pre-upgrade".to_string()));
}

#[tokio::test]
async fn test_dry_run_plans_but_does_not_act() {
    let mut config = single_dataset_config();
    config.dry_run = true;
    let (daemon, backend) = daemon_with(config);
    backend.insert_snapshot(&snapshot_aged("tank/data", TimeDelta::days(40)));

    let results = daemon.tick_at(now()).await;
    let outcome = results[0].1.as_ref().unwrap();

    assert!(outcome.plan.actions.create);
    assert_eq!(outcome.plan.actions.destroy.len(), 1);
    assert!(backend.calls().is_empty());
    assert_eq!(backend.snapshots("tank/data").len(), 1);
}

#[tokio::test]
async fn test_disabled_datasets_are_skipped() {
    let config = Config::from_toml_str(
        r#"
        [[datasets]]
        name = "tank/data"
        [[datasets]]
        name = "tank/scratch"
        enabled = false
        "#,
    )
    .unwrap();
    let (daemon, backend) = daemon_with(config);

    let results = daemon.tick_at(now()).await;

    let names: Vec<_> = results.iter().map(|(name, _)| name.as_str()).collect();
    assert_eq!(names, vec!["tank/data"]);
    assert!(backend.snapshots("tank/scratch").is_empty());
}

#[tokio::test]
async fn test_recursive_dataset_expires_children() {
    let config = Config::from_toml_str(
        r#"
        [[datasets]]
        name = "tank"
        recursive = true
        [datasets.retention]
        "1d" = "1w"
        "#,
    )
    .unwrap();
    let (daemon, backend) = daemon_with(config);
    backend.add_dataset("tank/home");
    let stale_child = snapshot_aged("tank/home", TimeDelta::days(10));
    backend.insert_snapshot(&snapshot_aged("tank", TimeDelta::days(10)));
    backend.insert_snapshot(&stale_child);

    daemon.tick_at(now()).await;

    let created = format_snapshot_name(PREFIX, now());
    assert_eq!(backend.snapshots("tank"), vec![format!("tank@{created}")]);
    assert_eq!(backend.snapshots("tank/home"), vec![format!("tank/home@{created}")]);
}

#[tokio::test]
async fn test_identical_ticks_produce_identical_plans() {
    let (daemon, backend) = daemon_with(single_dataset_config());
    backend.insert_snapshot(&snapshot_aged("tank/data", TimeDelta::minutes(15)));
    backend.insert_snapshot(&snapshot_aged("tank/data", TimeDelta::days(33)));

    let policy = &daemon.config().datasets[0];
    let first = daemon.plan_dataset(policy, now()).await.unwrap();
    let second = daemon.plan_dataset(policy, now()).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(first.actions.destroy.len(), 1);
    assert!(!first.actions.create);
    assert!(backend.calls().is_empty());
}
