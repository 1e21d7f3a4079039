//! Scheduler loop: ticking, busy datasets and graceful shutdown

use crate::common::daemon_with;
use async_trait::async_trait;
use backend::{BackendCall, DestroyOutcome, MemoryBackend, SnapshotBackend};
use cli_lib::{Config, Daemon};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Delegates to a memory backend, taking ten minutes per create
struct SlowBackend {
    inner: Arc<MemoryBackend>,
    /// Every listing marks the start of a dataset tick
    listings: AtomicUsize,
}

#[async_trait]
impl SnapshotBackend for SlowBackend {
    async fn dataset_exists(&self, dataset: &str) -> backend::Result<bool> {
        self.inner.dataset_exists(dataset).await
    }

    async fn list_snapshots(&self, dataset: &str, recursive: bool) -> backend::Result<Vec<String>> {
        self.listings.fetch_add(1, Ordering::SeqCst);
        self.inner.list_snapshots(dataset, recursive).await
    }

    async fn create_snapshot(&self, dataset: &str, name: &str, recursive: bool) -> backend::Result<()> {
        tokio::time::sleep(Duration::from_secs(600)).await;
        self.inner.create_snapshot(dataset, name, recursive).await
    }

    async fn destroy_snapshot(&self, full_name: &str) -> backend::Result<DestroyOutcome> {
        self.inner.destroy_snapshot(full_name).await
    }
}

fn config(check_interval: &str) -> Config {
    Config::from_toml_str(&format!(
        r#"
        check_interval = "{check_interval}"
        [[datasets]]
        name = "tank/data"
        [[datasets]]
        name = "tank/home"
        "#
    ))
    .unwrap()
}

#[tokio::test(start_paused = true)]
async fn test_run_ticks_immediately_and_stops_on_shutdown() {
    let (daemon, backend) = daemon_with(config("5m"));

    daemon
        .run(tokio::time::sleep(Duration::from_secs(1)))
        .await
        .unwrap();

    assert_eq!(backend.snapshots("tank/data").len(), 1);
    assert_eq!(backend.snapshots("tank/home").len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_busy_dataset_is_skipped_and_drained_on_shutdown() {
    let memory = Arc::new(MemoryBackend::new());
    memory.add_dataset("tank/data");
    memory.add_dataset("tank/home");
    let slow = Arc::new(SlowBackend {
        inner: memory.clone(),
        listings: AtomicUsize::new(0),
    });
    let daemon = Arc::new(Daemon::new(config("1m"), slow.clone()));

    // Ticks at 0s and 60s; the second finds both creates still running
    daemon
        .run(tokio::time::sleep(Duration::from_secs(90)))
        .await
        .unwrap();

    // Busy datasets were not even listed on the second tick
    assert_eq!(slow.listings.load(Ordering::SeqCst), 2);

    // Shutdown waited for the in-flight creates instead of abandoning them
    let creates: Vec<_> = memory
        .calls()
        .into_iter()
        .filter(|call| matches!(call, BackendCall::Create { .. }))
        .collect();
    assert_eq!(creates.len(), 2);
    assert_eq!(memory.snapshots("tank/data").len(), 1);
    assert_eq!(memory.snapshots("tank/home").len(), 1);
}
