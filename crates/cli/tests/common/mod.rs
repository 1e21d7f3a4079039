//! Common fixtures for integration tests

use backend::MemoryBackend;
use chrono::{TimeDelta, TimeZone, Utc};
use cli_lib::{Config, Daemon};
use sk_core::{format_snapshot_name, Timestamp};
use std::sync::Arc;

pub const PREFIX: &str = "autosnap";

/// Fixed "now" for every test
pub fn now() -> Timestamp {
    Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
}

/// Full name of a managed snapshot of `dataset` taken `age` before `now()`
pub fn snapshot_aged(dataset: &str, age: TimeDelta) -> String {
    format!("{dataset}@{}", format_snapshot_name(PREFIX, now() - age))
}

/// Config with one hourly `tank/data` dataset kept 1d -> 1M
pub fn single_dataset_config() -> Config {
    Config::from_toml_str(
        r#"
        [[datasets]]
        name = "tank/data"
        frequency = "1h"
        [datasets.retention]
        "1d" = "1M"
        "#,
    )
    .unwrap()
}

/// Daemon over a fresh memory backend holding the configured datasets
pub fn daemon_with(config: Config) -> (Arc<Daemon>, Arc<MemoryBackend>) {
    let backend = Arc::new(MemoryBackend::new());
    for dataset in &config.datasets {
        backend.add_dataset(dataset.name());
    }
    let daemon = Arc::new(Daemon::new(config, backend.clone()));
    (daemon, backend)
}
