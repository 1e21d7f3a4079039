//! CLI command implementations

pub mod check;
pub mod config;
pub mod plan;
pub mod run;

use backend::{MemoryBackend, SnapshotBackend, ZfsBackend};
use cli_lib::Config;
use std::sync::Arc;

/// Storage backend selected on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum BackendKind {
    /// Drive the `zfs` command
    Zfs,
    /// Keep snapshots in memory (for trying out a configuration)
    Memory,
}

/// Build the backend, registering configured datasets with the memory backend
pub fn build_backend(kind: BackendKind, config: &Config) -> Arc<dyn SnapshotBackend> {
    match kind {
        BackendKind::Zfs => Arc::new(ZfsBackend::new(config.zfs_binary.clone())),
        BackendKind::Memory => {
            let backend = MemoryBackend::new();
            for dataset in &config.datasets {
                backend.add_dataset(dataset.name());
            }
            Arc::new(backend)
        }
    }
}
