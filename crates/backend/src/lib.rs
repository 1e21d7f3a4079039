//! Snapshot backends
//!
//! This crate provides:
//! - The `SnapshotBackend` trait the daemon drives
//! - `ZfsBackend`, which shells out to the `zfs` command
//! - `MemoryBackend`, an in-process backend for tests and dry demonstrations

pub mod memory;
pub mod zfs;

use async_trait::async_trait;

// Re-exports
pub use memory::{BackendCall, MemoryBackend};
pub use zfs::ZfsBackend;

/// Result type for backend operations
pub type Result<T> = std::result::Result<T, BackendError>;

/// Outcome of a destroy request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DestroyOutcome {
    /// The snapshot existed and is gone now
    Destroyed,
    /// Nothing to do: the snapshot was already gone
    AlreadyGone,
}

/// Errors reported by a backend
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{command}` exited with {status}: {stderr}")]
    CommandFailed {
        command: String,
        status: String,
        stderr: String,
    },

    #[error("dataset {0} does not exist")]
    DatasetNotFound(String),

    #[error("snapshot {0} already exists")]
    SnapshotExists(String),

    #[error("injected failure for {0}")]
    Injected(String),
}

/// Storage system that can list, create and destroy snapshots
#[async_trait]
pub trait SnapshotBackend: Send + Sync {
    /// Whether `dataset` exists at all
    async fn dataset_exists(&self, dataset: &str) -> Result<bool>;

    /// Full names (`dataset@short`) of the dataset's snapshots, including
    /// descendant datasets when `recursive`
    async fn list_snapshots(&self, dataset: &str, recursive: bool) -> Result<Vec<String>>;

    /// Create `dataset@name`, and the same name on every descendant when `recursive`
    async fn create_snapshot(&self, dataset: &str, name: &str, recursive: bool) -> Result<()>;

    /// Destroy one snapshot by full name
    async fn destroy_snapshot(&self, full_name: &str) -> Result<DestroyOutcome>;
}
