//! Core types for snapkeep
//!
//! This crate provides:
//! - Duration parsing with fixed calendar approximations
//! - Managed snapshot identity (naming convention, timestamp parsing, age)
//! - Retention tiers and per-dataset policies
//! - The error taxonomy shared by the decision engine

pub mod duration;
pub mod error;
pub mod policy;
pub mod snapshot;

// Re-exports
pub use duration::Duration;
pub use error::Error;
pub use policy::{DatasetPolicy, RetentionPolicy, RetentionTier};
pub use snapshot::{format_snapshot_name, ManagedSnapshot};

/// Result type for core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Snapshot timestamps are always UTC
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Default snapshot name prefix
pub const DEFAULT_PREFIX: &str = "autosnap";
