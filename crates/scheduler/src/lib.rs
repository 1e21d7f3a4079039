//! Snapshot scheduling and retention decisions
//!
//! This crate provides:
//! - Retention evaluation (which managed snapshots have expired)
//! - Schedule evaluation (whether a new snapshot is due)
//! - Per-dataset planning that combines both into an action set
//!
//! Nothing here performs I/O: every decision is a pure function of the
//! policy, the observed snapshot names and the current time.

pub mod plan;
pub mod retention;
pub mod schedule;

// Re-exports
pub use plan::{evaluate, Actions, Plan};
pub use retention::expired;
pub use schedule::due;
