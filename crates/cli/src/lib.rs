//! snapkeep daemon library
//!
//! Configuration, tick driver, executor and lock file behind the `snapkeep`
//! binary, exposed so integration tests can drive them directly.

pub mod config;
pub mod daemon;
pub mod executor;
pub mod locks;
pub mod logging;

// Re-exports
pub use config::{Config, ConfigError};
pub use daemon::{Daemon, DatasetEvaluationFailure, DatasetOutcome};
pub use executor::{ExecutionReport, Executor};
