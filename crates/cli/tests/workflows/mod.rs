//! Workflow integration tests
//!
//! Each module exercises the daemon across one or more ticks.

pub mod failure_isolation;
pub mod shutdown;
pub mod tick_lifecycle;
