//! In-memory snapshot backend
//!
//! Keeps datasets and their snapshot names in a map and records every
//! mutating call, so tests can assert on exactly what the daemon did.

use crate::{BackendError, DestroyOutcome, Result, SnapshotBackend};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{BTreeMap, BTreeSet, HashSet};

/// A mutating call observed by the backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendCall {
    Create {
        dataset: String,
        name: String,
        recursive: bool,
    },
    Destroy {
        full_name: String,
    },
}

#[derive(Default)]
struct State {
    /// dataset -> short snapshot names
    datasets: BTreeMap<String, BTreeSet<String>>,
    /// Datasets whose every operation fails
    failing: HashSet<String>,
    calls: Vec<BackendCall>,
}

/// Thread-safe in-memory backend
#[derive(Default)]
pub struct MemoryBackend {
    state: Mutex<State>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a dataset with no snapshots
    pub fn add_dataset(&self, dataset: &str) {
        self.state
            .lock()
            .datasets
            .entry(dataset.to_string())
            .or_default();
    }

    /// Register a snapshot by full name, creating its dataset if needed
    pub fn insert_snapshot(&self, full_name: &str) {
        if let Some((dataset, short)) = full_name.split_once('@') {
            self.state
                .lock()
                .datasets
                .entry(dataset.to_string())
                .or_default()
                .insert(short.to_string());
        }
    }

    /// Make every operation touching `dataset` fail
    pub fn fail_dataset(&self, dataset: &str) {
        self.state.lock().failing.insert(dataset.to_string());
    }

    /// Full names of the snapshots currently held for `dataset`
    pub fn snapshots(&self, dataset: &str) -> Vec<String> {
        self.state
            .lock()
            .datasets
            .get(dataset)
            .map(|shorts| shorts.iter().map(|s| format!("{dataset}@{s}")).collect())
            .unwrap_or_default()
    }

    /// Every create/destroy call so far, in order
    pub fn calls(&self) -> Vec<BackendCall> {
        self.state.lock().calls.clone()
    }
}

impl State {
    fn check(&self, dataset: &str) -> Result<()> {
        if self.failing.contains(dataset) {
            return Err(BackendError::Injected(dataset.to_string()));
        }
        if !self.datasets.contains_key(dataset) {
            return Err(BackendError::DatasetNotFound(dataset.to_string()));
        }
        Ok(())
    }

    /// The dataset itself plus, when `recursive`, every dataset below it
    fn subtree(&self, dataset: &str, recursive: bool) -> Vec<String> {
        self.datasets
            .keys()
            .filter(|name| {
                name.as_str() == dataset
                    || (recursive
                        && name
                            .strip_prefix(dataset)
                            .is_some_and(|rest| rest.starts_with('/')))
            })
            .cloned()
            .collect()
    }
}

#[async_trait]
impl SnapshotBackend for MemoryBackend {
    async fn dataset_exists(&self, dataset: &str) -> Result<bool> {
        let state = self.state.lock();
        if state.failing.contains(dataset) {
            return Err(BackendError::Injected(dataset.to_string()));
        }
        Ok(state.datasets.contains_key(dataset))
    }

    async fn list_snapshots(&self, dataset: &str, recursive: bool) -> Result<Vec<String>> {
        let state = self.state.lock();
        state.check(dataset)?;

        let mut names = Vec::new();
        for name in state.subtree(dataset, recursive) {
            if let Some(shorts) = state.datasets.get(&name) {
                names.extend(shorts.iter().map(|short| format!("{name}@{short}")));
            }
        }
        Ok(names)
    }

    async fn create_snapshot(&self, dataset: &str, name: &str, recursive: bool) -> Result<()> {
        let mut state = self.state.lock();
        state.check(dataset)?;

        let targets = state.subtree(dataset, recursive);
        if let Some(existing) = targets.iter().find(|target| {
            state
                .datasets
                .get(target.as_str())
                .is_some_and(|shorts| shorts.contains(name))
        }) {
            return Err(BackendError::SnapshotExists(format!("{existing}@{name}")));
        }

        for target in targets {
            if let Some(shorts) = state.datasets.get_mut(&target) {
                shorts.insert(name.to_string());
            }
        }
        state.calls.push(BackendCall::Create {
            dataset: dataset.to_string(),
            name: name.to_string(),
            recursive,
        });
        Ok(())
    }

    async fn destroy_snapshot(&self, full_name: &str) -> Result<DestroyOutcome> {
        let mut state = self.state.lock();
        let Some((dataset, short)) = full_name.split_once('@') else {
            return Err(BackendError::DatasetNotFound(full_name.to_string()));
        };
        if state.failing.contains(dataset) {
            return Err(BackendError::Injected(dataset.to_string()));
        }

        state.calls.push(BackendCall::Destroy {
            full_name: full_name.to_string(),
        });

        let removed = state
            .datasets
            .get_mut(dataset)
            .is_some_and(|shorts| shorts.remove(short));
        Ok(if removed {
            DestroyOutcome::Destroyed
        } else {
            DestroyOutcome::AlreadyGone
        })
    }
}
