//! Per-dataset snapshot policy and tiered retention

use crate::{Duration, Error, Result};
use serde::Serialize;

/// One retention tier: once a snapshot's age reaches `age_threshold` it is
/// kept for `keep_duration` beyond that point
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RetentionTier {
    pub age_threshold: Duration,
    pub keep_duration: Duration,
}

impl RetentionTier {
    pub fn new(age_threshold: Duration, keep_duration: Duration) -> Self {
        Self {
            age_threshold,
            keep_duration,
        }
    }

    /// Age past which a snapshot governed by this tier is expired
    pub fn expiry_age(&self) -> Duration {
        self.age_threshold.saturating_add(self.keep_duration)
    }
}

/// Ordered set of retention tiers with distinct age thresholds
///
/// An empty policy never expires anything.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct RetentionPolicy {
    /// Sorted ascending by `age_threshold`
    tiers: Vec<RetentionTier>,
}

impl Default for RetentionPolicy {
    /// Keep everything for 30 days once it is a day old
    fn default() -> Self {
        Self {
            tiers: vec![RetentionTier::new(
                Duration::from_days(1),
                Duration::from_days(30),
            )],
        }
    }
}

impl RetentionPolicy {
    /// Build a policy, rejecting duplicate age thresholds
    pub fn new(tiers: impl IntoIterator<Item = RetentionTier>) -> Result<Self> {
        let mut tiers: Vec<_> = tiers.into_iter().collect();
        tiers.sort_by_key(|tier| tier.age_threshold);

        if let Some(pair) = tiers
            .windows(2)
            .find(|pair| pair[0].age_threshold == pair[1].age_threshold)
        {
            return Err(Error::InvalidRetentionPolicy {
                threshold: pair[0].age_threshold,
            });
        }

        Ok(Self { tiers })
    }

    /// A policy with no tiers: snapshots are never expired
    pub fn never_expire() -> Self {
        Self { tiers: Vec::new() }
    }

    pub fn tiers(&self) -> &[RetentionTier] {
        &self.tiers
    }

    pub fn is_empty(&self) -> bool {
        self.tiers.is_empty()
    }

    /// The tier with the greatest threshold not above `age`
    ///
    /// `None` means the snapshot is younger than every threshold.
    pub fn applicable_tier(&self, age: Duration) -> Option<&RetentionTier> {
        let idx = self.tiers.partition_point(|tier| tier.age_threshold <= age);
        idx.checked_sub(1).map(|i| &self.tiers[i])
    }
}

/// Snapshot policy for one dataset
///
/// Built once from configuration and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DatasetPolicy {
    name: String,
    enabled: bool,
    frequency: Duration,
    recursive: bool,
    retention: RetentionPolicy,
}

impl DatasetPolicy {
    /// Default snapshot frequency (1h)
    pub const DEFAULT_FREQUENCY: Duration = Duration::from_hours(1);

    /// New enabled, non-recursive policy with the default frequency and retention
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        if name.is_empty() {
            return Err(Error::InvalidDatasetPolicy {
                reason: "dataset name must not be empty".to_string(),
            });
        }
        if name.contains('@') || name.chars().any(char::is_whitespace) {
            return Err(Error::InvalidDatasetPolicy {
                reason: format!("dataset name {name:?} must not contain '@' or whitespace"),
            });
        }

        Ok(Self {
            name,
            enabled: true,
            frequency: Self::DEFAULT_FREQUENCY,
            recursive: false,
            retention: RetentionPolicy::default(),
        })
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn with_frequency(mut self, frequency: Duration) -> Self {
        self.frequency = frequency;
        self
    }

    pub fn with_recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    pub fn with_retention(mut self, retention: RetentionPolicy) -> Self {
        self.retention = retention;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn frequency(&self) -> Duration {
        self.frequency
    }

    pub fn recursive(&self) -> bool {
        self.recursive
    }

    pub fn retention(&self) -> &RetentionPolicy {
        &self.retention
    }
}
