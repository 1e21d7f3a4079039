//! Daemon configuration
//!
//! The configuration is a TOML file holding global settings and one
//! `[[datasets]]` table per managed dataset. It is validated in full before
//! the daemon starts: a single bad value aborts startup, and every error
//! names the dataset and the field at fault.

use serde::Deserialize;
use sk_core::{DatasetPolicy, Duration, RetentionPolicy, RetentionTier, DEFAULT_PREFIX};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

/// Default configuration file location
pub const DEFAULT_CONFIG_PATH: &str = "/etc/snapkeep/config.toml";

/// Default global check interval (5 minutes)
pub const DEFAULT_CHECK_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("no datasets configured")]
    NoDatasets,

    #[error("dataset #{index}: missing `name`")]
    MissingName { index: usize },

    #[error("dataset {0:?} is configured more than once")]
    DuplicateDataset(String),

    #[error("dataset {dataset:?}: invalid `{field}`: {source}")]
    InvalidField {
        dataset: String,
        field: String,
        #[source]
        source: sk_core::Error,
    },

    #[error("invalid `{field}`: {reason}")]
    InvalidGlobal { field: &'static str, reason: String },
}

/// On-disk layout, before validation
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    #[serde(default)]
    datasets: Vec<RawDataset>,
    snapshot_prefix: Option<String>,
    check_interval: Option<String>,
    #[serde(default)]
    dry_run: bool,
    zfs_binary: Option<PathBuf>,
    lock_dir: Option<PathBuf>,
    log_dir: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawDataset {
    name: Option<String>,
    #[serde(default = "default_enabled")]
    enabled: bool,
    #[serde(default)]
    recursive: bool,
    frequency: Option<String>,
    /// Absent means the default tier; an empty table means "never expire"
    retention: Option<BTreeMap<String, String>>,
}

fn default_enabled() -> bool {
    true
}

/// Validated daemon configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub datasets: Vec<DatasetPolicy>,
    pub snapshot_prefix: String,
    pub check_interval: Duration,
    pub dry_run: bool,
    pub zfs_binary: PathBuf,
    pub lock_dir: Option<PathBuf>,
    pub log_dir: Option<PathBuf>,
}

impl Config {
    /// Load and validate a configuration file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Parse and validate configuration text
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let raw: RawConfig = toml::from_str(text)?;
        raw.validate()
    }

    /// Datasets the daemon should evaluate on each tick
    pub fn enabled_datasets(&self) -> impl Iterator<Item = &DatasetPolicy> {
        self.datasets.iter().filter(|dataset| dataset.enabled())
    }
}

impl RawConfig {
    fn validate(self) -> Result<Config, ConfigError> {
        let snapshot_prefix = self
            .snapshot_prefix
            .unwrap_or_else(|| DEFAULT_PREFIX.to_string());
        validate_prefix(&snapshot_prefix)?;

        let check_interval = match self.check_interval {
            Some(text) => Duration::parse_interval(&text).map_err(|e| ConfigError::InvalidGlobal {
                field: "check_interval",
                reason: e.to_string(),
            })?,
            None => DEFAULT_CHECK_INTERVAL,
        };

        if self.datasets.is_empty() {
            return Err(ConfigError::NoDatasets);
        }

        let mut seen = HashSet::new();
        let mut datasets = Vec::with_capacity(self.datasets.len());
        for (index, raw) in self.datasets.into_iter().enumerate() {
            let policy = raw.validate(index)?;
            if !seen.insert(policy.name().to_string()) {
                return Err(ConfigError::DuplicateDataset(policy.name().to_string()));
            }
            datasets.push(policy);
        }

        Ok(Config {
            datasets,
            snapshot_prefix,
            check_interval,
            dry_run: self.dry_run,
            zfs_binary: self.zfs_binary.unwrap_or_else(|| PathBuf::from("zfs")),
            lock_dir: self.lock_dir,
            log_dir: self.log_dir,
        })
    }
}

impl RawDataset {
    fn validate(self, index: usize) -> Result<DatasetPolicy, ConfigError> {
        let name = match self.name {
            Some(name) if !name.is_empty() => name,
            _ => return Err(ConfigError::MissingName { index }),
        };
        let invalid = |field: &str, source: sk_core::Error| ConfigError::InvalidField {
            dataset: name.clone(),
            field: field.to_string(),
            source,
        };

        let frequency = match &self.frequency {
            Some(text) => Duration::parse(text).map_err(|e| invalid("frequency", e))?,
            None => DatasetPolicy::DEFAULT_FREQUENCY,
        };

        let retention = match &self.retention {
            None => RetentionPolicy::default(),
            Some(table) => {
                let mut tiers = Vec::with_capacity(table.len());
                for (age, keep) in table {
                    let field = format!("retention.{age}");
                    let age_threshold = Duration::parse(age).map_err(|e| invalid(&field, e))?;
                    let keep_duration = Duration::parse(keep).map_err(|e| invalid(&field, e))?;
                    tiers.push(RetentionTier::new(age_threshold, keep_duration));
                }
                RetentionPolicy::new(tiers).map_err(|e| invalid("retention", e))?
            }
        };

        let policy = DatasetPolicy::new(name.clone()).map_err(|e| invalid("name", e))?;
        Ok(policy
            .with_enabled(self.enabled)
            .with_recursive(self.recursive)
            .with_frequency(frequency)
            .with_retention(retention))
    }
}

fn validate_prefix(prefix: &str) -> Result<(), ConfigError> {
    let reason = if prefix.is_empty() {
        Some("must not be empty")
    } else if prefix.contains(['@', '/']) || prefix.chars().any(char::is_whitespace) {
        Some("must not contain '@', '/' or whitespace")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(ConfigError::InvalidGlobal {
            field: "snapshot_prefix",
            reason: format!("{prefix:?} {reason}"),
        }),
        None => Ok(()),
    }
}

/// Annotated example configuration
pub fn example_config() -> &'static str {
    r#"# snapkeep configuration

# Snapshots are named {snapshot_prefix}_{YYYYMMDD}_{HHMMSS} (UTC).
# Only snapshots carrying this prefix are ever destroyed.
snapshot_prefix = "autosnap"

# How often every dataset is evaluated (s, m, h, d, w, M, y)
check_interval = "5m"

# Log decisions without creating or destroying anything
dry_run = false

# zfs_binary = "/usr/sbin/zfs"
# lock_dir = "/run/snapkeep"
# log_dir = "/var/log/snapkeep"

# Durations use h (hour), d (day), w (week), M (30 days), y (365 days).
#
# Retention maps an age threshold to how long a snapshot is kept once it
# reaches that age. The tier with the greatest threshold not above the
# snapshot's age applies; snapshots younger than every threshold are kept.
# Without a retention table a dataset keeps snapshots for 30 days after they
# turn one day old; an empty table keeps them forever.

[[datasets]]
name = "tank/data"
frequency = "1h"

[datasets.retention]
"1d" = "1w"
"1w" = "1M"
"1M" = "1y"

[[datasets]]
name = "tank/home"
recursive = true
frequency = "1d"

[datasets.retention]
"1w" = "1y"
"#
}
