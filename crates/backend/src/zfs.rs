//! Backend driving the `zfs` command line tool

use crate::{BackendError, DestroyOutcome, Result, SnapshotBackend};
use async_trait::async_trait;
use std::path::PathBuf;
use tokio::process::Command;
use tracing::debug;

/// stderr fragments `zfs` prints when the named dataset or snapshot is not there
const MISSING_MARKERS: &[&str] = &["could not find any snapshots", "does not exist"];

/// Snapshot backend for ZFS pools
#[derive(Debug, Clone)]
pub struct ZfsBackend {
    /// Path or name of the `zfs` executable
    binary: PathBuf,
}

impl Default for ZfsBackend {
    fn default() -> Self {
        Self::new("zfs")
    }
}

impl ZfsBackend {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    /// Run `zfs` with `args`, returning stdout on success
    async fn run(&self, args: &[String]) -> Result<String> {
        let command_line = format!("{} {}", self.binary.display(), args.join(" "));
        debug!("Running {}", command_line);

        let output = Command::new(&self.binary)
            .args(args)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| BackendError::Spawn {
                program: self.binary.display().to_string(),
                source,
            })?;

        if !output.status.success() {
            return Err(BackendError::CommandFailed {
                command: command_line,
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

fn exists_args(dataset: &str) -> Vec<String> {
    ["list", "-H", "-o", "name", dataset]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn list_args(dataset: &str, recursive: bool) -> Vec<String> {
    let mut args: Vec<String> = ["list", "-H", "-o", "name", "-t", "snapshot", "-s", "creation"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    if recursive {
        args.push("-r".to_string());
    } else {
        args.extend(["-d".to_string(), "1".to_string()]);
    }
    args.push(dataset.to_string());
    args
}

fn create_args(dataset: &str, name: &str, recursive: bool) -> Vec<String> {
    let mut args = vec!["snapshot".to_string()];
    if recursive {
        args.push("-r".to_string());
    }
    args.push(format!("{dataset}@{name}"));
    args
}

fn destroy_args(full_name: &str) -> Vec<String> {
    vec!["destroy".to_string(), full_name.to_string()]
}

/// One snapshot name per line, as printed by `zfs list -H -o name`
fn parse_listing(stdout: &str) -> Vec<String> {
    stdout
        .lines()
        .map(str::trim)
        .filter(|line| line.contains('@'))
        .map(str::to_string)
        .collect()
}

fn reports_missing(stderr: &str) -> bool {
    MISSING_MARKERS
        .iter()
        .any(|marker| stderr.contains(marker))
}

#[async_trait]
impl SnapshotBackend for ZfsBackend {
    async fn dataset_exists(&self, dataset: &str) -> Result<bool> {
        match self.run(&exists_args(dataset)).await {
            Ok(_) => Ok(true),
            Err(BackendError::CommandFailed { ref stderr, .. }) if reports_missing(stderr) => {
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    async fn list_snapshots(&self, dataset: &str, recursive: bool) -> Result<Vec<String>> {
        let stdout = self.run(&list_args(dataset, recursive)).await?;
        Ok(parse_listing(&stdout))
    }

    async fn create_snapshot(&self, dataset: &str, name: &str, recursive: bool) -> Result<()> {
        self.run(&create_args(dataset, name, recursive)).await?;
        Ok(())
    }

    async fn destroy_snapshot(&self, full_name: &str) -> Result<DestroyOutcome> {
        // Never let a bare dataset name through: `zfs destroy tank` destroys the dataset
        if !full_name.contains('@') {
            return Err(BackendError::CommandFailed {
                command: format!("{} destroy {}", self.binary.display(), full_name),
                status: "refused".to_string(),
                stderr: "not a snapshot name".to_string(),
            });
        }

        match self.run(&destroy_args(full_name)).await {
            Ok(_) => Ok(DestroyOutcome::Destroyed),
            Err(BackendError::CommandFailed { ref stderr, .. }) if reports_missing(stderr) => {
                Ok(DestroyOutcome::AlreadyGone)
            }
            Err(e) => Err(e),
        }
    }
}
