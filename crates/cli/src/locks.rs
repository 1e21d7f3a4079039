//! Single-instance lock for the scheduler daemon

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

const LOCK_FILE_NAME: &str = "snapkeep.lock";

/// Exclusive lock held for the lifetime of a running daemon
///
/// The kernel `flock` is the lock: it is released when the holding process
/// exits, however it exits. The file itself is never unlinked, so every
/// daemon locks the same inode. The JSON record inside only says who holds it.
pub struct DaemonLock {
    path: PathBuf,
    file: File,
}

/// Recorded holder of the lock
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockHolder {
    pub pid: u32,
    pub started_at: DateTime<Utc>,
}

impl DaemonLock {
    /// Take the lock in `lock_dir`, creating the directory if needed
    ///
    /// Fails whenever another open file holds the `flock`, even if it has not
    /// written its holder record yet. A record left behind by a process that
    /// died is simply overwritten.
    pub fn acquire(lock_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(lock_dir)
            .with_context(|| format!("Failed to create lock directory {}", lock_dir.display()))?;
        let path = lock_dir.join(LOCK_FILE_NAME);

        let mut file = open_lock_file(&path)?;
        if !try_flock_exclusive(&file)? {
            match read_holder(&mut file) {
                Ok(holder) => anyhow::bail!(
                    "snapkeep is already running (pid {}, since {})",
                    holder.pid,
                    holder.started_at
                ),
                Err(_) => anyhow::bail!(
                    "snapkeep is already running (lock {} is held)",
                    path.display()
                ),
            }
        }

        write_holder(&mut file)?;
        Ok(Self { path, file })
    }

    /// Who holds the lock in `lock_dir`, if anyone does
    pub fn holder(lock_dir: &Path) -> Option<LockHolder> {
        let mut file = File::open(lock_dir.join(LOCK_FILE_NAME)).ok()?;
        // Getting the lock means nobody holds it; it is released when `file` drops
        if try_flock_exclusive(&file).unwrap_or(false) {
            return None;
        }
        read_holder(&mut file)
            .ok()
            .filter(|holder| is_process_alive(holder.pid))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for DaemonLock {
    fn drop(&mut self) {
        // Clear the record while still holding the flock; closing the file releases it
        let _ = self.file.set_len(0);
    }
}

fn open_lock_file(path: &Path) -> Result<File> {
    OpenOptions::new()
        .create(true)
        .truncate(false)
        .read(true)
        .write(true)
        .open(path)
        .with_context(|| format!("Failed to open lock file {}", path.display()))
}

fn write_holder(file: &mut File) -> Result<()> {
    let holder = LockHolder {
        pid: std::process::id(),
        started_at: Utc::now(),
    };
    let serialized = serde_json::to_string(&holder).context("Failed to serialize lock holder")?;

    file.set_len(0)?;
    file.seek(SeekFrom::Start(0))?;
    file.write_all(serialized.as_bytes())?;
    file.sync_all()?;
    Ok(())
}

fn read_holder(file: &mut File) -> Result<LockHolder> {
    file.seek(SeekFrom::Start(0))?;
    let mut contents = String::new();
    file.read_to_string(&mut contents)?;
    serde_json::from_str(&contents).context("Failed to parse lock holder")
}

/// Non-blocking exclusive `flock`; `false` when someone else holds it
#[cfg(unix)]
fn try_flock_exclusive(file: &File) -> Result<bool> {
    use nix::fcntl::{flock, FlockArg};
    use std::os::unix::io::AsRawFd;

    match flock(file.as_raw_fd(), FlockArg::LockExclusiveNonblock) {
        Ok(()) => Ok(true),
        Err(nix::errno::Errno::EWOULDBLOCK) => Ok(false),
        Err(e) => Err(e.into()),
    }
}

#[cfg(not(unix))]
fn try_flock_exclusive(_file: &File) -> Result<bool> {
    Ok(true)
}

#[cfg(unix)]
fn is_process_alive(pid: u32) -> bool {
    use nix::sys::signal::kill;
    use nix::unistd::Pid;

    // Signal 0 probes for existence without delivering anything
    match kill(Pid::from_raw(pid as i32), None) {
        Ok(()) => true,
        Err(nix::errno::Errno::ESRCH) => false,
        Err(_) => true,
    }
}

#[cfg(not(unix))]
fn is_process_alive(_pid: u32) -> bool {
    true
}
