//! Restart lock
//!
//! A file in the shared temp directory whose existence means a handoff is in
//! progress. The initiating process creates it; the successor deletes it once
//! fully initialized, which is the readiness signal.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, SystemTime};

use crate::atomic::{remove_if_exists, temp_sibling};

/// Distinguishes staging files of concurrent attempts within one process
static ATTEMPT: AtomicUsize = AtomicUsize::new(0);

/// Result of trying to take the lock
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockAcquire {
    /// The lock now belongs to the caller
    Acquired,
    /// Another handoff holds the lock; it was left untouched
    Held,
}

/// Handle on the restart lock file
#[derive(Debug, Clone)]
pub struct RestartLock {
    path: PathBuf,
}

impl RestartLock {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        fs::symlink_metadata(&self.path).is_ok()
    }

    /// Create the lock holding `pid`, never replacing an existing one.
    ///
    /// The PID is written to a private file first and then linked into
    /// place, so the lock appears complete or not at all.
    pub fn try_acquire(&self, pid: u32) -> io::Result<LockAcquire> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let attempt = ATTEMPT.fetch_add(1, Ordering::Relaxed);
        let staging = temp_sibling(&self.path, &format!("new{}", attempt));
        let written = fs::File::create(&staging).and_then(|mut file| write_pid(&mut file, pid));
        let linked = written.and_then(|()| fs::hard_link(&staging, &self.path));
        let _ = fs::remove_file(&staging);

        match linked {
            Ok(()) => Ok(LockAcquire::Acquired),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Ok(LockAcquire::Held),
            Err(e) => {
                log::debug!("Hard link unavailable for {}: {}", self.path.display(), e);
                self.create_exclusive(pid)
            }
        }
    }

    fn create_exclusive(&self, pid: u32) -> io::Result<LockAcquire> {
        self.create_exclusive_with(pid, write_pid)
    }

    /// Create the lock with `create_new` and fill it with `write`.
    ///
    /// A lock this call created is removed again if filling it fails.
    fn create_exclusive_with(
        &self,
        pid: u32,
        write: impl FnOnce(&mut fs::File, u32) -> io::Result<()>,
    ) -> io::Result<LockAcquire> {
        let mut file = match fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&self.path)
        {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => return Ok(LockAcquire::Held),
            Err(e) => return Err(e),
        };

        if let Err(e) = write(&mut file, pid) {
            drop(file);
            if let Err(remove) = fs::remove_file(&self.path) {
                log::warn!(
                    "Failed to remove incomplete lock {}: {}",
                    self.path.display(),
                    remove
                );
            }
            return Err(e);
        }
        Ok(LockAcquire::Acquired)
    }

    /// Delete the lock. Returns whether a lock was removed.
    pub fn release(&self) -> io::Result<bool> {
        remove_if_exists(&self.path)
    }

    /// PID recorded in the lock, if readable
    pub fn owner(&self) -> Option<u32> {
        fs::read_to_string(&self.path).ok()?.trim().parse().ok()
    }

    /// Age of the lock, by creation time where the platform records it
    pub fn age(&self) -> Option<Duration> {
        let meta = fs::metadata(&self.path).ok()?;
        let born = meta.created().or_else(|_| meta.modified()).ok()?;
        Some(
            SystemTime::now()
                .duration_since(born)
                .unwrap_or(Duration::ZERO),
        )
    }

    /// Delete the lock if it is older than `max_age`, whoever owns it.
    ///
    /// Returns true if a stale lock was removed.
    pub fn heal_if_stale(&self, max_age: Duration) -> bool {
        let Some(age) = self.age() else {
            return false;
        };
        if age <= max_age {
            return false;
        }

        match self.release() {
            Ok(removed) => {
                if removed {
                    log::info!(
                        "Removed stale restart lock {} (age {}s, owner {:?})",
                        self.path.display(),
                        age.as_secs(),
                        self.owner()
                    );
                }
                removed
            }
            Err(e) => {
                log::warn!("Failed to remove stale restart lock: {}", e);
                false
            }
        }
    }
}

fn write_pid(file: &mut fs::File, pid: u32) -> io::Result<()> {
    file.write_all(pid.to_string().as_bytes())?;
    file.sync_all()
}
