//! The directory-based exclusive lock.
//!
//! A locker builds a private temporary directory next to the lock, puts an
//! empty file named after its [`ProcessId`] inside, and renames the directory
//! onto the lock path. The rename is atomic and fails while the lock
//! directory exists and is non-empty, so the lock never appears without its
//! holder file and other processes can always see who holds it.

use super::timer::TimeoutTimer;
use crate::error::{BorpError, Result};
use crate::process_id::{ProcessId, process_alive};
use log::{debug, error, warn};
use std::fs::{self, File};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// An exclusive lock backed by a directory.
#[derive(Debug)]
pub struct ExclusiveLock {
    path: PathBuf,
    id: ProcessId,
    unique_name: PathBuf,
    kill_stale_locks: bool,
    stale_warning_printed: bool,
}

impl ExclusiveLock {
    pub fn new(path: impl Into<PathBuf>, id: ProcessId, kill_stale_locks: bool) -> Self {
        let path = path.into();
        let unique_name = path.join(id.to_filename());
        Self {
            path,
            id,
            unique_name,
            kill_stale_locks,
            stale_warning_printed: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn id(&self) -> &ProcessId {
        &self.id
    }

    /// Acquire the lock, retrying until `timeout` expires.
    ///
    /// Acquiring a lock we already hold succeeds immediately.
    pub fn acquire(&mut self, timeout: Option<Duration>, sleep: Duration) -> Result<()> {
        if self.is_locked() && self.by_me() {
            return Ok(());
        }

        let temp_path = self.prepare_temp_dir()?;
        let result = self.acquire_from(&temp_path, timeout, sleep);
        if result.is_err() {
            let _ = fs::remove_dir_all(&temp_path);
        }
        result
    }

    fn acquire_from(
        &mut self,
        temp_path: &Path,
        timeout: Option<Duration>,
        sleep: Duration,
    ) -> Result<()> {
        let timer = TimeoutTimer::start(timeout, sleep);
        loop {
            // rename() would replace an empty directory, which may be an
            // older Borg halfway through its mkdir-then-create sequence.
            let attempt = if self.is_locked() {
                Err(ErrorKind::AlreadyExists.into())
            } else {
                fs::rename(temp_path, &self.path)
            };

            match attempt {
                Ok(()) => {
                    debug!("acquired exclusive lock {}", self.path.display());
                    return Ok(());
                }
                Err(e) if lock_is_held(&e) => {
                    if self.by_me() {
                        let _ = fs::remove_dir_all(temp_path);
                        return Ok(());
                    }
                    // A successful kill leaves the path free for the next
                    // round; retry without sleeping.
                    if self.kill_stale_lock()? {
                        continue;
                    }
                    if timer.timed_out_or_sleep() {
                        return Err(BorpError::LockTimeout(self.path.clone()));
                    }
                }
                Err(e) => return Err(BorpError::lock_failed(&self.path, e)),
            }
        }
    }

    /// Private directory holding our holder file, renamed onto the lock path
    /// once it is free.
    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(format!(".{}.tmp", self.id.to_filename()));
        self.path.with_file_name(name)
    }

    fn prepare_temp_dir(&self) -> Result<PathBuf> {
        let temp_path = self.temp_path();
        // Left over from a crashed attempt with the same id.
        if temp_path.exists() {
            fs::remove_dir_all(&temp_path).map_err(|e| BorpError::lock_failed(&self.path, e))?;
        }
        fs::create_dir(&temp_path).map_err(|e| BorpError::lock_failed(&self.path, e))?;
        if let Err(e) = File::create(temp_path.join(self.id.to_filename())) {
            let _ = fs::remove_dir_all(&temp_path);
            return Err(BorpError::lock_failed(&self.path, e));
        }
        Ok(temp_path)
    }

    /// Release the lock.
    ///
    /// Fails with `NotLocked` when the directory is gone and `NotMyLock` when
    /// someone else holds it.
    pub fn release(&self) -> Result<()> {
        if !self.is_locked() {
            return Err(BorpError::NotLocked(self.path.clone()));
        }
        if !self.by_me() {
            return Err(BorpError::NotMyLock(self.path.clone()));
        }

        fs::remove_file(&self.unique_name).map_err(|e| BorpError::lock_failed(&self.path, e))?;
        fs::remove_dir(&self.path).map_err(|e| BorpError::lock_failed(&self.path, e))?;
        debug!("released exclusive lock {}", self.path.display());
        Ok(())
    }

    pub fn is_locked(&self) -> bool {
        self.path.exists()
    }

    pub fn by_me(&self) -> bool {
        self.unique_name.exists()
    }

    /// List the entries of the lock directory.
    ///
    /// Each entry is the raw filename with its parsed id, `None` if the name
    /// is not a valid holder name.
    pub fn holders(&self) -> Result<Vec<(String, Option<ProcessId>)>> {
        let entries = match fs::read_dir(&self.path) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(BorpError::lock_failed(&self.path, e)),
        };

        let mut holders = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| BorpError::lock_failed(&self.path, e))?;
            let name = entry.file_name().to_string_lossy().to_string();
            let id = ProcessId::from_filename(&name);
            holders.push((name, id));
        }
        holders.sort();
        Ok(holders)
    }

    /// Remove the lock if every holder is a dead process on this host.
    ///
    /// Returns `true` if the lock directory was removed.
    pub fn kill_stale_lock(&mut self) -> Result<bool> {
        let holders = match self.holders() {
            Ok(holders) => holders,
            // The holder released before we could list it.
            Err(_) if !self.is_locked() => return Ok(true),
            Err(e) => {
                error!("Failed to read lock {}: {}", self.path.display(), e);
                return Ok(false);
            }
        };

        if holders.is_empty() {
            // Either just released, or another locker is between its mkdir
            // and creating its holder file. Never remove it.
            debug!("lock {} has no holder entry", self.path.display());
            return Ok(!self.is_locked());
        }

        for (name, id) in holders {
            let Some(id) = id else {
                error!(
                    "Found malformed lock {} in {}. Please check/fix manually.",
                    name,
                    self.path.display()
                );
                return Ok(false);
            };

            if process_alive(&id) {
                return Ok(false);
            }

            if !self.kill_stale_locks {
                if !self.stale_warning_printed {
                    error!(
                        "Found stale lock {}, but not deleting because kill_stale_locks is off.",
                        name
                    );
                    self.stale_warning_printed = true;
                }
                return Ok(false);
            }

            match fs::remove_file(self.path.join(&name)) {
                Ok(()) => warn!("Killed stale lock {}.", name),
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => {
                    error!("Failed to kill stale lock {}: {}", name, e);
                    return Ok(false);
                }
            }
        }

        match fs::remove_dir(&self.path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(true),
            // Another process re-locked it meanwhile (ENOTEMPTY and friends).
            Err(e) => {
                debug!("could not remove lock dir {}: {}", self.path.display(), e);
                Ok(false)
            }
        }
    }

    /// Forcibly remove the lock, whoever holds it.
    pub fn break_lock(&self) -> Result<()> {
        if !self.is_locked() {
            return Ok(());
        }
        for (name, _) in self.holders()? {
            fs::remove_file(self.path.join(&name))
                .map_err(|e| BorpError::lock_failed(&self.path, e))?;
        }
        fs::remove_dir(&self.path).map_err(|e| BorpError::lock_failed(&self.path, e))?;
        warn!("Broke exclusive lock {}.", self.path.display());
        Ok(())
    }

    /// Transfer ownership of the lock from `old_id` to `new_id`.
    ///
    /// Used when a lock taken by one process is handed over to another (for
    /// example after a fork). If the lock is not held by `old_id`, only the id
    /// is updated.
    pub fn migrate_lock(&mut self, old_id: &ProcessId, new_id: ProcessId) -> Result<()> {
        if &self.id != old_id {
            return Err(BorpError::NotMyLock(self.path.clone()));
        }

        let new_unique_name = self.path.join(new_id.to_filename());
        if self.is_locked() && self.by_me() {
            File::create(&new_unique_name).map_err(|e| BorpError::lock_failed(&self.path, e))?;
            fs::remove_file(&self.unique_name)
                .map_err(|e| BorpError::lock_failed(&self.path, e))?;
        }
        self.id = new_id;
        self.unique_name = new_unique_name;
        Ok(())
    }
}

/// Whether a failed rename onto the lock path means someone holds it.
fn lock_is_held(e: &std::io::Error) -> bool {
    matches!(
        e.kind(),
        ErrorKind::AlreadyExists | ErrorKind::DirectoryNotEmpty
    )
}
