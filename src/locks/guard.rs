//! RAII lock guard implementation.

use super::lock::Lock;
use crate::error::Result;
use crate::process_id::ProcessId;
use log::warn;
use std::path::Path;

/// RAII guard for an acquired [`Lock`].
///
/// When dropped, the lock is released. If releasing fails, a warning is
/// logged but no panic occurs.
#[derive(Debug)]
pub struct LockGuard {
    lock: Lock,

    /// Whether the lock has been released manually.
    released: bool,
}

impl LockGuard {
    /// Wrap a lock that has already been acquired.
    pub(super) fn new(lock: Lock) -> Self {
        Self {
            lock,
            released: false,
        }
    }

    /// Get the lock path.
    pub fn path(&self) -> &Path {
        self.lock.path()
    }

    pub fn id(&self) -> &ProcessId {
        self.lock.id()
    }

    pub fn is_exclusive(&self) -> bool {
        self.lock.is_exclusive()
    }

    pub fn got_exclusive_lock(&self) -> bool {
        self.lock.got_exclusive_lock()
    }

    /// Upgrade a shared lock to exclusive.
    pub fn upgrade(&mut self) -> Result<()> {
        self.lock.upgrade()
    }

    /// Downgrade an exclusive lock to shared.
    pub fn downgrade(&mut self) -> Result<()> {
        self.lock.downgrade()
    }

    /// Manually release the lock, handling errors explicitly.
    pub fn release(mut self) -> Result<()> {
        self.released = true;
        self.lock.release()
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        if !self.released
            && let Err(e) = self.lock.release()
        {
            warn!(
                "failed to release lock '{}': {}",
                self.lock.path().display(),
                e
            );
        }
    }
}
