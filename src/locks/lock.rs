//! Shared/exclusive lock on a Borg repository or cache.
//!
//! A `Lock` for path `P` combines two on-disk structures:
//! - `P.exclusive`: an [`ExclusiveLock`] held while the roster is queried or
//!   updated, and for as long as the `Lock` itself is exclusive
//! - `P.roster`: a [`LockRoster`] listing shared and exclusive holders
//!
//! Many processes can hold a shared lock at once. An exclusive lock waits
//! until there are no shared holders and then keeps `P.exclusive`, which
//! also keeps new shared holders out.

use super::exclusive::ExclusiveLock;
use super::roster::{LockRoster, RosterKind, RosterOp};
use super::timer::TimeoutTimer;
use super::types::{LockMode, LockOptions};
use crate::error::{BorpError, Result};
use crate::process_id::ProcessId;
use log::debug;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Suffix of the exclusive lock directory next to the lock path.
pub const EXCLUSIVE_SUFFIX: &str = ".exclusive";

/// Suffix of the roster file next to the lock path.
pub const ROSTER_SUFFIX: &str = ".roster";

/// Append `suffix` to the last component of `path`.
pub(crate) fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}

#[derive(Debug)]
pub struct Lock {
    path: PathBuf,
    id: ProcessId,
    mode: LockMode,
    options: LockOptions,
    roster: LockRoster,
    exclusive: ExclusiveLock,
}

impl Lock {
    /// Create a lock handle for the current process. Nothing is acquired yet.
    pub fn new(path: impl Into<PathBuf>, mode: LockMode, options: LockOptions) -> Result<Self> {
        let id = crate::process_id::get_process_id()?;
        Ok(Self::with_id(path, mode, options, id))
    }

    /// Create a lock handle for an explicit process id.
    pub fn with_id(
        path: impl Into<PathBuf>,
        mode: LockMode,
        options: LockOptions,
        id: ProcessId,
    ) -> Self {
        let path = path.into();
        let roster = LockRoster::new(
            with_suffix(&path, ROSTER_SUFFIX),
            id.clone(),
            options.kill_stale_locks,
        );
        let exclusive = ExclusiveLock::new(
            with_suffix(&path, EXCLUSIVE_SUFFIX),
            id.clone(),
            options.kill_stale_locks,
        );
        Self {
            path,
            id,
            mode,
            options,
            roster,
            exclusive,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn id(&self) -> &ProcessId {
        &self.id
    }

    pub fn mode(&self) -> LockMode {
        self.mode
    }

    pub fn is_exclusive(&self) -> bool {
        self.mode == LockMode::Exclusive
    }

    /// Acquire the lock in the mode it was created with.
    pub fn acquire(&mut self) -> Result<()> {
        self.acquire_mode(self.mode, None)
    }

    /// Acquire in `mode`, optionally dropping our entry under `remove` in the
    /// same roster update (used to switch modes).
    fn acquire_mode(&mut self, mode: LockMode, remove: Option<RosterKind>) -> Result<()> {
        match mode {
            LockMode::Exclusive => {
                self.wait_for_readers_finishing(remove)?;
                if let Err(e) = self.roster.modify(RosterKind::Exclusive, RosterOp::Add) {
                    let _ = self.exclusive.release();
                    return Err(e);
                }
            }
            LockMode::Shared => {
                self.take_exclusive()?;
                let result = self.update_shared(remove);
                let released = self.exclusive.release();
                result?;
                released?;
            }
        }
        self.mode = mode;
        debug!("acquired {} lock {}", mode, self.path.display());
        Ok(())
    }

    fn update_shared(&self, remove: Option<RosterKind>) -> Result<()> {
        if let Some(kind) = remove {
            self.roster.modify(kind, RosterOp::Remove)?;
        }
        self.roster.modify(RosterKind::Shared, RosterOp::Add)
    }

    fn take_exclusive(&mut self) -> Result<()> {
        self.exclusive
            .acquire(self.options.timeout, self.options.sleep)
    }

    /// Take `P.exclusive` and keep it once no shared holder is left.
    fn wait_for_readers_finishing(&mut self, remove: Option<RosterKind>) -> Result<()> {
        let timer = TimeoutTimer::start(self.options.timeout, self.options.sleep);
        loop {
            self.take_exclusive()?;

            match self.readers_gone(remove) {
                // We are the only one and we keep the lock.
                Ok(true) => return Ok(()),
                Ok(false) => self.exclusive.release()?,
                Err(e) => {
                    let _ = self.exclusive.release();
                    return Err(e);
                }
            }

            if timer.timed_out_or_sleep() {
                return Err(BorpError::LockTimeout(self.path.clone()));
            }
        }
    }

    /// Apply the pending removal and check for shared holders, undoing the
    /// removal if any are left.
    fn readers_gone(&self, remove: Option<RosterKind>) -> Result<bool> {
        if let Some(kind) = remove {
            self.roster.modify(kind, RosterOp::Remove)?;
        }
        if self.roster.get(RosterKind::Shared)?.is_empty() {
            return Ok(true);
        }
        if let Some(kind) = remove {
            self.roster.modify(kind, RosterOp::Add)?;
        }
        Ok(false)
    }

    /// Release the lock.
    pub fn release(&mut self) -> Result<()> {
        match self.mode {
            LockMode::Exclusive => {
                let result = self.drop_roster_entry(RosterKind::Exclusive);
                self.exclusive.release()?;
                result?;
            }
            LockMode::Shared => {
                self.take_exclusive()?;
                let result = self.drop_roster_entry(RosterKind::Shared);
                self.exclusive.release()?;
                result?;
            }
        }
        debug!("released {} lock {}", self.mode, self.path.display());
        Ok(())
    }

    fn drop_roster_entry(&self, kind: RosterKind) -> Result<()> {
        self.roster.modify(kind, RosterOp::Remove)?;
        if self
            .roster
            .empty(&[RosterKind::Exclusive, RosterKind::Shared])?
        {
            self.roster.remove()?;
        }
        Ok(())
    }

    /// Turn a held shared lock into an exclusive one.
    ///
    /// Two shared holders upgrading at the same time wait for each other
    /// until one of them times out.
    pub fn upgrade(&mut self) -> Result<()> {
        if self.mode == LockMode::Shared {
            self.acquire_mode(LockMode::Exclusive, Some(RosterKind::Shared))?;
        }
        Ok(())
    }

    /// Turn a held exclusive lock into a shared one, letting other readers in.
    pub fn downgrade(&mut self) -> Result<()> {
        if self.mode == LockMode::Exclusive {
            // P.exclusive is already ours, so the shared path re-enters it
            // and releases it at the end.
            self.acquire_mode(LockMode::Shared, Some(RosterKind::Exclusive))?;
        }
        Ok(())
    }

    /// Whether this handle currently holds the lock exclusively.
    pub fn got_exclusive_lock(&self) -> bool {
        self.is_exclusive() && self.exclusive.is_locked() && self.exclusive.by_me()
    }

    /// Forcibly remove the roster and the exclusive directory.
    pub fn break_lock(&self) -> Result<()> {
        self.roster.remove()?;
        self.exclusive.break_lock()
    }

    /// Hand a held lock over from `old_id` to `new_id`.
    pub fn migrate_lock(&mut self, old_id: &ProcessId, new_id: ProcessId) -> Result<()> {
        if &self.id != old_id {
            return Err(BorpError::NotMyLock(self.path.clone()));
        }

        match self.mode {
            LockMode::Exclusive => {
                self.exclusive.migrate_lock(old_id, new_id.clone())?;
                self.roster
                    .migrate_lock(RosterKind::Exclusive, old_id, new_id.clone())?;
            }
            LockMode::Shared => {
                self.take_exclusive()?;
                let result = self
                    .exclusive
                    .migrate_lock(old_id, new_id.clone())
                    .and_then(|()| {
                        self.roster
                            .migrate_lock(RosterKind::Shared, old_id, new_id.clone())
                    });
                self.exclusive.release()?;
                result?;
            }
        }
        self.id = new_id;
        Ok(())
    }
}
