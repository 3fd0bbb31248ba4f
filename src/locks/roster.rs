//! The lock roster: a JSON record of who holds a lock and how.
//!
//! ```json
//! {"shared": [["host", 1234, 0]], "exclusive": []}
//! ```
//!
//! The roster is only modified while the exclusive lock directory is held.

use crate::error::{BorpError, Result};
use crate::fs::atomic_write_file;
use crate::process_id::{ProcessId, process_alive};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Which list of holders a roster entry belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RosterKind {
    Shared,
    Exclusive,
}

impl RosterKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RosterKind::Shared => "shared",
            RosterKind::Exclusive => "exclusive",
        }
    }
}

impl fmt::Display for RosterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Modification applied to the roster.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RosterOp {
    Add,
    Remove,
}

/// Contents of a roster file, keyed by `shared` / `exclusive`.
pub type RosterData = BTreeMap<RosterKind, BTreeSet<ProcessId>>;

/// Handle to a roster file for one process id.
#[derive(Debug)]
pub struct LockRoster {
    path: PathBuf,
    id: ProcessId,
    kill_stale_locks: bool,
}

impl LockRoster {
    pub fn new(path: impl Into<PathBuf>, id: ProcessId, kill_stale_locks: bool) -> Self {
        Self {
            path: path.into(),
            id,
            kill_stale_locks,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn id(&self) -> &ProcessId {
        &self.id
    }

    /// Load the roster.
    ///
    /// A missing, empty, or corrupt roster file reads as an empty roster.
    /// With `kill_stale_locks`, entries of dead local processes are dropped.
    pub fn load(&self) -> Result<RosterData> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(RosterData::new()),
            Err(e) => return Err(BorpError::lock_failed(&self.path, e)),
        };

        let mut data: RosterData = match serde_json::from_str(&content) {
            Ok(data) => data,
            Err(e) => {
                debug!("ignoring unreadable roster {}: {}", self.path.display(), e);
                return Ok(RosterData::new());
            }
        };

        if self.kill_stale_locks {
            for (kind, entries) in data.iter_mut() {
                entries.retain(|id| {
                    let alive = process_alive(id);
                    if !alive {
                        warn!(
                            "Removed stale {} roster lock for host {} pid {} thread {}.",
                            kind,
                            id.host(),
                            id.pid(),
                            id.thread()
                        );
                    }
                    alive
                });
            }
        }

        Ok(data)
    }

    pub fn save(&self, data: &RosterData) -> Result<()> {
        let json = serde_json::to_string(data).map_err(|e| {
            BorpError::lock_failed(&self.path, format!("failed to serialize roster: {}", e))
        })?;
        atomic_write_file(&self.path, &json)
            .map_err(|e| BorpError::lock_failed(&self.path, e))
    }

    /// Delete the roster file. A missing file is not an error.
    pub fn remove(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(BorpError::lock_failed(&self.path, e)),
        }
    }

    pub fn get(&self, kind: RosterKind) -> Result<BTreeSet<ProcessId>> {
        Ok(self.load()?.remove(&kind).unwrap_or_default())
    }

    /// Check that every listed kind has no holders.
    pub fn empty(&self, kinds: &[RosterKind]) -> Result<bool> {
        let data = self.load()?;
        Ok(kinds
            .iter()
            .all(|kind| data.get(kind).is_none_or(|entries| entries.is_empty())))
    }

    /// Add or remove our id under `kind`.
    ///
    /// Removing an id that is not present fails with `NotLocked`.
    pub fn modify(&self, kind: RosterKind, op: RosterOp) -> Result<()> {
        let mut data = self.load()?;
        let entries = data.entry(kind).or_default();
        match op {
            RosterOp::Add => {
                entries.insert(self.id.clone());
            }
            RosterOp::Remove => {
                if !entries.remove(&self.id) {
                    return Err(BorpError::NotLocked(self.path.clone()));
                }
            }
        }
        debug!(
            "roster {}: {:?} {} for {}",
            self.path.display(),
            op,
            kind,
            self.id
        );
        self.save(&data)
    }

    /// Replace `old_id` by `new_id` under `kind`.
    ///
    /// Stale killing is suspended so that the entry being migrated is moved
    /// rather than dropped. If `old_id` was not listed, only our id changes.
    pub fn migrate_lock(
        &mut self,
        kind: RosterKind,
        old_id: &ProcessId,
        new_id: ProcessId,
    ) -> Result<()> {
        if &self.id != old_id {
            return Err(BorpError::NotMyLock(self.path.clone()));
        }

        let killing = std::mem::replace(&mut self.kill_stale_locks, false);
        let result = match self.modify(kind, RosterOp::Remove) {
            Ok(()) => {
                self.id = new_id;
                self.modify(kind, RosterOp::Add)
            }
            Err(BorpError::NotLocked(_)) => {
                self.id = new_id;
                Ok(())
            }
            Err(e) => Err(e),
        };
        self.kill_stale_locks = killing;
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process_id::get_process_id;
    use tempfile::TempDir;

    fn roster(temp: &TempDir, pid: u32) -> LockRoster {
        LockRoster::new(
            temp.path().join("lock.roster"),
            ProcessId::new("test-host-not-local", pid, 0),
            false,
        )
    }

    #[test]
    fn missing_roster_is_empty() {
        let temp = TempDir::new().unwrap();
        let roster = roster(&temp, 1);

        assert!(roster.load().unwrap().is_empty());
        assert!(roster.empty(&[RosterKind::Shared, RosterKind::Exclusive]).unwrap());
    }

    #[test]
    fn corrupt_roster_is_empty() {
        let temp = TempDir::new().unwrap();
        let roster = roster(&temp, 1);
        fs::write(roster.path(), "{not json").unwrap();
        assert!(roster.load().unwrap().is_empty());

        fs::write(roster.path(), "").unwrap();
        assert!(roster.load().unwrap().is_empty());
    }

    #[test]
    fn add_and_remove_entries() {
        let temp = TempDir::new().unwrap();
        let first = roster(&temp, 1);
        let second = roster(&temp, 2);

        first.modify(RosterKind::Shared, RosterOp::Add).unwrap();
        second.modify(RosterKind::Shared, RosterOp::Add).unwrap();
        assert_eq!(first.get(RosterKind::Shared).unwrap().len(), 2);
        assert!(first.get(RosterKind::Exclusive).unwrap().is_empty());

        first.modify(RosterKind::Shared, RosterOp::Remove).unwrap();
        let shared = second.get(RosterKind::Shared).unwrap();
        assert_eq!(shared.into_iter().collect::<Vec<_>>(), vec![second.id().clone()]);
    }

    #[test]
    fn removing_absent_entry_fails() {
        let temp = TempDir::new().unwrap();
        let roster = roster(&temp, 1);

        assert!(matches!(
            roster.modify(RosterKind::Exclusive, RosterOp::Remove),
            Err(BorpError::NotLocked(_))
        ));
    }

    #[test]
    fn file_format_matches_borg() {
        let temp = TempDir::new().unwrap();
        let roster = roster(&temp, 7);
        roster.modify(RosterKind::Exclusive, RosterOp::Add).unwrap();

        let json = fs::read_to_string(roster.path()).unwrap();
        assert_eq!(json, r#"{"exclusive":[["test-host-not-local",7,0]]}"#);
    }

    #[test]
    fn reads_roster_written_by_borg() {
        let temp = TempDir::new().unwrap();
        let roster = roster(&temp, 1);
        fs::write(
            roster.path(),
            r#"{"shared": [["borghost@123456", 4242, 0]], "exclusive": []}"#,
        )
        .unwrap();

        let shared = roster.get(RosterKind::Shared).unwrap();
        assert!(shared.contains(&ProcessId::new("borghost@123456", 4242, 0)));
        assert!(roster.empty(&[RosterKind::Exclusive]).unwrap());
        assert!(!roster.empty(&[RosterKind::Shared]).unwrap());
    }

    #[cfg(unix)]
    #[test]
    fn stale_entries_are_dropped_when_killing() {
        let temp = TempDir::new().unwrap();
        let me = get_process_id().unwrap();
        let dead = ProcessId::new(me.host(), 999_999_999, 0);
        let path = temp.path().join("lock.roster");

        let dead_roster = LockRoster::new(&path, dead, false);
        dead_roster.modify(RosterKind::Shared, RosterOp::Add).unwrap();

        let polite = LockRoster::new(&path, me.clone(), false);
        assert_eq!(polite.get(RosterKind::Shared).unwrap().len(), 1);

        let killer = LockRoster::new(&path, me, true);
        assert!(killer.get(RosterKind::Shared).unwrap().is_empty());
    }

    #[test]
    fn migrate_replaces_entry() {
        let temp = TempDir::new().unwrap();
        let mut roster = roster(&temp, 1);
        let old = roster.id().clone();
        let new = ProcessId::new("test-host-not-local", 2, 0);
        roster.modify(RosterKind::Shared, RosterOp::Add).unwrap();

        roster
            .migrate_lock(RosterKind::Shared, &old, new.clone())
            .unwrap();

        let shared = roster.get(RosterKind::Shared).unwrap();
        assert!(shared.contains(&new));
        assert!(!shared.contains(&old));
        assert_eq!(roster.id(), &new);
    }

    #[test]
    fn migrate_without_entry_only_updates_id() {
        let temp = TempDir::new().unwrap();
        let mut roster = roster(&temp, 1);
        let old = roster.id().clone();
        let new = ProcessId::new("test-host-not-local", 2, 0);

        roster
            .migrate_lock(RosterKind::Exclusive, &old, new.clone())
            .unwrap();

        assert_eq!(roster.id(), &new);
        assert!(roster.get(RosterKind::Exclusive).unwrap().is_empty());
    }

    #[test]
    fn remove_is_idempotent() {
        let temp = TempDir::new().unwrap();
        let roster = roster(&temp, 1);
        roster.modify(RosterKind::Shared, RosterOp::Add).unwrap();

        roster.remove().unwrap();
        assert!(!roster.path().exists());
        roster.remove().unwrap();
    }
}
