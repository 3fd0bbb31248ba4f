//! Lock acquisition, inspection, and breaking operations.

use super::exclusive::ExclusiveLock;
use super::guard::LockGuard;
use super::lock::{EXCLUSIVE_SUFFIX, Lock, ROSTER_SUFFIX, with_suffix};
use super::metadata::{HolderInfo, modified_at};
use super::roster::{LockRoster, RosterKind};
use super::types::{LockInfo, LockMode, LockOptions};
use crate::context::BorgLocation;
use crate::error::Result;
use crate::process_id::{ProcessId, get_process_id};
use std::path::Path;

/// Acquire the lock at `lock_path` for the current process.
///
/// # Returns
///
/// * `Ok(LockGuard)` - Lock held until the guard is dropped or released
/// * `Err(BorpError::LockTimeout)` - Still held by someone else after the timeout
/// * `Err(BorpError::LockFailed)` - The lock files could not be created
pub fn acquire_lock(lock_path: &Path, mode: LockMode, options: &LockOptions) -> Result<LockGuard> {
    let mut lock = Lock::new(lock_path, mode, options.clone())?;
    lock.acquire()?;
    Ok(LockGuard::new(lock))
}

/// Acquire the lock of a repository or cache directory.
pub fn acquire_location_lock(
    location: &BorgLocation,
    mode: LockMode,
    options: &LockOptions,
) -> Result<LockGuard> {
    acquire_lock(&location.lock_path(), mode, options)
}

/// Inspect the lock at `lock_path` without modifying it.
pub fn lock_info(lock_path: &Path) -> Result<LockInfo> {
    // Inspection never kills anything, so any id will do for the handles.
    let id = get_process_id().unwrap_or_else(|_| ProcessId::new("unknown", 0, 0));
    let exclusive_path = with_suffix(lock_path, EXCLUSIVE_SUFFIX);
    let exclusive = ExclusiveLock::new(&exclusive_path, id.clone(), false);
    let roster = LockRoster::new(with_suffix(lock_path, ROSTER_SUFFIX), id, false);

    let holders = exclusive
        .holders()?
        .into_iter()
        .map(|(name, id)| HolderInfo::new(name, id))
        .collect();
    let mut data = roster.load()?;

    Ok(LockInfo {
        path: lock_path.to_path_buf(),
        locked: exclusive.is_locked(),
        locked_since: modified_at(&exclusive_path),
        holders,
        shared: data
            .remove(&RosterKind::Shared)
            .unwrap_or_default()
            .into_iter()
            .collect(),
        exclusive: data
            .remove(&RosterKind::Exclusive)
            .unwrap_or_default()
            .into_iter()
            .collect(),
    })
}

/// Forcibly remove the lock at `lock_path`, whoever holds it.
///
/// Returns the state of the lock before it was broken. The caller is
/// responsible for making sure no holder is still running.
pub fn break_lock(lock_path: &Path) -> Result<LockInfo> {
    let info = lock_info(lock_path)?;
    let id = get_process_id()?;
    Lock::with_id(lock_path, LockMode::Exclusive, LockOptions::default(), id).break_lock()?;
    Ok(info)
}
