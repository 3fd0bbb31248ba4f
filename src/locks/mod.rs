//! Borg-compatible locking.
//!
//! Borg locks a repository or cache directory through two files next to a
//! lock path `P` (normally `<dir>/lock`):
//! - `P.exclusive/`: created with `mkdir`, whose atomicity provides mutual
//!   exclusion. The holder puts an empty `host.pid-thread` file inside.
//! - `P.roster`: JSON listing `shared` and `exclusive` holders as
//!   `[host, pid, thread]` triples.
//!
//! # Stale Locks
//!
//! A holder whose process no longer exists on this host is stale. Stale
//! entries are only removed when `kill_stale_locks` is set; holders on other
//! hosts are always assumed alive.
//!
//! # RAII Guards
//!
//! [`acquire_lock`] returns a [`LockGuard`] that releases the lock when
//! dropped. If releasing fails during drop, a warning is logged but the
//! program does not crash.

mod exclusive;
mod guard;
mod lock;
mod metadata;
mod operations;
mod roster;
mod timer;
mod types;


// Re-export public API
pub use exclusive::ExclusiveLock;
pub use guard::LockGuard;
pub use lock::{EXCLUSIVE_SUFFIX, Lock, ROSTER_SUFFIX};
pub use metadata::{HolderInfo, age_string};
pub use operations::{acquire_location_lock, acquire_lock, break_lock, lock_info};
pub use roster::{LockRoster, RosterData, RosterKind, RosterOp};
pub use timer::TimeoutTimer;
pub use types::{DEFAULT_SLEEP, LockInfo, LockMode, LockOptions};
