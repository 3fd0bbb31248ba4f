//! Lock type definitions and information structures.

use super::metadata::{HolderInfo, age_string};
use crate::process_id::ProcessId;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Default pause between acquisition attempts.
pub const DEFAULT_SLEEP: Duration = Duration::from_millis(200);

/// How a lock is held.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LockMode {
    /// Any number of readers.
    Shared,
    /// A single writer, no readers.
    Exclusive,
}

impl LockMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            LockMode::Shared => "shared",
            LockMode::Exclusive => "exclusive",
        }
    }
}

impl fmt::Display for LockMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tunables for lock acquisition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockOptions {
    /// How long to wait for the lock. `None` waits forever.
    pub timeout: Option<Duration>,

    /// Pause between acquisition attempts.
    pub sleep: Duration,

    /// Remove lock entries left behind by dead processes on this host.
    pub kill_stale_locks: bool,
}

impl Default for LockOptions {
    fn default() -> Self {
        Self {
            timeout: None,
            sleep: DEFAULT_SLEEP,
            kill_stale_locks: false,
        }
    }
}

impl LockOptions {
    /// Options with a timeout, in seconds.
    ///
    /// Negative and NaN values mean no wait at all. A timeout too large for
    /// a `Duration` (including infinity) waits forever.
    pub fn with_timeout_secs(secs: f64) -> Self {
        let timeout = if secs.is_nan() || secs <= 0.0 {
            Some(Duration::ZERO)
        } else {
            Duration::try_from_secs_f64(secs).ok()
        };
        Self {
            timeout,
            ..Self::default()
        }
    }
}

/// Snapshot of a lock's on-disk state.
#[derive(Debug, Clone, Serialize)]
pub struct LockInfo {
    /// The lock path (e.g. `<repo>/lock`).
    pub path: PathBuf,

    /// Whether the exclusive lock directory exists.
    pub locked: bool,

    /// When the exclusive lock directory was created.
    pub locked_since: Option<DateTime<Utc>>,

    /// Entries found in the exclusive lock directory.
    pub holders: Vec<HolderInfo>,

    /// Shared holders listed in the roster.
    pub shared: Vec<ProcessId>,

    /// Exclusive holders listed in the roster.
    pub exclusive: Vec<ProcessId>,
}

impl LockInfo {
    /// Nothing is recorded on disk for this lock.
    pub fn is_free(&self) -> bool {
        !self.locked && self.shared.is_empty() && self.exclusive.is_empty()
    }

    /// Some holder is known to be a dead process on this host.
    pub fn is_stale(&self) -> bool {
        self.holders.iter().any(|h| h.alive == Some(false))
    }
}

impl fmt::Display for LockInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path.display())?;
        if self.is_free() {
            return write!(f, " (unlocked)");
        }
        write!(
            f,
            " (shared: {}, exclusive: {}",
            self.shared.len(),
            self.exclusive.len()
        )?;
        if let Some(since) = self.locked_since {
            write!(f, ", locked for {}", age_string(since))?;
        }
        write!(f, "{})", if self.is_stale() { ", STALE" } else { "" })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_from_secs() {
        assert_eq!(
            LockOptions::with_timeout_secs(1.5).timeout,
            Some(Duration::from_millis(1500))
        );
        assert_eq!(LockOptions::with_timeout_secs(0.0).timeout, Some(Duration::ZERO));
        assert_eq!(LockOptions::with_timeout_secs(-3.0).timeout, Some(Duration::ZERO));
        assert_eq!(LockOptions::with_timeout_secs(f64::NAN).timeout, Some(Duration::ZERO));
    }

    #[test]
    fn huge_timeout_waits_forever() {
        assert_eq!(LockOptions::with_timeout_secs(f64::INFINITY).timeout, None);
        assert_eq!(LockOptions::with_timeout_secs(1e30).timeout, None);

        let options = LockOptions::with_timeout_secs(1e30);
        assert_eq!(options.sleep, DEFAULT_SLEEP);
        assert!(!options.kill_stale_locks);
    }
}
