//! Process identifiers used to name lock holders.
//!
//! Borg identifies a lock holder by `(host, pid, thread)`. The same triple is
//! stored as a JSON array in the lock roster and encoded as a filename inside
//! the exclusive lock directory (`host.pid-thread`, thread in hex).

use crate::error::{BorpError, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;

/// Environment variable that overrides the host part of the process id.
pub const HOST_ID_ENV: &str = "BORG_HOST_ID";

static FILENAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    // Hostnames may contain dots and dashes, so anchor on the last ones.
    Regex::new(r"^(?P<host>.+)\.(?P<pid>[0-9]+)-(?P<thread>[0-9a-fA-F]+)$")
        .unwrap_or_else(|e| panic!("invalid lock filename pattern: {}", e))
});

/// An identifier for a lock holder: hostname, pid, and thread id.
///
/// Serialized as a three-element JSON array, matching Borg's roster format.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ProcessId(pub String, pub u32, pub u64);

impl ProcessId {
    pub fn new(host: impl Into<String>, pid: u32, thread: u64) -> Self {
        Self(host.into(), pid, thread)
    }

    pub fn host(&self) -> &str {
        &self.0
    }

    pub fn pid(&self) -> u32 {
        self.1
    }

    pub fn thread(&self) -> u64 {
        self.2
    }

    /// Representation of this id suitable for use as a filename inside a
    /// lock directory.
    pub fn to_filename(&self) -> String {
        format!("{}.{}-{:x}", self.0, self.1, self.2)
    }

    /// Parse a lock directory entry name back into an id.
    ///
    /// Returns `None` for names that are not in `host.pid-thread` form.
    pub fn from_filename(name: &str) -> Option<Self> {
        let caps = FILENAME_RE.captures(name)?;
        let pid = caps["pid"].parse().ok()?;
        let thread = u64::from_str_radix(&caps["thread"], 16).ok()?;
        Some(Self(caps["host"].to_string(), pid, thread))
    }
}

impl fmt::Display for ProcessId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} pid {} thread {}", self.0, self.1, self.2)
    }
}

/// Get the id of the current process.
///
/// The host part is `BORG_HOST_ID` when set, otherwise the hostname. The
/// thread id is always zero.
pub fn get_process_id() -> Result<ProcessId> {
    let host = host_id(std::env::var(HOST_ID_ENV).ok())?;
    Ok(ProcessId(host, std::process::id(), 0))
}

fn host_id(override_id: Option<String>) -> Result<String> {
    if let Some(id) = override_id.filter(|id| !id.is_empty()) {
        return Ok(id);
    }

    hostname::get()
        .map(|h| h.to_string_lossy().to_string())
        .map_err(|e| BorpError::UserError(format!("failed to get hostname: {}", e)))
}

/// Check whether the process holding a lock might still be running.
///
/// Processes on other hosts cannot be checked and are assumed alive, as is
/// everything when our own host id cannot be determined.
pub fn process_alive(id: &ProcessId) -> bool {
    match host_id(std::env::var(HOST_ID_ENV).ok()) {
        Ok(ours) if ours == id.host() => local_pid_alive(id.pid()),
        _ => true,
    }
}

#[cfg(unix)]
fn local_pid_alive(pid: u32) -> bool {
    let Ok(pid) = libc::pid_t::try_from(pid) else {
        return false;
    };
    if pid <= 0 {
        return false;
    }

    if unsafe { libc::kill(pid, 0) } == 0 {
        return true;
    }
    let err = std::io::Error::last_os_error();
    // EPERM means the process exists but belongs to someone else.
    err.raw_os_error() != Some(libc::ESRCH)
}

#[cfg(not(unix))]
fn local_pid_alive(_pid: u32) -> bool {
    true
}
