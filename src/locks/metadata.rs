//! Holder metadata read back from the lock directory.

use crate::process_id::{ProcessId, process_alive};
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::fs;
use std::path::Path;

/// One entry of an exclusive lock directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HolderInfo {
    /// Raw filename (`host.pid-thread`).
    pub name: String,

    /// Parsed id, `None` for a malformed name.
    pub id: Option<ProcessId>,

    /// Liveness of the holder, `None` when the name could not be parsed.
    pub alive: Option<bool>,
}

impl HolderInfo {
    pub fn new(name: String, id: Option<ProcessId>) -> Self {
        let alive = id.as_ref().map(process_alive);
        Self { name, id, alive }
    }
}

/// Modification time of a path, if it exists.
pub fn modified_at<P: AsRef<Path>>(path: P) -> Option<DateTime<Utc>> {
    let modified = fs::metadata(path).and_then(|m| m.modified()).ok()?;
    Some(DateTime::<Utc>::from(modified))
}

/// Time elapsed since `since`.
pub fn age(since: DateTime<Utc>) -> Duration {
    Utc::now().signed_duration_since(since)
}

/// Format the time elapsed since `since` as a human-readable string.
pub fn age_string(since: DateTime<Utc>) -> String {
    let age = age(since);
    let minutes = age.num_minutes();
    let hours = age.num_hours();
    let days = age.num_days();

    if days > 0 {
        format!("{}d {}h", days, hours % 24)
    } else if hours > 0 {
        format!("{}h {}m", hours, minutes % 60)
    } else if minutes > 0 {
        format!("{}m", minutes)
    } else {
        format!("{}s", age.num_seconds().max(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn age_string_units() {
        assert!(age_string(Utc::now()).ends_with('s'));
        assert_eq!(age_string(Utc::now() - Duration::minutes(5)), "5m");
        assert!(age_string(Utc::now() - Duration::hours(2)).starts_with("2h"));
        assert!(age_string(Utc::now() - Duration::days(3)).starts_with("3d"));
    }

    #[test]
    fn modified_at_of_fresh_dir_is_recent() {
        let temp = TempDir::new().unwrap();
        let ts = modified_at(temp.path()).unwrap();
        assert!(age(ts).num_minutes() < 1);
        assert!(modified_at(temp.path().join("missing")).is_none());
    }

    #[test]
    fn malformed_holder_has_unknown_liveness() {
        let holder = HolderInfo::new("junk".to_string(), None);
        assert_eq!(holder.alive, None);

        let holder = HolderInfo::new(
            "elsewhere.1-0".to_string(),
            Some(ProcessId::new("elsewhere", 1, 0)),
        );
        assert_eq!(holder.alive, Some(true));
    }
}
