//! Location resolution for Borg repositories and caches.
//!
//! Both a Borg repository and a Borg cache are directories holding a
//! `config` file and locked through `<dir>/lock`. The config's section name
//! tells the two apart: `[repository]` or `[cache]`.

use crate::config::{CACHE_SECTION, ConfigFile, REPOSITORY_SECTION};
use crate::error::{BorpError, Result};
use serde::Serialize;
use std::env;
use std::fmt;
use std::path::{Path, PathBuf};

/// Name of the config file inside a repository or cache.
pub const CONFIG_FILE: &str = "config";

/// Name of the lock path inside a repository or cache.
pub const LOCK_NAME: &str = "lock";

/// What kind of Borg directory a location is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationKind {
    Repository,
    Cache,
}

impl LocationKind {
    /// Name of the config section this kind owns.
    pub fn section(&self) -> &'static str {
        match self {
            LocationKind::Repository => REPOSITORY_SECTION,
            LocationKind::Cache => CACHE_SECTION,
        }
    }
}

impl fmt::Display for LocationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.section())
    }
}

/// A resolved repository or cache directory.
#[derive(Debug, Clone)]
pub struct BorgLocation {
    /// Absolute path to the directory.
    pub root: PathBuf,

    pub kind: LocationKind,
}

impl BorgLocation {
    /// Resolve the location from the current working directory.
    pub fn resolve() -> Result<Self> {
        let cwd = env::current_dir().map_err(|e| {
            BorpError::UserError(format!("failed to get current working directory: {}", e))
        })?;
        Self::resolve_from(&cwd)
    }

    /// Resolve the location at `dir`.
    ///
    /// # Returns
    ///
    /// * `Ok(BorgLocation)` - `dir/config` names a repository or cache
    /// * `Err(BorpError::UserError)` - No config, or neither section present
    /// * `Err(BorpError::ConfigParse)` - The config is not in Borg's format
    pub fn resolve_from<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref();
        let root = dir.canonicalize().map_err(|e| {
            BorpError::UserError(format!("cannot access '{}': {}", dir.display(), e))
        })?;

        let config_path = root.join(CONFIG_FILE);
        if !config_path.is_file() {
            return Err(BorpError::UserError(format!(
                "'{}' is not a Borg repository or cache.\n\
                 Expected a config file at: {}",
                root.display(),
                config_path.display()
            )));
        }

        let config = ConfigFile::load(&config_path)?;
        let kind = if config.has_section(REPOSITORY_SECTION) {
            LocationKind::Repository
        } else if config.has_section(CACHE_SECTION) {
            LocationKind::Cache
        } else {
            return Err(BorpError::UserError(format!(
                "'{}' has neither a [repository] nor a [cache] section",
                config_path.display()
            )));
        };

        Ok(Self { root, kind })
    }

    pub fn config_path(&self) -> PathBuf {
        self.root.join(CONFIG_FILE)
    }

    /// Lock path; the lock itself lives in `lock.exclusive` and `lock.roster`.
    pub fn lock_path(&self) -> PathBuf {
        self.root.join(LOCK_NAME)
    }

    pub fn load_config(&self) -> Result<ConfigFile> {
        ConfigFile::load(self.config_path())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{DirGuard, create_test_cache, create_test_repository};
    use serial_test::serial;
    use tempfile::TempDir;

    #[test]
    fn resolves_repository() {
        let temp = create_test_repository();
        let location = BorgLocation::resolve_from(temp.path()).unwrap();

        assert_eq!(location.kind, LocationKind::Repository);
        assert_eq!(location.root, temp.path().canonicalize().unwrap());
        assert!(location.config_path().ends_with("config"));
        assert!(location.lock_path().ends_with("lock"));
        assert!(location.load_config().unwrap().has_section("repository"));
    }

    #[test]
    fn resolves_cache() {
        let temp = create_test_cache();
        let location = BorgLocation::resolve_from(temp.path()).unwrap();
        assert_eq!(location.kind, LocationKind::Cache);
        assert_eq!(location.kind.section(), "cache");
    }

    #[test]
    fn rejects_directory_without_config() {
        let temp = TempDir::new().unwrap();
        let err = BorgLocation::resolve_from(temp.path()).unwrap_err();
        assert!(err.to_string().contains("is not a Borg repository or cache"));
    }

    #[test]
    fn rejects_missing_directory() {
        let temp = TempDir::new().unwrap();
        assert!(matches!(
            BorgLocation::resolve_from(temp.path().join("gone")),
            Err(BorpError::UserError(_))
        ));
    }

    #[test]
    fn rejects_unknown_section() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("config"), "[other]\nx = 1\n").unwrap();
        assert!(matches!(
            BorgLocation::resolve_from(temp.path()),
            Err(BorpError::UserError(_))
        ));
    }

    #[test]
    fn reports_parse_errors() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("config"), "no section\n").unwrap();
        assert!(matches!(
            BorgLocation::resolve_from(temp.path()),
            Err(BorpError::ConfigParse { line: 1, .. })
        ));
    }

    #[test]
    #[serial]
    fn resolves_from_current_directory() {
        let temp = create_test_repository();
        let _guard = DirGuard::new(temp.path());

        let location = BorgLocation::resolve().unwrap();
        assert_eq!(location.kind, LocationKind::Repository);
        assert_eq!(location.root, temp.path().canonicalize().unwrap());
    }
}
