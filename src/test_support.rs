use std::path::{Path, PathBuf};
use std::sync::{LazyLock, Mutex, MutexGuard};
use tempfile::TempDir;

pub(crate) const REPOSITORY_ID: &str =
    "6b26ded2a1243ef71746acba4b9f384481764d5a6f62267600dc9b7f682c80e5";

pub(crate) const MANIFEST_ID: &str =
    "05b3abf2579a5eb66403cd78be557fd860633a1fe2103c7642030defe32c657f";

/// A repository config as Borg 1.1 writes it, repokey included.
pub(crate) const REPOSITORY_CONFIG: &str = "[repository]
version = 1
segments_per_dir = 1000
max_segment_size = 524288000
append_only = 0
storage_quota = 0
additional_free_space = 0
id = 6b26ded2a1243ef71746acba4b9f384481764d5a6f62267600dc9b7f682c80e5
key = Ym9ycCByZXBva2V5IHRlc3QgbWF0ZXJpYWwsIG5vdCBhIHJlYWwga2V5LiBib3JwIHJlcG
\t9rZXkgdGVzdCBtYXRlcmlhbCwgbm90IGEgcmVhbCBrZXkuIGJvcnAgcmVwb2tleSB0ZXN0
\tIG1hdGVyaWFsLCBub3QgYSByZWFsIGtleS4g

";

pub(crate) const KEY_MATERIAL: &[u8] = b"borp repokey test material, not a real key. \
borp repokey test material, not a real key. \
borp repokey test material, not a real key. ";

/// A cache config as Borg 1.1 writes it.
pub(crate) const CACHE_CONFIG: &str = "[cache]
version = 1
repository = 6b26ded2a1243ef71746acba4b9f384481764d5a6f62267600dc9b7f682c80e5
manifest = 05b3abf2579a5eb66403cd78be557fd860633a1fe2103c7642030defe32c657f
timestamp = 2017-08-01T12:34:56.789012
key_type = 0
previous_location = /srv/backups/repo

";

static CWD_LOCK: LazyLock<Mutex<()>> = LazyLock::new(|| Mutex::new(()));

pub(crate) struct DirGuard {
    original: PathBuf,
    _lock: MutexGuard<'static, ()>,
}

impl DirGuard {
    pub(crate) fn new(new_dir: &Path) -> Self {
        // Changing the process current working directory is global and not thread-safe.
        // Lock it so tests don't race even if a #[serial] annotation is missed.
        let lock = CWD_LOCK.lock().unwrap_or_else(|poison| poison.into_inner());
        let original = std::env::current_dir().unwrap();
        std::env::set_current_dir(new_dir).unwrap();
        Self {
            original,
            _lock: lock,
        }
    }
}

impl Drop for DirGuard {
    fn drop(&mut self) {
        let _ = std::env::set_current_dir(&self.original);
    }
}

pub(crate) fn create_test_repository() -> TempDir {
    create_location(REPOSITORY_CONFIG)
}

pub(crate) fn create_test_cache() -> TempDir {
    create_location(CACHE_CONFIG)
}

fn create_location(config: &str) -> TempDir {
    let temp_dir = TempDir::new().unwrap();
    std::fs::write(temp_dir.path().join("config"), config).unwrap();
    temp_dir
}
