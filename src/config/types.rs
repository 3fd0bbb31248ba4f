//! Typed views of the repository and cache configs.

use super::model::ConfigFile;
use crate::error::{BorpError, Result};
use chrono::NaiveDateTime;
use data_encoding::HEXLOWER;
use serde::Serialize;

/// Section name of a repository config.
pub const REPOSITORY_SECTION: &str = "repository";

/// Section name of a cache config.
pub const CACHE_SECTION: &str = "cache";

/// The only config version Borg 1.x writes.
pub const SUPPORTED_VERSION: u64 = 1;

/// Length of a repository id in bytes.
pub const REPOSITORY_ID_LEN: usize = 32;

pub const DEFAULT_SEGMENTS_PER_DIR: u64 = 1000;
pub const DEFAULT_MAX_SEGMENT_SIZE: u64 = 524_288_000;

/// `[repository]` section of `<repo>/config`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepositoryConfig {
    pub version: u64,
    pub segments_per_dir: u64,
    pub max_segment_size: u64,
    pub append_only: bool,
    pub storage_quota: u64,
    pub additional_free_space: u64,
    /// Repository id, 32 bytes.
    pub id: Vec<u8>,
    /// Key material for repokey-mode repositories.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<Vec<u8>>,
}

impl RepositoryConfig {
    /// Read the `[repository]` section, applying Borg's defaults for absent keys.
    pub fn from_config(config: &ConfigFile) -> Result<Self> {
        let s = REPOSITORY_SECTION;
        if !config.has_section(s) {
            return Err(BorpError::ConfigError(
                "not a repository config: no [repository] section".to_string(),
            ));
        }

        let version = require(config.get_int(s, "version")?, s, "version")?;
        check_version(s, version)?;

        let id = require(config.get_hex(s, "id")?, s, "id")?;
        if id.len() != REPOSITORY_ID_LEN {
            return Err(BorpError::ConfigError(format!(
                "repository.id: expected {} bytes, got {}",
                REPOSITORY_ID_LEN,
                id.len()
            )));
        }

        Ok(Self {
            version,
            segments_per_dir: config
                .get_int(s, "segments_per_dir")?
                .unwrap_or(DEFAULT_SEGMENTS_PER_DIR),
            max_segment_size: config
                .get_file_size(s, "max_segment_size")?
                .unwrap_or(DEFAULT_MAX_SEGMENT_SIZE),
            append_only: config.get_bool(s, "append_only")?.unwrap_or(false),
            storage_quota: config.get_file_size(s, "storage_quota")?.unwrap_or(0),
            additional_free_space: config
                .get_file_size(s, "additional_free_space")?
                .unwrap_or(0),
            id,
            key: match config.get_text(s, "key") {
                Some(_) => config.get_base64(s, "key")?,
                None => None,
            },
        })
    }

    /// Repository id as lowercase hex.
    pub fn id_hex(&self) -> String {
        HEXLOWER.encode(&self.id)
    }
}

/// `[cache]` section of `<cache>/config`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CacheConfig {
    pub version: u64,
    /// Id of the repository this cache belongs to.
    pub repository: Vec<u8>,
    /// Id of the manifest the cache was last synced with.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manifest: Option<Vec<u8>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<NaiveDateTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_type: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_location: Option<String>,
}

impl CacheConfig {
    pub fn from_config(config: &ConfigFile) -> Result<Self> {
        let s = CACHE_SECTION;
        if !config.has_section(s) {
            return Err(BorpError::ConfigError(
                "not a cache config: no [cache] section".to_string(),
            ));
        }

        let version = require(config.get_int(s, "version")?, s, "version")?;
        check_version(s, version)?;

        let timestamp = config
            .get_text(s, "timestamp")
            .map(|raw| {
                NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f").map_err(|e| {
                    BorpError::ConfigError(format!("cache.timestamp: invalid '{}': {}", raw, e))
                })
            })
            .transpose()?;

        Ok(Self {
            version,
            repository: require(config.get_hex(s, "repository")?, s, "repository")?,
            manifest: match config.get_text(s, "manifest") {
                Some(_) => config.get_hex(s, "manifest")?,
                None => None,
            },
            timestamp,
            key_type: config.get_int(s, "key_type")?,
            previous_location: config.get_text(s, "previous_location").map(str::to_string),
        })
    }

    pub fn repository_hex(&self) -> String {
        HEXLOWER.encode(&self.repository)
    }
}

fn require<T>(value: Option<T>, section: &str, key: &str) -> Result<T> {
    value.ok_or_else(|| BorpError::ConfigError(format!("{}.{}: missing", section, key)))
}

fn check_version(section: &str, version: u64) -> Result<()> {
    if version != SUPPORTED_VERSION {
        return Err(BorpError::ConfigError(format!(
            "{}.version: unsupported version {}",
            section, version
        )));
    }
    Ok(())
}
