//! Config loading, saving, and validation operations.

use super::model::ConfigFile;
use super::parser;
use super::types::{CACHE_SECTION, REPOSITORY_ID_LEN, REPOSITORY_SECTION};
use super::value::{decode_hex, parse_file_size};
use crate::context::LocationKind;
use crate::error::{BorpError, Result};
use crate::fs::atomic_write_file;
use std::fmt;
use std::path::Path;

impl ConfigFile {
    /// Parse config text in Borg's format.
    pub fn parse(text: &str) -> Result<Self> {
        parser::parse(text)
    }

    /// Load a config file from disk.
    ///
    /// # Returns
    ///
    /// * `Ok(ConfigFile)` - Successfully parsed config
    /// * `Err(BorpError::UserError)` - The file could not be read
    /// * `Err(BorpError::ConfigParse)` - The file is not in Borg's format
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path).map_err(|e| {
            BorpError::UserError(format!(
                "failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;

        Self::parse(&content)
    }

    /// Atomically write the config to disk in Borg's format.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        atomic_write_file(path, &self.to_borg_string())
    }

    /// Serialize in the exact layout Borg writes.
    pub fn to_borg_string(&self) -> String {
        parser::to_borg_string(self)
    }
}

impl fmt::Display for ConfigFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_borg_string())
    }
}

/// Check a `section.name = value` change before writing it.
///
/// Follows the rules of `borg config`: a repository only accepts its own
/// tunables and id, a cache only `previous_location`. `value` is `None` for
/// a deletion, in which case only the name is checked.
pub fn validate_setting(
    kind: LocationKind,
    section: &str,
    name: &str,
    value: Option<&str>,
) -> Result<()> {
    match kind {
        LocationKind::Repository => validate_repository_setting(section, name, value),
        LocationKind::Cache => validate_cache_setting(section, name),
    }
}

fn validate_repository_setting(section: &str, name: &str, value: Option<&str>) -> Result<()> {
    if section != REPOSITORY_SECTION {
        return Err(invalid_section(section));
    }

    match name {
        "segments_per_dir" | "last_segment_checked" => {
            if let Some(value) = value
                && value.trim().parse::<i64>().is_err()
            {
                return Err(invalid_value(section, name, value));
            }
        }
        "max_segment_size" | "additional_free_space" | "storage_quota" => {
            if let Some(value) = value
                && parse_file_size(value).is_none()
            {
                return Err(invalid_value(section, name, value));
            }
        }
        "append_only" => {
            if let Some(value) = value
                && value != "0"
                && value != "1"
            {
                return Err(invalid_value(section, name, value));
            }
        }
        "id" => {
            if let Some(value) = value
                && !decode_hex(value).is_ok_and(|id| id.len() == REPOSITORY_ID_LEN)
            {
                return Err(invalid_value(section, name, value));
            }
        }
        _ => return Err(invalid_name(section, name)),
    }
    Ok(())
}

fn validate_cache_setting(section: &str, name: &str) -> Result<()> {
    if section != CACHE_SECTION {
        return Err(invalid_section(section));
    }
    if name != "previous_location" {
        return Err(invalid_name(section, name));
    }
    Ok(())
}

fn invalid_section(section: &str) -> BorpError {
    BorpError::ConfigError(format!("invalid section '{}'", section))
}

fn invalid_name(section: &str, name: &str) -> BorpError {
    BorpError::ConfigError(format!("invalid name '{}.{}'", section, name))
}

fn invalid_value(section: &str, name: &str, value: &str) -> BorpError {
    BorpError::ConfigError(format!("invalid value '{}' for {}.{}", value, section, name))
}
