//! Implementation of the `borp config` commands.

use super::{REPO_ENV, resolve_location};
use crate::cli::{
    ConfigDeleteArgs, ConfigGetArgs, ConfigSetArgs, ConfigShowArgs, DEFAULT_LOCK_WAIT_SECS,
};
use borp::config::{ConfigFile, Value, validate_setting};
use borp::context::{BorgLocation, LocationKind};
use borp::error::{BorpError, Result};
use borp::exit_codes;
use borp::locks::{self, LockMode, LockOptions};
use log::{debug, info};
use serde_json::Map;
use std::path::PathBuf;

/// Execute the `borp config show` command.
pub fn cmd_config_show(args: ConfigShowArgs) -> Result<i32> {
    let location = resolve_location(args.path.as_deref())?;
    let config = location.load_config()?;

    if args.json {
        let json = serde_json::to_string_pretty(&config_to_json(&config)?)
            .map_err(|e| BorpError::UserError(format!("failed to serialize config: {}", e)))?;
        println!("{}", json);
    } else {
        print!("{}", config);
    }

    Ok(exit_codes::SUCCESS)
}

/// Execute the `borp config get` command.
pub fn cmd_config_get(args: ConfigGetArgs) -> Result<i32> {
    let (path, rest) = split_location_args(args.args, 1);
    let location = resolve_location(path.as_deref())?;
    let (section, key) = parse_setting_name(&rest[0], location.kind)?;

    let config = location.load_config()?;
    let value = config
        .get(&section, &key)
        .ok_or_else(|| no_option(&section, &key))?;
    println!("{}", value);

    Ok(exit_codes::SUCCESS)
}

/// Execute the `borp config set` command.
///
/// The value is checked against the rules for the location kind before the
/// lock is taken; the file is rewritten atomically while the exclusive lock
/// is held.
pub fn cmd_config_set(args: ConfigSetArgs) -> Result<i32> {
    let (path, rest) = split_location_args(args.args, 2);
    let location = resolve_location(path.as_deref())?;
    let (section, key) = parse_setting_name(&rest[0], location.kind)?;
    let value = rest[1].as_str();

    validate_setting(location.kind, &section, &key, Some(value))?;

    update_config(&location, |config| {
        config.set(&section, key.as_str(), value);
        Ok(())
    })?;
    info!("set {}.{} in {}", section, key, location.config_path().display());

    Ok(exit_codes::SUCCESS)
}

/// Execute the `borp config delete` command.
pub fn cmd_config_delete(args: ConfigDeleteArgs) -> Result<i32> {
    let (path, rest) = split_location_args(args.args, 1);
    let location = resolve_location(path.as_deref())?;
    let (section, key) = parse_setting_name(&rest[0], location.kind)?;

    validate_setting(location.kind, &section, &key, None)?;

    update_config(&location, |config| {
        config
            .remove(&section, &key)
            .map(|_| ())
            .ok_or_else(|| no_option(&section, &key))
    })?;
    info!(
        "deleted {}.{} from {}",
        section,
        key,
        location.config_path().display()
    );

    Ok(exit_codes::SUCCESS)
}

/// Load, modify, and save the config under the location's exclusive lock.
fn update_config<F>(location: &BorgLocation, modify: F) -> Result<()>
where
    F: FnOnce(&mut ConfigFile) -> Result<()>,
{
    let options = LockOptions::with_timeout_secs(DEFAULT_LOCK_WAIT_SECS);
    let guard = locks::acquire_location_lock(location, LockMode::Exclusive, &options)?;
    debug!("acquired {} for config update", guard.path().display());

    // Re-read under the lock so concurrent writers are not overwritten.
    let mut config = location.load_config()?;
    modify(&mut config)?;
    config.save(location.config_path())?;

    guard.release()
}

/// Split positional arguments into an optional location and the rest.
///
/// `expected` is the number of arguments after the location. When the
/// location is omitted it comes from `BORG_REPO`, or the current directory.
pub(super) fn split_location_args(
    mut args: Vec<String>,
    expected: usize,
) -> (Option<PathBuf>, Vec<String>) {
    if args.len() > expected {
        let path = args.remove(0);
        return (Some(PathBuf::from(path)), args);
    }
    let path = std::env::var_os(REPO_ENV)
        .filter(|p| !p.is_empty())
        .map(PathBuf::from);
    (path, args)
}

/// Split `section.key` into its parts; a bare key belongs to the location's
/// own section.
pub(super) fn parse_setting_name(name: &str, kind: LocationKind) -> Result<(String, String)> {
    let (section, key) = match name.split_once('.') {
        Some((section, key)) => (section, key),
        None => (kind.section(), name),
    };

    if section.is_empty() || key.is_empty() || key.contains('.') {
        return Err(BorpError::UserError(format!(
            "invalid setting name '{}'.\n\n\
             Use `section.key` or just `key` for the [{}] section.",
            name,
            kind.section()
        )));
    }

    Ok((section.to_string(), key.to_lowercase()))
}

fn no_option(section: &str, key: &str) -> BorpError {
    BorpError::ConfigError(format!("no option '{}' in section '{}'", key, section))
}

/// Render the config as `{section: {key: {type, value}}}`.
fn config_to_json(config: &ConfigFile) -> Result<serde_json::Value> {
    let mut sections = Map::new();
    for section in config.sections() {
        let mut entries = Map::new();
        for (key, raw) in &section.entries {
            let value = serde_json::to_value(Value::classify(raw))
                .map_err(|e| BorpError::UserError(format!("failed to serialize config: {}", e)))?;
            entries.insert(key.clone(), value);
        }
        sections.insert(section.name.clone(), serde_json::Value::Object(entries));
    }
    Ok(serde_json::Value::Object(sections))
}
