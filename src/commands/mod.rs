//! Command implementations for borp.
//!
//! This module provides the dispatcher that routes CLI commands to their
//! implementations. Every handler returns the process exit code so that
//! `lock with` can pass its child's status through.

mod config;
mod lock;
mod pid;


use crate::cli::{Command, ConfigAction, ConfigCommand, LockAction, LockCommand};
use borp::context::BorgLocation;
use borp::error::Result;
use std::path::{Path, PathBuf};

/// Environment variable naming the default repository.
pub const REPO_ENV: &str = "BORG_REPO";

/// Dispatch a command to its implementation.
///
/// This is the main entry point for command execution. Each command
/// is routed to its handler function.
pub fn dispatch(command: Command) -> Result<i32> {
    match command {
        Command::Pid(args) => pid::cmd_pid(args),
        Command::Lock(lock_cmd) => dispatch_lock(lock_cmd),
        Command::Config(config_cmd) => dispatch_config(config_cmd),
    }
}

/// Dispatch lock subcommands.
fn dispatch_lock(lock_cmd: LockCommand) -> Result<i32> {
    match lock_cmd.action {
        LockAction::Info(args) => lock::cmd_lock_info(args),
        LockAction::Break(args) => lock::cmd_lock_break(args),
        LockAction::With(args) => lock::cmd_lock_with(args),
    }
}

/// Dispatch config subcommands.
fn dispatch_config(config_cmd: ConfigCommand) -> Result<i32> {
    match config_cmd.action {
        ConfigAction::Show(args) => config::cmd_config_show(args),
        ConfigAction::Get(args) => config::cmd_config_get(args),
        ConfigAction::Set(args) => config::cmd_config_set(args),
        ConfigAction::Delete(args) => config::cmd_config_delete(args),
    }
}

/// Resolve the repository or cache a command works on.
///
/// Without an explicit path the current directory is used.
fn resolve_location(path: Option<&Path>) -> Result<BorgLocation> {
    match path {
        Some(path) => BorgLocation::resolve_from(path),
        None => BorgLocation::resolve(),
    }
}
