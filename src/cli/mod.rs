//! CLI argument parsing for borp.
//!
//! Uses clap derive macros for declarative argument definitions.
//! This module defines the command structure; actual implementations
//! are in the `commands` module.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

/// Seconds `lock with` and config edits wait for a busy lock, as Borg does.
pub const DEFAULT_LOCK_WAIT_SECS: f64 = 1.0;

/// Borp: Borg-compatible repository locking and config file handling.
///
/// Works on Borg repositories and caches:
/// - Inspect, break, or hold the lock Borg uses (`lock.exclusive`, `lock.roster`)
/// - Read and edit the `config` file in Borg's own format
#[derive(Parser, Debug)]
#[command(name = "borp")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands for borp.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the process identifier borp records in locks.
    ///
    /// The identifier is `host.pid-thread`, with the host taken from
    /// BORG_HOST_ID when set.
    Pid(PidArgs),

    /// Lock management commands.
    ///
    /// Inspect, break, or hold a repository or cache lock.
    Lock(LockCommand),

    /// Config file commands.
    ///
    /// Show, read, and edit a repository or cache config.
    Config(ConfigCommand),
}

/// Arguments for the `pid` command.
#[derive(Parser, Debug)]
pub struct PidArgs {
    /// Print as JSON (`[host, pid, thread]`).
    #[arg(long)]
    pub json: bool,
}

/// Lock subcommands.
#[derive(Parser, Debug)]
pub struct LockCommand {
    #[command(subcommand)]
    pub action: LockAction,
}

/// Available lock actions.
#[derive(Subcommand, Debug)]
pub enum LockAction {
    /// Show who holds a lock.
    ///
    /// Lists the exclusive lock holder and the roster entries.
    Info(LockInfoArgs),

    /// Forcibly remove a lock.
    ///
    /// Requires --force flag to prevent accidental breaking.
    Break(LockBreakArgs),

    /// Run a command while holding the lock.
    ///
    /// The lock is released when the command exits; borp exits with the
    /// command's exit code.
    With(LockWithArgs),
}

/// Arguments for the `lock info` command.
#[derive(Parser, Debug)]
pub struct LockInfoArgs {
    /// Repository or cache directory.
    #[arg(env = "BORG_REPO")]
    pub path: Option<PathBuf>,

    /// Print as JSON.
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `lock break` command.
#[derive(Parser, Debug)]
pub struct LockBreakArgs {
    /// Repository or cache directory.
    #[arg(env = "BORG_REPO")]
    pub path: Option<PathBuf>,

    /// Force breaking the lock (required for safety).
    #[arg(long)]
    pub force: bool,
}

/// Arguments for the `lock with` command.
#[derive(Parser, Debug)]
pub struct LockWithArgs {
    /// Repository or cache directory.
    #[arg(env = "BORG_REPO")]
    pub path: Option<PathBuf>,

    /// Take a shared lock instead of an exclusive one.
    #[arg(long)]
    pub shared: bool,

    /// Seconds to wait for the lock.
    #[arg(long, value_name = "SECS", default_value_t = DEFAULT_LOCK_WAIT_SECS)]
    pub lock_wait: f64,

    /// Remove locks left behind by dead processes on this host.
    #[arg(long)]
    pub kill_stale_locks: bool,

    /// Command to run, after `--`.
    #[arg(last = true, required = true, value_name = "CMD")]
    pub command: Vec<String>,
}

/// Config subcommands.
#[derive(Parser, Debug)]
pub struct ConfigCommand {
    #[command(subcommand)]
    pub action: ConfigAction,
}

/// Available config actions.
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Print the whole config.
    Show(ConfigShowArgs),

    /// Print a single setting.
    Get(ConfigGetArgs),

    /// Change a setting.
    ///
    /// The value is validated first; the file is rewritten while holding
    /// the exclusive lock.
    Set(ConfigSetArgs),

    /// Remove a setting.
    Delete(ConfigDeleteArgs),
}

/// Arguments for the `config show` command.
#[derive(Parser, Debug)]
pub struct ConfigShowArgs {
    /// Repository or cache directory.
    #[arg(env = "BORG_REPO")]
    pub path: Option<PathBuf>,

    /// Print as JSON, with values classified by type.
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `config get` command.
#[derive(Parser, Debug)]
pub struct ConfigGetArgs {
    /// Optional directory (defaults to BORG_REPO), then `section.key` or `key`.
    #[arg(required = true, num_args = 1..=2, value_names = ["PATH", "NAME"])]
    pub args: Vec<String>,
}

/// Arguments for the `config set` command.
#[derive(Parser, Debug)]
pub struct ConfigSetArgs {
    /// Optional directory (defaults to BORG_REPO), then the name and new value.
    #[arg(required = true, num_args = 2..=3, value_names = ["PATH", "NAME", "VALUE"])]
    pub args: Vec<String>,
}

/// Arguments for the `config delete` command.
#[derive(Parser, Debug)]
pub struct ConfigDeleteArgs {
    /// Optional directory (defaults to BORG_REPO), then `section.key` or `key`.
    #[arg(required = true, num_args = 1..=2, value_names = ["PATH", "NAME"])]
    pub args: Vec<String>,
}

impl Cli {
    /// Parse command line arguments.
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_debug_assert() {
        // Verifies the CLI arguments configuration is valid
        Cli::command().debug_assert();
    }

    #[test]
    fn parse_pid() {
        let cli = Cli::try_parse_from(["borp", "pid", "--json"]).unwrap();
        if let Command::Pid(args) = cli.command {
            assert!(args.json);
        } else {
            panic!("Expected Pid command");
        }
    }

    #[test]
    fn parse_verbosity() {
        let cli = Cli::try_parse_from(["borp", "-vv", "pid"]).unwrap();
        assert_eq!(cli.verbose, 2);

        let cli = Cli::try_parse_from(["borp", "pid", "-v"]).unwrap();
        assert_eq!(cli.verbose, 1);
    }

    #[test]
    fn parse_lock_info() {
        let cli = Cli::try_parse_from(["borp", "lock", "info", "/srv/repo", "--json"]).unwrap();
        if let Command::Lock(lock_cmd) = cli.command {
            if let LockAction::Info(args) = lock_cmd.action {
                assert_eq!(args.path, Some(PathBuf::from("/srv/repo")));
                assert!(args.json);
            } else {
                panic!("Expected Info action");
            }
        } else {
            panic!("Expected Lock command");
        }
    }

    #[test]
    fn parse_lock_break() {
        let cli = Cli::try_parse_from(["borp", "lock", "break", "/srv/repo", "--force"]).unwrap();
        if let Command::Lock(lock_cmd) = cli.command {
            if let LockAction::Break(args) = lock_cmd.action {
                assert_eq!(args.path, Some(PathBuf::from("/srv/repo")));
                assert!(args.force);
            } else {
                panic!("Expected Break action");
            }
        } else {
            panic!("Expected Lock command");
        }
    }

    #[test]
    fn parse_lock_with() {
        let cli = Cli::try_parse_from([
            "borp",
            "lock",
            "with",
            "/srv/repo",
            "--shared",
            "--lock-wait",
            "2.5",
            "--kill-stale-locks",
            "--",
            "ls",
            "-l",
        ])
        .unwrap();
        if let Command::Lock(lock_cmd) = cli.command {
            if let LockAction::With(args) = lock_cmd.action {
                assert_eq!(args.path, Some(PathBuf::from("/srv/repo")));
                assert!(args.shared);
                assert_eq!(args.lock_wait, 2.5);
                assert!(args.kill_stale_locks);
                assert_eq!(args.command, vec!["ls", "-l"]);
            } else {
                panic!("Expected With action");
            }
        } else {
            panic!("Expected Lock command");
        }
    }

    #[test]
    fn parse_lock_with_defaults() {
        let cli =
            Cli::try_parse_from(["borp", "lock", "with", "/srv/repo", "--", "true"]).unwrap();
        if let Command::Lock(lock_cmd) = cli.command {
            if let LockAction::With(args) = lock_cmd.action {
                assert!(!args.shared);
                assert_eq!(args.lock_wait, DEFAULT_LOCK_WAIT_SECS);
                assert!(!args.kill_stale_locks);
                assert_eq!(args.command, vec!["true"]);
            } else {
                panic!("Expected With action");
            }
        } else {
            panic!("Expected Lock command");
        }
    }

    #[test]
    fn lock_with_requires_command() {
        assert!(Cli::try_parse_from(["borp", "lock", "with", "/srv/repo"]).is_err());
    }

    #[test]
    fn parse_config_get() {
        let cli = Cli::try_parse_from(["borp", "config", "get", "repository.id"]).unwrap();
        if let Command::Config(config_cmd) = cli.command {
            if let ConfigAction::Get(args) = config_cmd.action {
                assert_eq!(args.args, vec!["repository.id"]);
            } else {
                panic!("Expected Get action");
            }
        } else {
            panic!("Expected Config command");
        }
    }

    #[test]
    fn parse_config_set_with_path() {
        let cli = Cli::try_parse_from([
            "borp",
            "config",
            "set",
            "/srv/repo",
            "append_only",
            "1",
        ])
        .unwrap();
        if let Command::Config(config_cmd) = cli.command {
            if let ConfigAction::Set(args) = config_cmd.action {
                assert_eq!(args.args, vec!["/srv/repo", "append_only", "1"]);
            } else {
                panic!("Expected Set action");
            }
        } else {
            panic!("Expected Config command");
        }
    }

    #[test]
    fn config_set_requires_value() {
        assert!(Cli::try_parse_from(["borp", "config", "set", "append_only"]).is_err());
    }

    #[test]
    fn parse_config_delete() {
        let cli = Cli::try_parse_from(["borp", "config", "delete", "/srv/repo", "storage_quota"])
            .unwrap();
        if let Command::Config(config_cmd) = cli.command {
            if let ConfigAction::Delete(args) = config_cmd.action {
                assert_eq!(args.args, vec!["/srv/repo", "storage_quota"]);
            } else {
                panic!("Expected Delete action");
            }
        } else {
            panic!("Expected Config command");
        }
    }
}
