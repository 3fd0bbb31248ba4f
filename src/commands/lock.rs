//! Implementation of the `borp lock` commands.

use super::resolve_location;
use crate::cli::{LockBreakArgs, LockInfoArgs, LockWithArgs};
use borp::error::{BorpError, Result};
use borp::exit_codes;
use borp::locks::{self, LockInfo, LockMode, LockOptions, age_string};
use log::{info, warn};
use std::io;
use std::process::{Command, ExitStatus};

/// Execute the `borp lock info` command.
pub fn cmd_lock_info(args: LockInfoArgs) -> Result<i32> {
    let location = resolve_location(args.path.as_deref())?;
    let info = locks::lock_info(&location.lock_path())?;

    if args.json {
        let json = serde_json::to_string_pretty(&info)
            .map_err(|e| BorpError::UserError(format!("failed to serialize lock info: {}", e)))?;
        println!("{}", json);
        return Ok(exit_codes::SUCCESS);
    }

    print_lock_info(&info);

    if info.is_stale() {
        println!();
        println!(
            "Note: the lock is held by a dead process. Use `borp lock break --force` to clear it."
        );
    }

    Ok(exit_codes::SUCCESS)
}

/// Execute the `borp lock break` command.
pub fn cmd_lock_break(args: LockBreakArgs) -> Result<i32> {
    // Require --force flag
    if !args.force {
        return Err(BorpError::UserError(
            "refusing to break lock without --force flag.\n\n\
             Breaking a lock can corrupt the repository if the lock holder is still active.\n\
             Only break locks if you are certain no Borg process is using it.\n\n\
             To break the lock, run:\n  borp lock break --force"
                .to_string(),
        ));
    }

    let location = resolve_location(args.path.as_deref())?;
    let broken = locks::break_lock(&location.lock_path())?;

    if broken.is_free() {
        println!("Lock was not held: {}", broken.path.display());
        return Ok(exit_codes::SUCCESS);
    }

    warn!("broke lock {}", broken.path.display());
    println!("Broke lock: {}", broken.path.display());
    println!();
    println!("Lock details:");
    print_lock_info(&broken);

    Ok(exit_codes::SUCCESS)
}

/// Execute the `borp lock with` command.
///
/// Returns the exit code of the child process. The lock is released before
/// returning, whatever the child did.
pub fn cmd_lock_with(args: LockWithArgs) -> Result<i32> {
    let location = resolve_location(args.path.as_deref())?;

    let mode = if args.shared {
        LockMode::Shared
    } else {
        LockMode::Exclusive
    };
    let options = LockOptions {
        kill_stale_locks: args.kill_stale_locks,
        ..LockOptions::with_timeout_secs(args.lock_wait)
    };

    let (program, program_args) = args
        .command
        .split_first()
        .ok_or_else(|| BorpError::UserError("no command given".to_string()))?;

    let guard = locks::acquire_location_lock(&location, mode, &options)?;
    info!(
        "holding {} lock on {} for '{}'",
        mode,
        guard.path().display(),
        program
    );

    let status = run_child(program, program_args);

    guard.release()?;

    let status = status
        .map_err(|e| BorpError::UserError(format!("failed to run '{}': {}", program, e)))?;

    match status.code() {
        Some(code) => Ok(code),
        None => {
            warn!("'{}' was terminated by a signal", program);
            Ok(exit_codes::USER_ERROR)
        }
    }
}

/// Run the child and wait for it.
///
/// Ctrl-C reaches the whole foreground process group. borp ignores it while
/// waiting so the lock is still released after the child exits.
fn run_child(program: &str, args: &[String]) -> io::Result<ExitStatus> {
    let mut child = Command::new(program).args(args).spawn()?;
    #[cfg(unix)]
    let _ignored = InterruptsIgnored::install();
    child.wait()
}

/// Ignores SIGINT until dropped, then restores the previous disposition.
#[cfg(unix)]
struct InterruptsIgnored {
    previous: Option<libc::sighandler_t>,
}

#[cfg(unix)]
impl InterruptsIgnored {
    fn install() -> Self {
        // SAFETY: SIG_IGN installs no handler code.
        let previous = unsafe { libc::signal(libc::SIGINT, libc::SIG_IGN) };
        if previous == libc::SIG_ERR {
            warn!("failed to ignore SIGINT: {}", io::Error::last_os_error());
            return Self { previous: None };
        }
        Self {
            previous: Some(previous),
        }
    }
}

#[cfg(unix)]
impl Drop for InterruptsIgnored {
    fn drop(&mut self) {
        if let Some(previous) = self.previous {
            // SAFETY: restores the disposition returned by signal() above.
            unsafe {
                libc::signal(libc::SIGINT, previous);
            }
        }
    }
}

fn print_lock_info(info: &LockInfo) {
    println!("  Lock:       {}", info.path.display());

    if info.is_free() {
        println!("  Status:     unlocked");
        return;
    }

    let status = if !info.exclusive.is_empty() {
        "locked (exclusive)"
    } else if !info.shared.is_empty() {
        "locked (shared)"
    } else {
        "locked (roster update in progress)"
    };
    println!("  Status:     {}", status);

    if let Some(since) = info.locked_since {
        println!("  Since:      {}", since.format("%Y-%m-%d %H:%M:%S UTC"));
        println!("  Age:        {}", age_string(since));
    }

    for holder in &info.holders {
        let state = match holder.alive {
            Some(true) => "alive",
            Some(false) => "STALE",
            None => "unrecognized entry",
        };
        println!("  Holder:     {} ({})", holder.name, state);
    }

    for id in &info.exclusive {
        println!("  Exclusive:  {}", id);
    }
    for id in &info.shared {
        println!("  Shared:     {}", id);
    }
}
