//! Implementation of the `borp pid` command.

use crate::cli::PidArgs;
use borp::error::{BorpError, Result};
use borp::exit_codes;
use borp::process_id::get_process_id;

/// Execute the `borp pid` command.
///
/// Prints the id in lock-file form (`host.pid-thread`), or as the JSON
/// array stored in the roster with `--json`.
pub fn cmd_pid(args: PidArgs) -> Result<i32> {
    let id = get_process_id()?;

    if args.json {
        let json = serde_json::to_string(&id)
            .map_err(|e| BorpError::UserError(format!("failed to serialize process id: {}", e)))?;
        println!("{}", json);
    } else {
        println!("{}", id.to_filename());
    }

    Ok(exit_codes::SUCCESS)
}
