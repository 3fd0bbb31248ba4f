//! Error types for borp.
//!
//! Uses thiserror for derive macros. Lock errors carry the lock path so the
//! message tells the user which repository or cache is involved.

use crate::exit_codes;
use std::path::PathBuf;
use thiserror::Error;

/// Main error type for borp operations.
#[derive(Error, Debug)]
pub enum BorpError {
    /// User provided invalid arguments or the location is unusable.
    #[error("{0}")]
    UserError(String),

    /// The config file is not in the expected format.
    #[error("config parse error on line {line}: {message}")]
    ConfigParse { line: usize, message: String },

    /// A config value is missing or invalid.
    #[error("config error: {0}")]
    ConfigError(String),

    /// The lock is held by someone else and the wait expired.
    #[error("Failed to create/acquire the lock {} (timeout).", .0.display())]
    LockTimeout(PathBuf),

    /// The lock could not be created or manipulated.
    #[error("Failed to create/acquire the lock {} ({reason}).", .path.display())]
    LockFailed { path: PathBuf, reason: String },

    /// Release was attempted on a lock that does not exist.
    #[error("Failed to release the lock {} (was not locked).", .0.display())]
    NotLocked(PathBuf),

    /// Release was attempted on a lock held by another process.
    #[error("Failed to release the lock {} (was/is locked, but not by me).", .0.display())]
    NotMyLock(PathBuf),
}

impl BorpError {
    /// Returns the appropriate exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            BorpError::UserError(_) => exit_codes::USER_ERROR,
            BorpError::ConfigParse { .. } | BorpError::ConfigError(_) => {
                exit_codes::CONFIG_FAILURE
            }
            BorpError::LockTimeout(_) => exit_codes::LOCK_TIMEOUT,
            BorpError::LockFailed { .. } | BorpError::NotLocked(_) | BorpError::NotMyLock(_) => {
                exit_codes::LOCK_FAILURE
            }
        }
    }

    pub(crate) fn lock_failed(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        BorpError::LockFailed {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

/// Result type alias for borp operations.
pub type Result<T> = std::result::Result<T, BorpError>;
