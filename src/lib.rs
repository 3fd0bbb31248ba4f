//! Borp: Borg-compatible repository locking and config file handling.
//!
//! Two independent pieces that let a program cooperate with Borg backup on
//! the same repository or cache directory:
//!
//! - [`locks`]: the shared/exclusive lock Borg keeps next to its data, made
//!   of a `lock.exclusive` directory and a `lock.roster` JSON file
//! - [`config`]: the INI-like `config` file Borg writes for repositories
//!   and caches
//!
//! ```
//! use borp::config::{ConfigFile, Value};
//!
//! let config = ConfigFile::parse("[repository]\nversion = 1\n").unwrap();
//! assert_eq!(config.value("repository", "version"), Some(Value::Int(1)));
//! assert_eq!(config.to_borg_string(), "[repository]\nversion = 1\n\n");
//! ```

pub mod config;
pub mod context;
pub mod error;
pub mod exit_codes;
pub mod fs;
pub mod locks;
pub mod logging;
pub mod process_id;

#[cfg(test)]
mod test_support;

pub use error::{BorpError, Result};
