//! Borg config file handling.
//!
//! Borg stores repository and cache settings in a small INI-like file written
//! by Python's `configparser`. This module reads that format into an ordered
//! [`ConfigFile`], classifies raw values, exposes typed views of the
//! `[repository]` and `[cache]` sections, and writes the file back in the
//! exact layout Borg produces.

mod model;
mod operations;
mod parser;
pub mod types;
mod value;


// Re-export public API
pub use model::{ConfigFile, Section};
pub use operations::validate_setting;
pub use types::{CACHE_SECTION, CacheConfig, REPOSITORY_SECTION, RepositoryConfig};
pub use value::{Value, decode_base64, decode_hex, parse_bool, parse_file_size};
