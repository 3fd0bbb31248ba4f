//! Filesystem utilities for borp.
//!
//! Roster and config files are shared with Borg processes, so every rewrite
//! goes through [`atomic_write`] and a reader never sees a half-written file.

pub mod atomic;

pub use atomic::atomic_write;
pub use atomic::atomic_write_file;
