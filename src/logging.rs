//! Logging initialization using `env_logger`.
//!
//! The library only emits records through the `log` facade. Binaries call
//! [`init_logging`] once at startup to route them to stderr.

use log::LevelFilter;

/// Map a `-v` count to a level filter.
pub fn level_for_verbosity(verbosity: u8) -> LevelFilter {
    match verbosity {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

/// Initialize the global logger. Safe to call multiple times; subsequent
/// calls will no-op.
///
/// `RUST_LOG`, when set, takes precedence over `verbosity`.
pub fn init_logging(verbosity: u8) {
    let mut builder = env_logger::Builder::new();
    builder
        .filter_level(level_for_verbosity(verbosity))
        .format_timestamp(None)
        .parse_default_env();

    let _ = builder.try_init();
}
