//! Logging setup using `tracing-subscriber`.
//!
//! Logs go to stderr so stdout carries only the report.
//!
//! # Log Levels
//!
//! - `warn` (default): unjoinable views, fatal errors
//! - `info` (`-v`): tables loaded, stage progress and counts
//! - `debug` (`-vv`): per-table and per-rule details
//! - `trace` (`-vvv`)

use std::io;

use tracing::Level;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Map the `-v` count to a level.
pub fn level_for(verbosity: u8) -> Level {
    match verbosity {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

/// Install the global subscriber. `RUST_LOG` overrides `verbosity`.
pub fn init_logging(verbosity: u8) {
    let filter = build_env_filter(level_for(verbosity));
    let layer = fmt::layer()
        .with_writer(io::stderr)
        .with_target(false)
        .without_time();

    // A second init (tests) is harmless
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(layer)
        .try_init();
}

fn build_env_filter(level: Level) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        // Dependencies stay at warn
        EnvFilter::new(format!(
            "warn,wardcheck={level},wardcheck_cli={level}",
            level = level.as_str().to_lowercase()
        ))
    })
}
