//! Logging infrastructure for Narration Sync.
//!
//! This module provides:
//! - Per-run loggers with file + callback dual output
//! - Compact mode with progress filtering
//! - Tail buffer for error diagnosis
//! - Integration with the `tracing` ecosystem
//!
//! # Example
//!
//! ```no_run
//! use narsync_core::logging::{LogConfig, RunLogger};
//!
//! let logger = RunLogger::new("lecture_01", "/path/to/logs", LogConfig::default(), None).unwrap();
//!
//! logger.phase("Synthesize");
//! logger.segment(3, "served from cache");
//! logger.progress(12, 40);
//! logger.success("Run completed");
//! ```

mod run_logger;
mod types;

pub use run_logger::RunLogger;
pub use types::{LogCallback, LogConfig, LogLevel, MessagePrefix};

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize tracing to stderr plus an application log file in `log_dir`.
///
/// The returned guard must be held for the lifetime of the program so the
/// background writer flushes on exit.
pub fn init_tracing_with_file(
    default_level: LogLevel,
    log_dir: &Path,
) -> std::io::Result<WorkerGuard> {
    std::fs::create_dir_all(log_dir)?;
    let appender = tracing_appender::rolling::never(log_dir, "narsync.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level.as_filter_str()));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .with(fmt::layer().with_ansi(false).with_writer(writer))
        .with(filter)
        .init();

    Ok(guard)
}

/// Initialize tracing for tests (only logs warnings and above).
#[cfg(test)]
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("warn")
        .with_test_writer()
        .try_init();
}
