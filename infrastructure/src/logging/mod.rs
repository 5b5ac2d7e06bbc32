//! Logging infrastructure: `tracing` subscriber setup.
//!
//! Diagnostics go to stderr so they never interleave with agent replies on
//! stdout. When `[logging] dir` is set, a daily rolling file receives the same
//! events through a non-blocking writer.

use crate::config::FileLoggingConfig;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// File name prefix of the rolling log (`agentsh.log.YYYY-MM-DD`)
pub const LOG_FILE_PREFIX: &str = "agentsh.log";

/// Filter directive for a `-v` count, falling back to the configured level.
pub fn filter_directive(verbosity: u8, quiet: bool, configured: &str) -> String {
    if quiet {
        return "error".to_string();
    }
    match verbosity {
        0 if configured.trim().is_empty() => "warn".to_string(),
        0 => configured.trim().to_string(),
        1 => "info".to_string(),
        2 => "debug".to_string(),
        _ => "trace".to_string(),
    }
}

/// Initialize the global subscriber.
///
/// `RUST_LOG` wins over the verbosity flags. The returned guard must be held
/// until exit so buffered file output is flushed.
pub fn init_logging(verbosity: u8, quiet: bool, config: &FileLoggingConfig) -> Option<WorkerGuard> {
    let directive = filter_directive(verbosity, quiet, &config.level);
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&directive));

    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false);

    let (file_layer, guard) = match config.log_dir() {
        Some(dir) => {
            let appender = RollingFileAppender::new(Rotation::DAILY, dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().with_writer(writer).with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .try_init();

    guard
}
