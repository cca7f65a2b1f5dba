//! Structured logging setup using the `tracing` ecosystem.
//!
//! Console output goes to stderr in compact form; an optional daily-rolling
//! file layer can emit either plain text or JSON lines.

use std::path::Path;
use tracing_appender::rolling;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LoggingConfig;
use crate::error::{RhError, RhResult};

/// File name prefix for rolled log files.
const LOG_FILE_PREFIX: &str = "ridehail.log";

/// Build an env filter from a level string, falling back to `info`.
///
/// `RUST_LOG` wins over the configured level when it is set.
fn build_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Initialize the global tracing subscriber from logging configuration.
///
/// Sets up compact console output plus a daily-rotated file in `log_dir`.
/// The returned guard must be held for the lifetime of the process so the
/// non-blocking writer can flush.
pub fn init_logging(config: &LoggingConfig, log_dir: &Path) -> RhResult<LogGuard> {
    std::fs::create_dir_all(log_dir)?;

    let file_appender = rolling::daily(log_dir, LOG_FILE_PREFIX);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(false)
        .compact();

    let registry = tracing_subscriber::registry()
        .with(build_filter(&config.level))
        .with(console_layer);

    let result = if config.json_output {
        registry
            .with(
                fmt::layer()
                    .with_writer(non_blocking)
                    .json()
                    .with_target(true)
                    .with_file(true)
                    .with_line_number(true),
            )
            .try_init()
    } else {
        registry
            .with(
                fmt::layer()
                    .with_writer(non_blocking)
                    .with_ansi(false)
                    .with_target(true)
                    .with_file(true)
                    .with_line_number(true),
            )
            .try_init()
    };
    result.map_err(|e| RhError::Config(format!("failed to install log subscriber: {e}")))?;

    tracing::info!(
        "logging initialized at level={}, dir={}",
        config.level,
        log_dir.display()
    );

    Ok(LogGuard { _guard: guard })
}

/// Keeps the non-blocking log writer alive.
/// Drop this to flush and close the log file.
pub struct LogGuard {
    _guard: tracing_appender::non_blocking::WorkerGuard,
}

/// Initialize a minimal console-only logger for tests or one-shot commands.
///
/// Subsequent calls are no-ops.
pub fn init_console_logging(level: &str) {
    let _ = tracing_subscriber::registry()
        .with(build_filter(level))
        .with(fmt::layer().with_writer(std::io::stderr).with_target(true).compact())
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_console_logging_is_reentrant() {
        init_console_logging("debug");
        init_console_logging("trace");
    }

    #[test]
    fn test_bad_level_falls_back() {
        // An unparsable directive must not panic.
        let _ = build_filter("not a [valid filter");
    }
}
