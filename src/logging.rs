//! # Logging
//!
//! Tracing subscriber setup. The terminal chart owns stdout, so in that mode
//! logs go to a daily rolling file instead.

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use crate::config::{LoggingConfig, RenderMode};
use crate::error::Result;

/// File name prefix of the rolling log files
pub const LOG_FILE_PREFIX: &str = "spectro-viewer.log";

/// Install the global tracing subscriber
///
/// `RUST_LOG` takes precedence over `logging.level`.
///
/// # Returns
///
/// * `Result<Option<WorkerGuard>>` - Guard for the file writer; keep it alive
///   until exit so buffered lines are flushed
///
/// # Errors
///
/// Returns error if the log directory cannot be created
pub fn init(config: &LoggingConfig, mode: RenderMode) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.level));

    match mode {
        RenderMode::Terminal => {
            std::fs::create_dir_all(&config.dir)?;
            let appender = tracing_appender::rolling::daily(&config.dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);

            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(writer)
                .with_ansi(false)
                .init();

            Ok(Some(guard))
        }
        RenderMode::Log => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_target(false)
                .init();

            Ok(None)
        }
    }
}
