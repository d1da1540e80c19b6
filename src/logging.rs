//! Tracing setup: stderr plus a daily-rolling diagnostics log.

use std::path::Path;
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{Builder, Rotation};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const LOG_FILE_PREFIX: &str = "agent";
const LOG_FILE_SUFFIX: &str = "log";
const MAX_LOG_FILES: usize = 14;

/// Keeps the file writer flushing until dropped.
#[must_use = "dropping the guard stops writing the log file"]
pub struct LoggingGuard {
    _file: Option<WorkerGuard>,
}

/// Install the global subscriber.
///
/// `RUST_LOG` always takes precedence; `verbose` falls back to DEBUG,
/// otherwise INFO. When `log_dir` is given, events are also appended to
/// `<log_dir>/agent.<date>.log`. Calling this twice keeps the first
/// subscriber.
pub fn init(verbose: bool, log_dir: Option<&Path>) -> LoggingGuard {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let filter = EnvFilter::builder().with_default_directive(level.into()).from_env_lossy();

    let mut file_error = None;
    let (file_layer, guard) = match log_dir.map(build_appender) {
        Some(Ok(appender)) => {
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (Some(fmt::layer().with_ansi(false).with_writer(writer)), Some(guard))
        }
        Some(Err(err)) => {
            file_error = Some(err);
            (None, None)
        }
        None => (None, None),
    };

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .try_init();

    if let Some(err) = file_error {
        tracing::warn!(error = %err, "Log file unavailable; logging to stderr only");
    }
    LoggingGuard { _file: guard }
}

fn build_appender(log_dir: &Path) -> Result<tracing_appender::rolling::RollingFileAppender, String> {
    std::fs::create_dir_all(log_dir).map_err(|err| format!("{}: {err}", log_dir.display()))?;
    Builder::new()
        .rotation(Rotation::DAILY)
        .filename_prefix(LOG_FILE_PREFIX)
        .filename_suffix(LOG_FILE_SUFFIX)
        .max_log_files(MAX_LOG_FILES)
        .build(log_dir)
        .map_err(|err| err.to_string())
}
