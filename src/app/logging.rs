//! Usage: Process-wide tracing setup (stdout plus an optional daily-rolling log file).

use crate::shared::error::{AppError, AppResult};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{fmt, EnvFilter, Registry};

pub const ENV_LOG_DIR: &str = "PORTAL_LOG_DIR";
const LOG_FILE_PREFIX: &str = "passport-portal.log";
const DEFAULT_FILTER: &str = "info";

/// Keeps the file writer flushing; drop it only at process exit.
#[must_use = "dropping the guard stops the log file writer"]
pub struct LoggingGuard {
    _file: Option<WorkerGuard>,
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Installs the global subscriber. `log_dir` is usually `PORTAL_LOG_DIR`.
pub fn init(log_dir: Option<&std::path::Path>) -> AppResult<LoggingGuard> {
    tracing_log::LogTracer::init()
        .map_err(|e| AppError::with_source("LOGGING_INIT", "failed to bridge log records", e))?;

    let stdout_layer = fmt::layer().with_target(true);

    let (file_layer, file_guard) = match log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir).map_err(|e| {
                AppError::with_source(
                    "LOGGING_INIT",
                    format!("failed to create log dir {}", dir.display()),
                    e,
                )
            })?;
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().with_ansi(false).with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    let subscriber = Registry::default()
        .with(env_filter())
        .with(stdout_layer)
        .with(file_layer);

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| AppError::with_source("LOGGING_INIT", "subscriber already installed", e))?;

    Ok(LoggingGuard { _file: file_guard })
}

/// Reads `PORTAL_LOG_DIR` from the environment.
pub fn log_dir_from_env() -> Option<std::path::PathBuf> {
    std::env::var_os(ENV_LOG_DIR)
        .filter(|v| !v.is_empty())
        .map(std::path::PathBuf::from)
}
