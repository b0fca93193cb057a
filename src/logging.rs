//! Tracing subscriber setup.
//!
//! Diagnostics always go to stderr so stdout can carry the JSON event
//! stream. An optional daily-rolling file layer mirrors everything to
//! `<log dir>/voxtris.log.<date>`.

use crate::config::LoggingConfig;
use crate::error::{Result, VoiceError};
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, fmt};

const LOG_FILE_PREFIX: &str = "voxtris.log";

/// Build the filter: `RUST_LOG` wins, then the configured directive, then `info`.
#[must_use]
pub fn env_filter(config: &LoggingConfig) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.filter))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Directory the file layer writes into.
#[must_use]
pub fn log_dir(config: &LoggingConfig) -> PathBuf {
    config
        .log_dir
        .clone()
        .unwrap_or_else(crate::voxtris_dirs::logs_dir)
}

/// Install the global subscriber.
///
/// Returns the file writer's guard when file logging is enabled. Keep it
/// alive for the life of the process or buffered lines are lost.
///
/// # Errors
///
/// Returns an error if the log directory cannot be created or a global
/// subscriber is already installed.
pub fn init_tracing(config: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let stderr_layer = fmt::layer().with_writer(std::io::stderr).boxed();

    let (file_layer, guard) = if config.log_to_file {
        let dir = log_dir(config);
        std::fs::create_dir_all(&dir)?;
        let appender = tracing_appender::rolling::daily(&dir, LOG_FILE_PREFIX);
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let layer = fmt::layer().with_writer(writer).with_ansi(false).boxed();
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(env_filter(config))
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| VoiceError::Config(format!("cannot install tracing subscriber: {e}")))?;

    if let Some(dir) = config.log_to_file.then(|| log_dir(config)) {
        tracing::debug!(dir = %dir.display(), "file logging enabled");
    }
    Ok(guard)
}
