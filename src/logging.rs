//! File logging. The terminal belongs to the UI, so nothing is written to it.

use color_eyre::{eyre::eyre, Result};
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LogConfig;

/// Environment variable that overrides the configured filter
const LOG_ENV: &str = "TCI_LOG";

/// Install the global subscriber writing to a daily log file.
///
/// The returned guard flushes buffered lines on drop; hold it until exit.
pub fn init(config: &LogConfig) -> Result<WorkerGuard> {
  let dir = log_dir()?;
  std::fs::create_dir_all(&dir)
    .map_err(|e| eyre!("Failed to create log directory {}: {}", dir.display(), e))?;

  let appender = tracing_appender::rolling::daily(&dir, "tci.log");
  let (writer, guard) = tracing_appender::non_blocking(appender);

  tracing_subscriber::registry()
    .with(filter(config))
    .with(
      fmt::layer()
        .with_writer(writer)
        .with_target(true)
        .with_ansi(false),
    )
    .try_init()
    .map_err(|e| eyre!("Failed to install log subscriber: {}", e))?;

  tracing::info!(dir = %dir.display(), "logging initialized");
  Ok(guard)
}

fn filter(config: &LogConfig) -> EnvFilter {
  EnvFilter::try_from_env(LOG_ENV)
    .or_else(|_| EnvFilter::try_new(&config.level))
    .unwrap_or_else(|_| EnvFilter::new(LogConfig::default().level))
}

fn log_dir() -> Result<PathBuf> {
  dirs::data_dir()
    .map(|dir| dir.join("tci").join("logs"))
    .ok_or_else(|| eyre!("Could not determine data directory for logs"))
}
