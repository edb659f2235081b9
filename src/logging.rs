use color_eyre::{eyre::eyre, Result};
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use crate::config::LogConfig;

/// Filter used when RUST_LOG is unset.
fn default_directive(config: &LogConfig, verbosity: u8) -> String {
  match verbosity {
    0 => config
      .level
      .clone()
      .unwrap_or_else(|| "fsadmin=warn".to_string()),
    1 => "fsadmin=info".to_string(),
    2 => "fsadmin=debug".to_string(),
    _ => "fsadmin=trace".to_string(),
  }
}

/// Install the global subscriber.
///
/// Logs go to stderr, or to a daily-rotated file when `log.file` is set.
/// Keep the returned guard alive until exit so buffered lines get flushed.
pub fn init(config: &LogConfig, verbosity: u8) -> Result<Option<WorkerGuard>> {
  let filter = EnvFilter::try_from_default_env()
    .unwrap_or_else(|_| EnvFilter::new(default_directive(config, verbosity)));

  match &config.file {
    Some(path) => {
      let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
      let file_name = path
        .file_name()
        .ok_or_else(|| eyre!("Invalid log file path: {}", path.display()))?;

      let appender = tracing_appender::rolling::daily(dir, file_name);
      let (writer, guard) = tracing_appender::non_blocking(appender);
      tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .try_init()
        .map_err(|e| eyre!("Failed to initialize logging: {}", e))?;
      Ok(Some(guard))
    }
    None => {
      tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .map_err(|e| eyre!("Failed to initialize logging: {}", e))?;
      Ok(None)
    }
  }
}
