//! Tracing setup. The terminal belongs to the UI, so events go to a daily
//! rolling file instead of stderr.

use color_eyre::{eyre::eyre, Result};
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

const LOG_FILE_PREFIX: &str = "rentdash.log";

/// Quiet the HTTP stack unless asked for explicitly.
fn build_env_filter(level: &str) -> Result<EnvFilter> {
  if let Ok(filter) = EnvFilter::try_from_default_env() {
    return Ok(filter);
  }
  let directives = format!("{},hyper=warn,reqwest=warn,rustls=warn", level);
  EnvFilter::try_new(&directives).map_err(|e| eyre!("Invalid log level '{}': {}", level, e))
}

/// Install the global subscriber. Keep the guard alive for the life of the
/// program or buffered events are lost on exit.
pub fn init(level: &str, directory: &Path) -> Result<WorkerGuard> {
  std::fs::create_dir_all(directory)
    .map_err(|e| eyre!("Failed to create log directory {}: {}", directory.display(), e))?;

  let appender = tracing_appender::rolling::daily(directory, LOG_FILE_PREFIX);
  let (writer, guard) = tracing_appender::non_blocking(appender);

  let file_layer = tracing_subscriber::fmt::layer()
    .with_ansi(false)
    .with_target(true)
    .with_writer(writer);

  tracing_subscriber::registry()
    .with(build_env_filter(level)?)
    .with(file_layer)
    .try_init()
    .map_err(|e| eyre!("Failed to install tracing subscriber: {}", e))?;

  tracing::info!(directory = %directory.display(), level, "logging initialized");
  Ok(guard)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_level_directive() {
    // RUST_LOG may be set in the environment running the tests
    if std::env::var("RUST_LOG").is_err() {
      assert!(build_env_filter("debug").is_ok());
      assert!(build_env_filter("rentdash=loud").is_err());
    }
  }
}
