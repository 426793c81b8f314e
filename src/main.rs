mod api;
mod app;
mod cache;
mod commands;
mod config;
mod event;
mod list;
mod logging;
mod mutation;
mod query;
mod resources;
mod table;
mod ui;

use api::{ApiClient, DemoBackend};
use cache::QueryCache;
use clap::Parser;
use color_eyre::eyre::eyre;
use color_eyre::Result;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use ui::views::ViewContext;

#[derive(Parser, Debug)]
#[command(name = "rentdash")]
#[command(about = "A terminal admin dashboard for a vehicle-rental platform")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/rentdash/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Base URL of the rental API, e.g. http://localhost:8080
  #[arg(short, long)]
  api_url: Option<String>,

  /// Run against a seeded in-memory backend instead of the API
  #[arg(long)]
  demo: bool,

  /// Log level or filter directive (RUST_LOG takes precedence)
  #[arg(short, long)]
  log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();

  // Load configuration
  let mut config = config::Config::load(args.config.as_deref())?;

  // Command line wins over the config file
  if let Some(url) = args.api_url {
    config.api.base_url = url;
  }
  if let Some(level) = args.log_level {
    config.log.level = level;
  }
  config.validate()?;

  // Keep the guard alive so buffered log lines are flushed on exit
  let _log_guard = logging::init(&config.log.level, &config.log_directory())?;

  let api = if args.demo {
    info!("using the in-memory demo backend");
    ApiClient::with_transport(Arc::new(DemoBackend::seeded()))
  } else {
    info!(base_url = %config.api.base_url, "using the rental API");
    ApiClient::new(&config).map_err(|e| eyre!("Failed to create API client: {}", e))?
  };

  let title = if args.demo {
    "demo".to_string()
  } else {
    config.display_title()
  };

  // Initialize and run the app
  let ctx = ViewContext::new(api, QueryCache::new(), config);
  let mut app = app::App::new(ctx, title);
  app.run().await?;

  Ok(())
}
