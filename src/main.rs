mod api;
mod app;
mod auth;
mod cache;
mod commands;
mod config;
mod event;
mod query;
mod ui;
mod upload;

use clap::Parser;
use color_eyre::Result;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "invo")]
#[command(about = "A terminal UI for an invoice analysis service")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/invo/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Backend base URL (overrides config and INVO_API_URL)
  #[arg(short, long)]
  api_url: Option<String>,

  /// Filter invoice lists and dashboard stats to this backend user id
  #[arg(short, long)]
  user: Option<String>,
}

/// Log to a file in the data directory; stdout belongs to the TUI.
/// Filtered via INVO_LOG (defaults to info).
fn init_logging() -> Option<tracing_appender::non_blocking::WorkerGuard> {
  let log_dir = dirs::data_dir()?.join("invo");
  std::fs::create_dir_all(&log_dir).ok()?;

  let appender = tracing_appender::rolling::daily(log_dir, "invo.log");
  let (writer, guard) = tracing_appender::non_blocking(appender);

  let filter = EnvFilter::try_from_env("INVO_LOG").unwrap_or_else(|_| EnvFilter::new("info"));

  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(writer)
    .with_ansi(false)
    .init();

  Some(guard)
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;
  let _log_guard = init_logging();

  let args = Args::parse();

  // Load configuration
  let config = config::Config::load(args.config.as_deref())?;

  // Override backend URL if specified on command line
  let config = if let Some(url) = args.api_url {
    config::Config {
      api: config::ApiConfig { base_url: url },
      ..config
    }
  } else {
    config
  };

  // Initialize and run the app
  let mut app = app::App::new(config, args.user).await?;
  app.run().await?;

  Ok(())
}
