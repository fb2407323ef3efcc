mod app;
mod cache;
mod changelog;
mod commands;
mod config;
mod error;
mod event;
mod remote;
mod schema;
mod session;
mod snapshot;
mod ui;
mod update;

use clap::Parser;
use color_eyre::Result;
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "yardloc")]
#[command(about = "Find vehicles by plate and keep their yard location up to date")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/yardloc/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Seconds a loaded table stays fresh (overrides cache.ttl_secs)
  #[arg(long)]
  ttl: Option<u64>,

  /// Operator to preselect on the login screen
  #[arg(short, long)]
  user: Option<String>,
}

/// Log to a daily file; the terminal belongs to the UI.
fn init_logging() -> Option<WorkerGuard> {
  let dir = dirs::data_dir()?.join("yardloc").join("logs");
  std::fs::create_dir_all(&dir).ok()?;

  let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::daily(
    dir,
    "yardloc.log",
  ));

  tracing_subscriber::registry()
    .with(EnvFilter::try_from_env("YARDLOC_LOG").unwrap_or_else(|_| "yardloc=info".into()))
    .with(
      tracing_subscriber::fmt::layer()
        .with_writer(writer)
        .with_ansi(false),
    )
    .init();

  Some(guard)
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();
  let _log_guard = init_logging();

  // Load configuration
  let mut config = config::Config::load(args.config.as_deref())?;
  if let Some(ttl) = args.ttl {
    config.cache.ttl_secs = ttl;
  }

  let backend = remote::Backend::connect(&config.backend)?;
  tracing::info!(backend = %remote::RemoteTable::describe(&backend), "starting");

  // Initialize and run the app
  let mut app = app::App::new(config, backend, args.user);
  app.run().await?;

  Ok(())
}
