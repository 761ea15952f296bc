//! checkind: the check-in board daemon.
//!
//! Reads `checkin.toml` (or the path given with `--config`), overlays any
//! `CHECKIN_*` environment variables, then polls the mail spool forever.
//! With `listen` set, the pages are also served over HTTP.

use std::{path::PathBuf, sync::Arc};

use anyhow::Context as _;
use checkin_daemon::{
  Daemon,
  DaemonConfig,
  http::{AppState, router},
  spool::SpoolDir,
};
use checkin_store_json::JsonStore;
use chrono::Local;
use clap::Parser;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Check-in board daemon")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "checkin.toml")]
  config: PathBuf,

  /// Run a single poll cycle and exit.
  #[arg(long)]
  once: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config).required(false))
    .add_source(config::Environment::with_prefix("CHECKIN"))
    .build()
    .context("failed to read config file")?;

  let config: DaemonConfig = settings
    .try_deserialize()
    .context("failed to deserialise DaemonConfig")?;
  let config = Arc::new(config);

  let store = JsonStore::open(config.layout())
    .await
    .context("failed to open state directory")?;
  let spool = SpoolDir::new(&config.spool_dir);

  let mut daemon = Daemon::start(
    Arc::clone(&config),
    store,
    spool,
    Local::now().naive_local(),
  )
  .await;

  if cli.once {
    daemon
      .cycle(Local::now().naive_local())
      .await
      .context("poll cycle failed")?;
    return Ok(());
  }

  if let Some(addr) = &config.listen {
    let listener = TcpListener::bind(addr)
      .await
      .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!(%addr, "serving pages");

    let app = router(AppState {
      board:  daemon.board(),
      config: Arc::clone(&config),
    });
    tokio::spawn(async move {
      if let Err(e) = axum::serve(listener, app).await {
        tracing::error!(error = %e, "http server stopped");
      }
    });
  }

  tracing::info!(
    spool = %config.spool_dir.display(),
    interval_secs = config.interval_secs,
    "polling"
  );
  daemon.run().await;
  Ok(())
}
