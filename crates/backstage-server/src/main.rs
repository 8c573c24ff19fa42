//! Backstage server binary.
//!
//! Reads `backstage.toml` (or the path given with `--config`) plus
//! `BACKSTAGE_*` environment overrides, opens the SQLite catalog and serves
//! the REST API over HTTP.

use std::path::PathBuf;

use anyhow::Context as _;
use backstage_api::{AppState, postal::PostalClient};
use backstage_server::{build_app, load_config};
use backstage_store_sqlite::SqliteStore;
use clap::Parser;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Backstage theater catalog server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "backstage.toml")]
  config: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  // Initialise tracing.
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();
  let config = load_config(&cli.config)?;

  let store = SqliteStore::open(&config.database_path)
    .await
    .with_context(|| format!("failed to open store at {:?}", config.database_path))?;
  let postal = PostalClient::new(config.postal()).context("failed to build postal client")?;

  let app = build_app(AppState::new(store, postal), &config)?;
  let address = config.address();

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}
