//! OSAS Connect server binary.
//!
//! Reads `config.toml` (or the path given with `--config`) layered with
//! `OSAS_*` environment variables, opens the SQLite store, and serves the
//! JSON API over HTTP.
//!
//! # Bootstrap admin
//!
//! Generate a PHC string and set it as `admin_password_hash` together with
//! `admin_email`; the account is created on first start:
//!
//! ```
//! cargo run -p osas-server -- hash-password
//! ```

mod mailer;
mod settings;

use std::{path::PathBuf, sync::Arc};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use osas_api::{AppState, LocalDiskStorage};
use osas_core::{
  store::ScholarshipStore as _,
  user::{NewUser, Role},
};
use osas_store_sqlite::SqliteStore;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use crate::{mailer::ChannelMailer, settings::ServerConfig};

#[derive(Parser)]
#[command(author, version, about = "OSAS Connect scholarship server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml", global = true)]
  config: PathBuf,

  #[command(subcommand)]
  command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
  /// Serve the HTTP API (default).
  Serve,
  /// Print the argon2 hash for a password entered on stdin and exit.
  HashPassword,
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

  match cli.command.unwrap_or(Command::Serve) {
    Command::HashPassword => {
      let password = read_password()?;
      let hash = osas_api::auth::hash_password(&password)
        .map_err(|e| anyhow::anyhow!("argon2 error: {e}"))?;
      println!("{hash}");
      Ok(())
    }
    Command::Serve => serve(ServerConfig::load(&cli.config)?).await,
  }
}

async fn serve(cfg: ServerConfig) -> anyhow::Result<()> {
  if let Some(parent) = cfg.database_path.parent() {
    std::fs::create_dir_all(parent)
      .with_context(|| format!("failed to create {parent:?}"))?;
  }
  let store = SqliteStore::open(&cfg.database_path)
    .await
    .with_context(|| format!("failed to open store at {:?}", cfg.database_path))?;

  bootstrap_admin(&store, &cfg).await?;

  let files = LocalDiskStorage::new(cfg.storage_root.clone(), cfg.files_base_url());
  let (mailer, mail_worker) = ChannelMailer::spawn();
  let state = AppState::new(store, files, Arc::new(mailer), cfg.api_config());

  let app = osas_api::router(state).layer(TraceLayer::new_for_http());
  let address = cfg.address();

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app)
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("server error")?;

  // The router (and with it the last mail sender) is gone; let the queue
  // drain before exiting.
  let delivered = mail_worker.await.context("mail worker panicked")?;
  tracing::info!(delivered, "shut down");
  Ok(())
}

/// Create the configured admin account if it does not exist yet.
async fn bootstrap_admin(store: &SqliteStore, cfg: &ServerConfig) -> anyhow::Result<()> {
  let (Some(email), Some(password_hash)) = (&cfg.admin_email, &cfg.admin_password_hash) else {
    return Ok(());
  };
  if store.find_user_by_email(email).await.context("failed to look up admin")?.is_some() {
    return Ok(());
  }
  let admin = store
    .create_user(NewUser {
      name:               cfg.admin_name.clone(),
      email:              email.clone(),
      role:               Role::Admin,
      password_hash:      password_hash.clone(),
      verification_token: None,
    })
    .await
    .context("failed to create bootstrap admin")?;
  tracing::info!(user_id = %admin.user_id, email = %admin.email, "bootstrap admin created");
  Ok(())
}

async fn shutdown_signal() {
  if let Err(e) = tokio::signal::ctrl_c().await {
    tracing::error!(error = %e, "failed to listen for shutdown signal");
    std::future::pending::<()>().await;
  }
  tracing::info!("shutdown requested");
}

/// Read a password from stdin.
fn read_password() -> anyhow::Result<String> {
  use std::io::{self, BufRead, Write};
  print!("Password: ");
  io::stdout().flush().ok();
  let mut line = String::new();
  io::stdin().lock().read_line(&mut line)?;
  Ok(line.trim_end_matches(['\n', '\r']).to_owned())
}
