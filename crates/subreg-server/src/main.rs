//! subreg server binary.
//!
//! Reads `config.toml` (or the path specified with `--config`) and
//! `SUBREG_*` environment variables, opens the SQLite log, rebuilds the
//! catalog and serves the registry API over HTTP.

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::Parser;
use subreg_api::HttpForwarder;
use subreg_registry::Registry;
use subreg_server::ServerConfig;
use subreg_store_sqlite::SqliteLog;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "subreg schema registry server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
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

  // Load configuration.
  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config).required(false))
    .add_source(
      config::Environment::with_prefix("SUBREG")
        .try_parsing(true)
        .list_separator(",")
        .with_list_parse_key("whitelist_headers"),
    )
    .build()
    .context("failed to read config file")?;

  let server_cfg: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;

  let store_path = expand_tilde(&server_cfg.store_path);
  let leadership = server_cfg.leadership();

  let log = SqliteLog::open(&store_path)
    .await
    .with_context(|| format!("failed to open log at {store_path:?}"))?
    .with_leadership(leadership.clone());

  let forwarder = HttpForwarder::new(server_cfg.forward_timeout())
    .context("failed to build forwarder")?;
  let registry = Registry::new(server_cfg.registry_config(), log, forwarder);

  let applied = registry.sync().await.context("failed to rebuild catalog")?;
  tracing::info!(applied, ?leadership, tenant = %server_cfg.tenant, "catalog loaded");
  let _catch_up = registry.spawn_catch_up(server_cfg.sync_interval());

  let app = subreg_server::router(registry);
  let address = server_cfg.address();

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
