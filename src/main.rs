mod app;
mod cache;
mod config;
mod error;
mod event;
mod logging;
mod parts;
mod query;
mod ui;

use cache::QueryStore;
use clap::Parser;
use color_eyre::Result;
use parts::{CachedPartsClient, HttpPartsApi};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "tci")]
#[command(about = "A terminal UI for time-machine configurations and part status")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/tci/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Open this machine (uuid or serial number) on start
  #[arg(short, long)]
  machine: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();

  let config = config::Config::load(args.config.as_deref())?;
  let _log_guard = logging::init(&config.log)?;
  info!(api = %config.api.url, "configuration loaded");

  let api_key = config::Config::get_api_key()?;
  let api = HttpPartsApi::new(&config.api, &api_key)?;
  let client = CachedPartsClient::new(api, QueryStore::new(), config.cache);

  let mut app = app::App::new(&config, client, args.machine);
  app.run().await?;

  Ok(())
}
