use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
  pub api: ApiConfig,
  /// Custom title for header (defaults to "Time Machines")
  pub title: Option<String>,
  #[serde(default)]
  pub cache: CacheConfig,
  #[serde(default)]
  pub log: LogConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
  /// Base URL of the configuration service, e.g. "https://parts.example.com"
  pub url: String,
  /// Header the API key is sent in
  #[serde(default = "default_key_header")]
  pub key_header: String,
  #[serde(default = "default_timeout", with = "humantime_serde")]
  pub timeout: Duration,
}

fn default_key_header() -> String {
  "x-api-key".to_string()
}

fn default_timeout() -> Duration {
  Duration::from_secs(30)
}

/// How long each kind of cached entry is served before it is revalidated.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CacheConfig {
  #[serde(with = "humantime_serde")]
  pub children_stale_after: Duration,
  #[serde(with = "humantime_serde")]
  pub parts_stale_after: Duration,
  /// Zero means every new screen revalidates
  #[serde(with = "humantime_serde")]
  pub allowable_statuses_stale_after: Duration,
}

impl Default for CacheConfig {
  fn default() -> Self {
    Self {
      children_stale_after: Duration::from_secs(5 * 60),
      parts_stale_after: Duration::from_secs(5 * 60),
      allowable_statuses_stale_after: Duration::ZERO,
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LogConfig {
  /// `EnvFilter` directive; `TCI_LOG` overrides it
  pub level: String,
}

impl Default for LogConfig {
  fn default() -> Self {
    Self {
      level: "tci=info".to_string(),
    }
  }
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./tci.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/tci/config.yaml
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    match path {
      Some(p) => Self::load_from_path(&p),
      None => Err(eyre!(
        "No configuration file found. Create one at ~/.config/tci/config.yaml\n\
                 See config.example.yaml for the format."
      )),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from("tci.yaml");
    if local.exists() {
      return Some(local);
    }

    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("tci").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    Self::parse(&contents).map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))
  }

  fn parse(contents: &str) -> Result<Self, serde_yaml::Error> {
    serde_yaml::from_str(contents)
  }

  /// Get the API key from environment variables.
  ///
  /// Checks TCI_API_KEY first, then API_KEY as fallback.
  pub fn get_api_key() -> Result<String> {
    std::env::var("TCI_API_KEY")
      .or_else(|_| std::env::var("API_KEY"))
      .map_err(|_| eyre!("API key not found. Set TCI_API_KEY or API_KEY environment variable."))
  }
}
