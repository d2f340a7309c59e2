use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::cache::CacheConfig;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
  pub api: ApiConfig,
  #[serde(default)]
  pub cache: CacheSettings,
  /// Message overrides keyed by translation key (e.g. "errors.network")
  #[serde(default)]
  pub translations: HashMap<String, String>,
  /// Directory for log files (defaults to the platform data dir)
  pub log_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
  pub base_url: String,
  #[serde(default = "default_timeout_secs")]
  pub timeout_secs: u64,
  /// Sent as Accept-Language and used for user-facing messages
  #[serde(default = "default_locale")]
  pub locale: String,
}

fn default_timeout_secs() -> u64 {
  30
}

fn default_locale() -> String {
  "fa".to_string()
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
pub struct CacheSettings {
  /// Seconds a successful fetch stays fresh
  #[serde(default = "default_stale_time_secs")]
  pub stale_time_secs: u64,
  /// Seconds an unobserved entry is kept before the sweep drops it
  #[serde(default = "default_cache_time_secs")]
  pub cache_time_secs: u64,
}

fn default_stale_time_secs() -> u64 {
  5 * 60
}

fn default_cache_time_secs() -> u64 {
  30 * 60
}

impl Default for CacheSettings {
  fn default() -> Self {
    Self {
      stale_time_secs: default_stale_time_secs(),
      cache_time_secs: default_cache_time_secs(),
    }
  }
}

impl CacheSettings {
  pub fn to_cache_config(self) -> Result<CacheConfig> {
    Ok(CacheConfig::new(
      seconds("cache.stale_time_secs", self.stale_time_secs)?,
      seconds("cache.cache_time_secs", self.cache_time_secs)?,
    ))
  }
}

fn seconds(field: &str, secs: u64) -> Result<chrono::Duration> {
  i64::try_from(secs)
    .ok()
    .and_then(chrono::Duration::try_seconds)
    .ok_or_else(|| eyre!("{field} is out of range: {secs}"))
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./vmdash.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/vmdash/config.yaml
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
        "No configuration file found. Create one at ~/.config/vmdash/config.yaml\n\
                 See vmdash.example.yaml for the format."
      )),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from("vmdash.yaml");
    if local.exists() {
      return Some(local);
    }

    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("vmdash").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  pub fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    Self::from_yaml(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))
  }

  pub fn from_yaml(contents: &str) -> Result<Self> {
    let config: Config = serde_yaml::from_str(contents)?;
    if config.api.base_url.trim().is_empty() {
      return Err(eyre!("api.base_url must not be empty"));
    }
    config.cache.to_cache_config()?;
    Ok(config)
  }

  /// Log directory, falling back to `<data dir>/vmdash/logs`.
  pub fn log_dir(&self) -> PathBuf {
    self.log_dir.clone().unwrap_or_else(|| {
      dirs::data_local_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("vmdash")
        .join("logs")
    })
  }

  /// Get a pre-issued API token from environment variables.
  ///
  /// Checks VMDASH_API_TOKEN first, then VMDASH_TOKEN as fallback.
  pub fn get_api_token() -> Option<String> {
    std::env::var("VMDASH_API_TOKEN")
      .or_else(|_| std::env::var("VMDASH_TOKEN"))
      .ok()
      .filter(|t| !t.trim().is_empty())
  }
}
