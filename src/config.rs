use chrono::Duration;
use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use url::Url;

use crate::api::endpoints::DEFAULT_BASE_URL;
use crate::cache::CacheConfig;

const BASE_URL_ENV: &str = "FSADMIN_BASE_URL";
const PASSWORD_ENV: &str = "FSADMIN_PASSWORD";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
  pub api: ApiConfig,
  pub cache: CacheSettings,
  pub session: SessionConfig,
  pub log: LogConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
  /// Versioned API root, e.g. `https://host/api/v1`
  pub base_url: String,
  pub timeout_secs: u64,
}

impl Default for ApiConfig {
  fn default() -> Self {
    Self {
      base_url: DEFAULT_BASE_URL.to_string(),
      timeout_secs: 10,
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
  /// Seconds a fetched result is served without refetching
  pub stale_secs: u64,
  /// Seconds an idle, unobserved entry survives
  pub retention_secs: u64,
  pub read_retries: u32,
}

impl Default for CacheSettings {
  fn default() -> Self {
    Self {
      stale_secs: 300,
      retention_secs: 1800,
      read_retries: 2,
    }
  }
}

impl CacheSettings {
  pub fn to_cache_config(&self) -> Result<CacheConfig> {
    Ok(CacheConfig {
      stale_time: seconds("cache.stale_secs", self.stale_secs)?,
      retention: seconds("cache.retention_secs", self.retention_secs)?,
      read_retries: self.read_retries,
    })
  }
}

fn seconds(name: &str, secs: u64) -> Result<Duration> {
  i64::try_from(secs)
    .ok()
    .and_then(Duration::try_seconds)
    .ok_or_else(|| eyre!("{} is out of range: {}", name, secs))
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
  /// SQLite file holding the session (default: $DATA_DIR/fsadmin/session.db)
  pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LogConfig {
  /// Write logs to this file (rotated daily) instead of stderr
  pub file: Option<PathBuf>,
  /// Filter directive used when RUST_LOG is unset, e.g. "fsadmin=debug"
  pub level: Option<String>,
}

impl Config {
  /// Load configuration from file, then apply environment overrides.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./fsadmin.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/fsadmin/config.yaml
  ///
  /// Without any file the defaults are used.
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

    let config = match path {
      Some(p) => Self::load_from_path(&p)?,
      None => Self::default(),
    };

    let config = config.apply_env();
    config.validate()?;
    Ok(config)
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("fsadmin.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("fsadmin").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    Self::from_yaml(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))
  }

  pub fn from_yaml(contents: &str) -> Result<Self> {
    // an empty file is a valid, all-defaults config
    if contents.trim().is_empty() {
      return Ok(Self::default());
    }
    Ok(serde_yaml::from_str(contents)?)
  }

  fn apply_env(self) -> Self {
    match std::env::var(BASE_URL_ENV) {
      Ok(url) if !url.trim().is_empty() => self.with_base_url(url),
      _ => self,
    }
  }

  pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
    self.api.base_url = base_url.into().trim().trim_end_matches('/').to_string();
    self
  }

  pub fn validate(&self) -> Result<()> {
    let url = Url::parse(&self.api.base_url)
      .map_err(|e| eyre!("Invalid API base URL '{}': {}", self.api.base_url, e))?;
    if !matches!(url.scheme(), "http" | "https") {
      return Err(eyre!(
        "API base URL must use http or https, got '{}'",
        url.scheme()
      ));
    }
    if self.api.timeout_secs == 0 {
      return Err(eyre!("api.timeout_secs must be greater than zero"));
    }
    self.cache.to_cache_config()?;
    Ok(())
  }

  /// Admin password from the environment, if set.
  ///
  /// Checks FSADMIN_PASSWORD.
  pub fn password_from_env() -> Option<String> {
    std::env::var(PASSWORD_ENV).ok().filter(|p| !p.is_empty())
  }
}
