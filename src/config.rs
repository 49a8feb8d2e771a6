use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::recommendations::cache::DEFAULT_TTL_HOURS;

/// Client configuration, read from `config.toml` under the platform
/// config directory. Every field has a default so a missing or partial
/// file is fine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClientConfig {
    /// Base URL of the recommendation backend.
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    /// Per-request timeout for backend calls, in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Age past which cached recommendations are discarded.
    #[serde(default = "default_cache_ttl_hours")]
    pub cache_ttl_hours: i64,
    /// Override for the local data directory (cache database location).
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
}

fn default_api_base_url() -> String {
    "https://api.swellmate.app/v1".to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_cache_ttl_hours() -> i64 {
    DEFAULT_TTL_HOURS
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            request_timeout_secs: default_request_timeout_secs(),
            cache_ttl_hours: default_cache_ttl_hours(),
            data_dir: None,
        }
    }
}

impl ClientConfig {
    /// Load the configuration from the default location, falling back to
    /// defaults when no file exists.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load from an explicit path. Missing file yields the defaults.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("No config file at {:?}, using defaults", path);
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {:?}", path))?;
        let config: ClientConfig = toml::from_str(&raw)
            .with_context(|| format!("Failed to parse config file {:?}", path))?;
        Ok(config)
    }

    /// Write the configuration to the default location.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    /// Write to an explicit path atomically: temp file in the same
    /// directory, then rename, so an interrupted write never leaves a
    /// partial file.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        let parent = path
            .parent()
            .with_context(|| format!("Config path has no parent directory: {:?}", path))?;
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create config directory {:?}", parent))?;

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;

        let mut temp = NamedTempFile::new_in(parent)?;
        temp.write_all(content.as_bytes())?;
        temp.flush()?;
        temp.persist(path)
            .with_context(|| format!("Failed to persist config to {:?}", path))?;

        info!("Wrote config to {:?}", path);
        Ok(())
    }

    /// Path of the config file under the platform config directory.
    pub fn config_path() -> Result<PathBuf> {
        let dir = dirs::config_dir().context("No config directory on this platform")?;
        Ok(dir.join("SwellMate").join("config.toml"))
    }

    /// The local data directory, created if needed.
    pub fn data_dir(&self) -> Result<PathBuf> {
        let dir = match &self.data_dir {
            Some(dir) => dir.clone(),
            None => dirs::data_dir()
                .context("No data directory on this platform")?
                .join("SwellMate"),
        };
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create data directory {:?}", dir))?;
        Ok(dir)
    }

    /// Path of the recommendation cache database.
    pub fn cache_db_path(&self) -> Result<PathBuf> {
        Ok(self.data_dir()?.join("recommendation_cache.db"))
    }
}
