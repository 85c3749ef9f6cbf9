//! Configuration management for itbooks.
//!
//! Handles loading, saving, and validating configuration from
//! platform-specific config directories.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Application name used for config and data directories.
const APP_NAME: &str = "itbooks";

/// Default config filename.
const CONFIG_FILENAME: &str = "config.toml";

/// Default store filename.
const STORE_FILENAME: &str = "books.json";

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Web scraping settings.
    pub scraping: ScrapingConfig,

    /// Book store settings.
    pub storage: StorageConfig,
}

/// Web scraping configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScrapingConfig {
    /// Delay before each web request in seconds.
    pub delay_between_requests_sec: f64,

    /// Per-request timeout in seconds.
    pub timeout_secs: u64,

    /// User agent sent with every request.
    pub user_agent: String,

    /// Listing pages followed per site, start page included.
    pub max_pages: u32,

    /// Enable scraper debug logging.
    pub debug: bool,

    /// Per-site overrides of `max_pages`, keyed by site name.
    pub max_pages_per_site: HashMap<String, u32>,
}

impl Default for ScrapingConfig {
    fn default() -> Self {
        Self {
            delay_between_requests_sec: 0.5,
            timeout_secs: 30,
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".to_string(),
            max_pages: 5,
            debug: false,
            max_pages_per_site: HashMap::new(),
        }
    }
}

impl ScrapingConfig {
    /// Returns the pagination cap for the given site.
    pub fn max_pages_for(&self, site: &str) -> u32 {
        self.max_pages_per_site
            .get(site)
            .copied()
            .unwrap_or(self.max_pages)
    }
}

/// Book store configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Store file. Defaults to `<data dir>/itbooks/books.json`.
    pub path: Option<PathBuf>,
}

impl Config {
    /// Returns the platform-specific config directory path.
    pub fn config_dir() -> Result<PathBuf, ConfigError> {
        dirs::config_dir()
            .map(|p| p.join(APP_NAME))
            .ok_or(ConfigError::NoDir("config"))
    }

    /// Returns the full path to the config file.
    pub fn config_path() -> Result<PathBuf, ConfigError> {
        Ok(Self::config_dir()?.join(CONFIG_FILENAME))
    }

    /// Loads configuration from the default location.
    ///
    /// If the config file doesn't exist, creates a default one.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::config_path()?;
        Self::load_from(&path)
    }

    /// Loads configuration from a specific path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            let config = Config::default();
            config.save_to(path)?;
            return Ok(config);
        }

        let content = std::fs::read_to_string(path)?;
        let config: Config =
            toml::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        Ok(config)
    }

    /// Saves configuration to a specific path.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content =
            toml::to_string_pretty(self).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        std::fs::write(path, content)?;
        Ok(())
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.scraping.max_pages == 0 {
            return Err(ConfigError::InvalidValue {
                key: "scraping.max_pages".to_string(),
                message: "must be greater than 0".to_string(),
            });
        }

        if let Some((site, _)) = self
            .scraping
            .max_pages_per_site
            .iter()
            .find(|(_, pages)| **pages == 0)
        {
            return Err(ConfigError::InvalidValue {
                key: format!("scraping.max_pages_per_site.{}", site),
                message: "must be greater than 0".to_string(),
            });
        }

        if self.scraping.timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "scraping.timeout_secs".to_string(),
                message: "must be greater than 0".to_string(),
            });
        }

        if self.scraping.delay_between_requests_sec < 0.0 {
            return Err(ConfigError::InvalidValue {
                key: "scraping.delay_between_requests_sec".to_string(),
                message: "must not be negative".to_string(),
            });
        }

        Ok(())
    }

    /// Returns the effective store path, using config or default.
    pub fn store_path(&self) -> Result<PathBuf, ConfigError> {
        if let Some(ref path) = self.storage.path {
            return Ok(path.clone());
        }

        dirs::data_dir()
            .map(|p| p.join(APP_NAME).join(STORE_FILENAME))
            .ok_or(ConfigError::NoDir("data"))
    }
}
