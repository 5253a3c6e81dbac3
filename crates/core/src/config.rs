use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::catalog::source::DEFAULT_CATALOG_URL;
use crate::fetchers::ollama::DEFAULT_PROGRAM;
use crate::scheduler::{SchedulerConfig, DEFAULT_RETRY_THRESHOLD};
use crate::system::DEFAULT_PROBE_URL;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Catalog page settings
    #[serde(default)]
    pub catalog: CatalogConfig,

    /// Fetch queue settings
    #[serde(default)]
    pub fetch: FetchConfig,

    /// Connectivity probe settings
    #[serde(default)]
    pub connectivity: ConnectivityConfig,

    /// Interactive session settings
    #[serde(default)]
    pub session: SessionConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Listing page to scrape
    #[serde(default = "default_catalog_url")]
    pub url: String,

    /// Saved copy of the listing page (default: ~/.config/modelpull/modelListPage.html)
    #[serde(default)]
    pub cache_file: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Download tool to invoke
    #[serde(default = "default_program")]
    pub program: String,

    /// Failures before a model is moved to the back of the queue
    #[serde(default = "default_retry_threshold")]
    pub retry_threshold: u32,

    /// Pause after a failed download
    #[serde(default = "default_backoff_secs")]
    pub backoff_secs: u64,

    /// Give up on a model after this many failures (unset: never give up)
    #[serde(default)]
    pub max_total_attempts: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectivityConfig {
    /// Host checked when a download fails
    #[serde(default = "default_probe_url")]
    pub url: String,

    /// Seconds between checks while offline
    #[serde(default = "default_poll_secs")]
    pub poll_secs: u64,

    /// Request timeout for a single check
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Countdown before hibernating after a batch
    #[serde(default = "default_hibernate_countdown_secs")]
    pub hibernate_countdown_secs: u64,

    /// Columns used to print the listing
    #[serde(default = "default_columns")]
    pub columns: usize,
}

fn default_catalog_url() -> String {
    DEFAULT_CATALOG_URL.to_string()
}

fn default_program() -> String {
    DEFAULT_PROGRAM.to_string()
}

fn default_retry_threshold() -> u32 {
    DEFAULT_RETRY_THRESHOLD
}

fn default_backoff_secs() -> u64 {
    10
}

fn default_probe_url() -> String {
    DEFAULT_PROBE_URL.to_string()
}

fn default_poll_secs() -> u64 {
    10
}

fn default_timeout_secs() -> u64 {
    5
}

fn default_hibernate_countdown_secs() -> u64 {
    120
}

fn default_columns() -> usize {
    4
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            url: default_catalog_url(),
            cache_file: None,
        }
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            program: default_program(),
            retry_threshold: default_retry_threshold(),
            backoff_secs: default_backoff_secs(),
            max_total_attempts: None,
        }
    }
}

impl Default for ConnectivityConfig {
    fn default() -> Self {
        Self {
            url: default_probe_url(),
            poll_secs: default_poll_secs(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            hibernate_countdown_secs: default_hibernate_countdown_secs(),
            columns: default_columns(),
        }
    }
}

impl Config {
    /// Get the base directory: ~/.config/modelpull/
    pub fn base_dir() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().context("Could not determine config directory")?;
        Ok(config_dir.join("modelpull"))
    }

    /// Get the config file path: ~/.config/modelpull/config.toml
    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::base_dir()?.join("config.toml"))
    }

    /// Load config from default location
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            let config: Config = toml::from_str(&content)
                .with_context(|| format!("Invalid config file {}", path.display()))?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    /// Save config to default location
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Cached listing page, configured or under the base directory.
    pub fn cache_file(&self) -> Result<PathBuf> {
        match &self.catalog.cache_file {
            Some(path) => Ok(path.clone()),
            None => Ok(Self::base_dir()?.join("modelListPage.html")),
        }
    }

    pub fn scheduler(&self) -> SchedulerConfig {
        SchedulerConfig {
            retry_threshold: self.fetch.retry_threshold.max(1),
            backoff: Duration::from_secs(self.fetch.backoff_secs),
            poll_interval: Duration::from_secs(self.connectivity.poll_secs),
            max_total_attempts: self.fetch.max_total_attempts,
        }
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.connectivity.timeout_secs)
    }

    pub fn hibernate_countdown(&self) -> Duration {
        Duration::from_secs(self.session.hibernate_countdown_secs)
    }
}
