//! Configuration management for filtersync.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::fetcher::DEFAULT_MAX_FILTER_SIZE;

/// Default configuration file location
pub const DEFAULT_CONFIG_PATH: &str = "/etc/filtersync/config.yaml";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    /// Directory holding one `<id>.txt` file per filter revision
    pub filter_dir: PathBuf,

    /// How often each filter is re-downloaded
    pub update_interval_hours: u32,

    /// How long the scheduler sleeps when no filter is due
    pub poll_interval_secs: u64,

    /// Per-request HTTP timeout
    pub download_timeout_secs: u64,

    /// Upper bound on a single observer call during a swap
    pub observer_timeout_secs: u64,

    /// Largest accepted filter body in bytes
    pub max_filter_size: usize,

    /// Subscribed filters
    pub filters: Vec<FilterSource>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            filter_dir: PathBuf::from("/var/lib/filtersync/filters"),
            update_interval_hours: 24,
            poll_interval_secs: 3600,
            download_timeout_secs: 30,
            observer_timeout_secs: 30,
            max_filter_size: DEFAULT_MAX_FILTER_SIZE,
            filters: Vec::new(),
        }
    }
}

/// Persisted part of a filter record
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FilterSource {
    pub id: u64,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    pub name: String,
    pub url: String,
}

fn default_enabled() -> bool {
    true
}

impl Config {
    /// Load configuration from YAML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;
        let config: Config = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path.as_ref()))?;

        config.validate()?;

        Ok(config)
    }

    /// Load the config if the file exists, otherwise start from defaults
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        if path.as_ref().exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.update_interval_hours == 0 {
            anyhow::bail!("update_interval_hours must be greater than zero");
        }
        if self.poll_interval_secs == 0 {
            anyhow::bail!("poll_interval_secs must be greater than zero");
        }
        if self.download_timeout_secs == 0 || self.observer_timeout_secs == 0 {
            anyhow::bail!("Timeouts must be greater than zero");
        }

        let mut names = HashSet::new();
        let mut urls = HashSet::new();
        let mut ids = HashSet::new();
        for filter in &self.filters {
            validate_source(&filter.name, &filter.url)?;
            // The id names the served file
            if !ids.insert(filter.id) {
                anyhow::bail!("Duplicate filter id: {}", filter.id);
            }
            if !names.insert(filter.name.as_str()) {
                anyhow::bail!("Duplicate filter name: {}", filter.name);
            }
            if !urls.insert(filter.url.as_str()) {
                anyhow::bail!("Duplicate filter URL: {}", filter.url);
            }
        }

        Ok(())
    }

    /// Save configuration to YAML file atomically
    ///
    /// Uses tempfile + rename pattern to prevent corruption on crash.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        use std::io::Write;
        use tempfile::NamedTempFile;

        let path = path.as_ref();
        let content = serde_yaml::to_string(self).context("Failed to serialize config")?;

        let parent_dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(parent_dir)
            .with_context(|| format!("Failed to create config directory: {:?}", parent_dir))?;
        let mut temp_file = NamedTempFile::new_in(parent_dir)
            .context("Failed to create temporary file for config")?;

        temp_file.write_all(content.as_bytes())?;
        temp_file.as_file().sync_all()?;

        temp_file
            .persist(path)
            .with_context(|| format!("Failed to persist config file: {:?}", path))?;

        Ok(())
    }

    pub fn update_interval(&self) -> chrono::Duration {
        chrono::Duration::hours(i64::from(self.update_interval_hours))
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn download_timeout(&self) -> Duration {
        Duration::from_secs(self.download_timeout_secs)
    }

    pub fn observer_timeout(&self) -> Duration {
        Duration::from_secs(self.observer_timeout_secs)
    }
}

/// Check a user-supplied name/URL pair before it reaches the store
pub fn validate_source(name: &str, url: &str) -> Result<()> {
    if name.trim().is_empty() {
        anyhow::bail!("Filter name must not be empty");
    }
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        anyhow::bail!("Filter '{}' URL must use HTTP or HTTPS: {}", name, url);
    }
    Ok(())
}
