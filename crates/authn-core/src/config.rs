//! Configuration management.
//!
//! Holds the REST backend settings and the session monitor timings.
//! Configuration is stored at `~/.config/authn/config.json`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::adapter::RestAdapterConfig;

/// Application name used for config/cache directory paths
const APP_NAME: &str = "authn";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// How often the monitor re-checks the session
const DEFAULT_CHECK_INTERVAL_MS: u64 = 30_000;

/// Start refreshing once this close to expiry (5 minutes)
const DEFAULT_REFRESH_WINDOW_MS: i64 = 300_000;

/// Force a logout once this close to expiry without a fresh token (1 minute)
const DEFAULT_EXPIRY_FLOOR_MS: i64 = 60_000;

/// How a refreshed session's expiry is chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefreshPolicy {
    /// Keep the lifetime the old session had left at refresh time
    #[default]
    PreserveRemaining,
    /// Use the lifetime returned by the adapter, if it returned one
    TrustAdapter,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    pub check_interval_ms: u64,
    pub refresh_window_ms: i64,
    pub expiry_floor_ms: i64,
    pub refresh_policy: RefreshPolicy,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            check_interval_ms: DEFAULT_CHECK_INTERVAL_MS,
            refresh_window_ms: DEFAULT_REFRESH_WINDOW_MS,
            expiry_floor_ms: DEFAULT_EXPIRY_FLOOR_MS,
            refresh_policy: RefreshPolicy::default(),
        }
    }
}

impl MonitorConfig {
    /// Check interval, never shorter than 1ms
    pub fn check_interval(&self) -> Duration {
        Duration::from_millis(self.check_interval_ms.max(1))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    pub rest: Option<RestAdapterConfig>,
    #[serde(default)]
    pub monitor: MonitorConfig,
    pub session_dir: Option<PathBuf>,
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    /// Read a config file; a missing file yields the defaults
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            serde_json::from_str(&contents).context("Failed to parse config file")
        } else {
            Ok(Self::default())
        }
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory {}", parent.display())
            })?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)
            .with_context(|| format!("Failed to write config file {}", path.display()))?;
        Ok(())
    }

    /// Point the REST adapter at `base_url`, keeping any other REST settings
    pub fn set_base_url(&mut self, base_url: impl Into<String>) {
        let base_url = base_url.into();
        match self.rest {
            Some(ref mut rest) => rest.base_url = base_url,
            None => self.rest = Some(RestAdapterConfig::new(base_url)),
        }
    }

    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Directory holding the persisted session
    pub fn session_dir(&self) -> Result<PathBuf> {
        if let Some(ref dir) = self.session_dir {
            return Ok(dir.clone());
        }
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }
}
