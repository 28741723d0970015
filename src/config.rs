//! Application configuration management.
//!
//! This module handles loading and saving the client configuration:
//! collaborator base URLs, per-resource staleness windows, and the
//! last used sign-in email.
//!
//! Configuration is stored at `~/.config/medicamp/config.json`; the
//! base URLs can be overridden with the `MEDICAMP_API_URL` and
//! `MEDICAMP_UPLOAD_URL` environment variables.

use std::path::PathBuf;

use anyhow::Result;
use chrono::Duration;
use serde::{Deserialize, Serialize};

/// Application name used for config/cache directory paths
const APP_NAME: &str = "medicamp";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Environment override for the REST API base URL
const API_URL_ENV: &str = "MEDICAMP_API_URL";

/// Environment override for the upload proxy base URL
const UPLOAD_URL_ENV: &str = "MEDICAMP_UPLOAD_URL";

const DEFAULT_API_BASE_URL: &str = "https://api.medicamp.app";
const DEFAULT_UPLOAD_BASE_URL: &str = "https://medicamp.app";

/// Camp listings change slowly; registrations move while organizers
/// are confirming, so they go stale faster.
const DEFAULT_CAMPS_STALE_SECS: i64 = 60;
const DEFAULT_REGISTRATIONS_STALE_SECS: i64 = 30;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_base_url: String,
    pub upload_base_url: String,
    pub camps_stale_secs: i64,
    pub registrations_stale_secs: i64,
    pub last_email: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            upload_base_url: DEFAULT_UPLOAD_BASE_URL.to_string(),
            camps_stale_secs: DEFAULT_CAMPS_STALE_SECS,
            registrations_stale_secs: DEFAULT_REGISTRATIONS_STALE_SECS,
            last_email: None,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(&path)?;
            serde_json::from_str(&contents)?
        } else {
            Self::default()
        };
        config.apply_env_overrides();
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var(API_URL_ENV) {
            if !url.is_empty() {
                self.api_base_url = url;
            }
        }
        if let Ok(url) = std::env::var(UPLOAD_URL_ENV) {
            if !url.is_empty() {
                self.upload_base_url = url;
            }
        }
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Directory holding the session file.
    pub fn cache_dir(&self) -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }

    pub fn camps_staleness(&self) -> Duration {
        Duration::seconds(self.camps_stale_secs.max(0))
    }

    pub fn registrations_staleness(&self) -> Duration {
        Duration::seconds(self.registrations_stale_secs.max(0))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.api_base_url, DEFAULT_API_BASE_URL);
        assert_eq!(config.camps_stale_secs, 60);
        assert_eq!(config.registrations_stale_secs, 30);
        assert!(config.last_email.is_none());
    }

    #[test]
    fn test_staleness_durations() {
        let config = Config::default();
        assert_eq!(config.camps_staleness(), Duration::seconds(60));
        assert_eq!(config.registrations_staleness(), Duration::seconds(30));

        let mut negative = Config::default();
        negative.camps_stale_secs = -5;
        assert_eq!(negative.camps_staleness(), Duration::seconds(0));
    }

    #[test]
    fn test_env_override_applies() {
        std::env::set_var(API_URL_ENV, "http://localhost:5000");
        let mut config = Config::default();
        config.apply_env_overrides();
        std::env::remove_var(API_URL_ENV);

        assert_eq!(config.api_base_url, "http://localhost:5000");
        assert_eq!(config.upload_base_url, DEFAULT_UPLOAD_BASE_URL);
    }

    #[test]
    fn test_partial_config_file_fills_defaults() {
        let config: Config =
            serde_json::from_str(r#"{"api_base_url": "http://localhost:5000"}"#).unwrap();
        assert_eq!(config.api_base_url, "http://localhost:5000");
        assert_eq!(config.camps_stale_secs, 60);
    }
}
