//! `config.json` settings.

use crate::catalog::{DEFAULT_BASE_URL, DEFAULT_FALLBACK_STORE};
use crate::error::{Error, Result};
use crate::sync::{DEFAULT_POLL_INTERVAL, DEFAULT_RETRY_DELAY};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Default URL probed to decide whether the network is up.
pub const DEFAULT_PROBE_URL: &str = "https://clients3.google.com/generate_204";

/// All settings, every field optional in the file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub catalog: CatalogSettings,
    pub sync: SyncSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogSettings {
    pub base_url: String,
    pub client_id: String,
    pub client_secret: String,
    pub fallback_store: String,
}

impl Default for CatalogSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            client_id: String::new(),
            client_secret: String::new(),
            fallback_store: DEFAULT_FALLBACK_STORE.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncSettings {
    pub retry_delay_secs: u64,
    pub poll_interval_secs: u64,
    pub probe_url: String,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            retry_delay_secs: DEFAULT_RETRY_DELAY.as_secs(),
            poll_interval_secs: DEFAULT_POLL_INTERVAL.as_secs(),
            probe_url: DEFAULT_PROBE_URL.to_string(),
        }
    }
}

impl SyncSettings {
    #[must_use]
    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_secs.max(1))
    }

    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs.max(1))
    }
}

impl AppConfig {
    /// Apply `CHOMP_CLIENT_ID` / `CHOMP_CLIENT_SECRET` overrides.
    fn apply_env(&mut self) {
        if let Ok(id) = std::env::var("CHOMP_CLIENT_ID") {
            if !id.trim().is_empty() {
                self.catalog.client_id = id;
            }
        }
        if let Ok(secret) = std::env::var("CHOMP_CLIENT_SECRET") {
            if !secret.trim().is_empty() {
                self.catalog.client_secret = secret;
            }
        }
    }
}

/// Load `~/.cheapchomp/config.json` with environment overrides.
///
/// A missing file yields defaults.
///
/// # Errors
///
/// Returns `Config` if the file cannot be read or parsed.
pub fn load_config() -> Result<AppConfig> {
    load_config_from(&super::config_path()?)
}

/// Load settings from a specific file with environment overrides.
///
/// # Errors
///
/// Returns `Config` if the file cannot be read or parsed.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let mut config = if path.exists() {
        let content = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read config file: {e}")))?;
        serde_json::from_str(&content)
            .map_err(|e| Error::Config(format!("Failed to parse config file: {e}")))?
    } else {
        AppConfig::default()
    };
    config.apply_env();
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let config = load_config_from(&dir.path().join("config.json")).unwrap();
        assert_eq!(config.catalog.fallback_store, DEFAULT_FALLBACK_STORE);
        assert_eq!(config.sync.retry_delay(), DEFAULT_RETRY_DELAY);
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"sync":{"retry_delay_secs":5},"catalog":{"fallback_store":"123"}}"#).unwrap();

        let config = load_config_from(&path).unwrap();
        assert_eq!(config.sync.retry_delay(), Duration::from_secs(5));
        assert_eq!(config.sync.probe_url, DEFAULT_PROBE_URL);
        assert_eq!(config.catalog.fallback_store, "123");
        assert_eq!(config.catalog.base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn test_invalid_file_is_config_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{not json").unwrap();
        assert!(matches!(load_config_from(&path), Err(Error::Config(_))));
    }
}
