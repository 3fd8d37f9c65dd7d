use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::transport::http::DEFAULT_TIMEOUT;
use crate::validator::{Limits, DEFAULT_COOLDOWN, DEFAULT_MAX_MESSAGE_LENGTH};

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8000";
pub const API_BASE_URL_ENV: &str = "ALTER_EGO_API_BASE_URL";

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    pub api_base_url: Option<String>,
    pub max_message_length: Option<usize>,
    pub cooldown_ms: Option<u64>,
    pub request_timeout_secs: Option<u64>,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from the default location, falling back to defaults if absent.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }

        let config_content = fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&config_content)
            .map_err(|e| anyhow!("Invalid config file {:?}: {}", path, e))?;
        Ok(config)
    }

    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join("alter-ego").join("config.json"))
    }

    /// Backend base address: explicit override, then the environment, then
    /// this file, then the local development default.
    pub fn api_base_url(&self, override_url: Option<&str>) -> String {
        let from_env = std::env::var(API_BASE_URL_ENV).ok();
        pick_base_url(override_url, from_env.as_deref(), self.api_base_url.as_deref())
    }

    pub fn limits(&self) -> Limits {
        Limits {
            max_message_length: self.max_message_length.unwrap_or(DEFAULT_MAX_MESSAGE_LENGTH),
            cooldown: self
                .cooldown_ms
                .map(Duration::from_millis)
                .unwrap_or(DEFAULT_COOLDOWN),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout_secs
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_TIMEOUT)
    }
}

// Empty strings count as unset
fn pick_base_url(override_url: Option<&str>, from_env: Option<&str>, from_file: Option<&str>) -> String {
    [override_url, from_env, from_file]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|url| !url.is_empty())
        .unwrap_or(DEFAULT_API_BASE_URL)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("config.json")).unwrap();
        assert_eq!(config, Config::new());
        assert_eq!(config.limits(), Limits::default());
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_load_partial_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"api_base_url": "http://chat.internal:9000", "cooldown_ms": 250}}"#).unwrap();

        let config = Config::load_from(file.path()).unwrap();
        assert_eq!(config.api_base_url.as_deref(), Some("http://chat.internal:9000"));
        assert_eq!(
            config.limits(),
            Limits {
                max_message_length: 5000,
                cooldown: Duration::from_millis(250),
            }
        );
    }

    #[test]
    fn test_invalid_file_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        assert!(Config::load_from(file.path()).is_err());
    }

    #[test]
    fn test_base_url_precedence() {
        assert_eq!(pick_base_url(None, None, None), DEFAULT_API_BASE_URL);
        assert_eq!(pick_base_url(None, None, Some("http://file")), "http://file");
        assert_eq!(pick_base_url(None, Some("http://env"), Some("http://file")), "http://env");
        assert_eq!(
            pick_base_url(Some("http://flag"), Some("http://env"), Some("http://file")),
            "http://flag"
        );
    }

    #[test]
    fn test_empty_base_url_counts_as_unset() {
        assert_eq!(pick_base_url(Some(""), Some("  "), None), DEFAULT_API_BASE_URL);
    }
}
