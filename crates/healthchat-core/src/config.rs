use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use anyhow::{Result, anyhow};

use crate::engine::{EngineSettings, DEFAULT_FETCH_TIMEOUT};
use crate::reveal::DEFAULT_REVEAL_DELAY;

pub const DEFAULT_REPLY_ENDPOINT: &str = "http://127.0.0.1:8000/ask-ai";
pub const DEFAULT_PREDICT_ENDPOINT: &str = "http://127.0.0.1:8000/predict";

pub const REPLY_URL_ENV: &str = "HEALTHCHAT_REPLY_URL";
pub const PREDICT_URL_ENV: &str = "HEALTHCHAT_PREDICT_URL";

/// Values to persist; `None` leaves the stored setting alone
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigUpdate {
    pub reply_endpoint: Option<String>,
    pub predict_endpoint: Option<String>,
    pub reveal_delay_ms: Option<u64>,
    pub fetch_timeout_secs: Option<u64>,
}

impl ConfigUpdate {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct Config {
    pub reply_endpoint: Option<String>,
    pub predict_endpoint: Option<String>,
    pub reveal_delay_ms: Option<u64>,
    pub fetch_timeout_secs: Option<u64>,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load() -> Result<Self> {
        Self::load_from(&Self::get_config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }

        let config_content = fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&config_content)?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::get_config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Create config directory if it doesn't exist
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let config_content = serde_json::to_string_pretty(self)?;
        fs::write(path, config_content)?;
        Ok(())
    }

    /// Merge the given settings; returns whether anything changed
    pub fn apply(&mut self, update: ConfigUpdate) -> bool {
        let before = self.clone();
        if update.reply_endpoint.is_some() {
            self.reply_endpoint = update.reply_endpoint;
        }
        if update.predict_endpoint.is_some() {
            self.predict_endpoint = update.predict_endpoint;
        }
        if update.reveal_delay_ms.is_some() {
            self.reveal_delay_ms = update.reveal_delay_ms;
        }
        if update.fetch_timeout_secs.is_some() {
            self.fetch_timeout_secs = update.fetch_timeout_secs;
        }
        *self != before
    }

    /// Reply endpoint: environment first, then the config file, then the default
    pub fn reply_endpoint(&self) -> String {
        std::env::var(REPLY_URL_ENV)
            .ok()
            .or_else(|| self.reply_endpoint.clone())
            .unwrap_or_else(|| DEFAULT_REPLY_ENDPOINT.to_string())
    }

    pub fn predict_endpoint(&self) -> String {
        std::env::var(PREDICT_URL_ENV)
            .ok()
            .or_else(|| self.predict_endpoint.clone())
            .unwrap_or_else(|| DEFAULT_PREDICT_ENDPOINT.to_string())
    }

    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            reveal_delay: self
                .reveal_delay_ms
                .map(Duration::from_millis)
                .unwrap_or(DEFAULT_REVEAL_DELAY),
            fetch_timeout: self
                .fetch_timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_FETCH_TIMEOUT),
        }
    }

    pub fn config_dir() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join("healthchat"))
    }

    pub fn get_config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.json"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let config = Config::load_from(&dir.path().join("config.json")).unwrap();

        assert_eq!(config, Config::new());
        assert_eq!(config.engine_settings(), EngineSettings::default());
    }

    #[test]
    fn test_save_then_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let config = Config {
            reply_endpoint: Some("http://example.test/ask-ai".to_string()),
            predict_endpoint: None,
            reveal_delay_ms: Some(20),
            fetch_timeout_secs: Some(3),
        };

        config.save_to(&path).unwrap();
        let loaded = Config::load_from(&path).unwrap();

        assert_eq!(loaded, config);
        let settings = loaded.engine_settings();
        assert_eq!(settings.reveal_delay, Duration::from_millis(20));
        assert_eq!(settings.fetch_timeout, Duration::from_secs(3));
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{ "fetch_timeout_secs": 5 }"#).unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.reveal_delay_ms, None);
        assert_eq!(config.engine_settings().reveal_delay, DEFAULT_REVEAL_DELAY);
        assert_eq!(config.engine_settings().fetch_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_invalid_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "not json").unwrap();

        assert!(Config::load_from(&path).is_err());
    }

    #[test]
    fn test_apply_update_then_persist() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        let mut config = Config {
            reply_endpoint: Some("http://old.test/ask-ai".to_string()),
            predict_endpoint: Some("http://old.test/predict".to_string()),
            reveal_delay_ms: None,
            fetch_timeout_secs: Some(10),
        };

        assert!(ConfigUpdate::default().is_empty());
        assert!(!config.apply(ConfigUpdate::default()));

        let changed = config.apply(ConfigUpdate {
            reply_endpoint: Some("http://new.test/ask-ai".to_string()),
            reveal_delay_ms: Some(15),
            ..ConfigUpdate::default()
        });
        assert!(changed);
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.reply_endpoint.as_deref(), Some("http://new.test/ask-ai"));
        assert_eq!(loaded.predict_endpoint.as_deref(), Some("http://old.test/predict"));
        assert_eq!(loaded.reveal_delay_ms, Some(15));
        assert_eq!(loaded.fetch_timeout_secs, Some(10));
    }
}
