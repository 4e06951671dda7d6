// Configuration management for the pushsync CLI
//
// Cross-platform config stored in:
// - macOS: ~/Library/Application Support/pushsync/config.json
// - Linux: ~/.config/pushsync/config.json
// - Windows: %APPDATA%\pushsync\config.json

use anyhow::{Context, Result};
use pushsync_core::ClientConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Backend base URL, e.g. https://quiz.example.com
    pub api_base_url: String,

    /// Bearer token used for authorized endpoints
    pub token: Option<String>,

    /// Request timeout in seconds
    pub request_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:3000".to_string(),
            token: None,
            request_timeout_secs: ClientConfig::default().request_timeout_secs,
        }
    }
}

impl Config {
    /// Get the config directory path (cross-platform)
    pub fn config_dir() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to determine config directory")?
            .join("pushsync");

        std::fs::create_dir_all(&config_dir).context("Failed to create config directory")?;

        Ok(config_dir)
    }

    /// Get the config file path
    pub fn config_file() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.json"))
    }

    /// Load config from the default location
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_file()?)
    }

    /// Load config from `path`, or create the default file if missing
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path).context("Failed to read config file")?;
            let config: Config =
                serde_json::from_str(&contents).context("Failed to parse config file")?;
            Ok(config)
        } else {
            let config = Config::default();
            config.save_to(path)?;
            Ok(config)
        }
    }

    /// Save config to the default location
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_file()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        let contents = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, contents).context("Failed to write config file")?;
        Ok(())
    }

    /// Set a config value
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "api_base_url" => {
                self.api_base_url = value.trim_end_matches('/').to_string();
            }
            "token" => {
                self.token = if value.is_empty() {
                    None
                } else {
                    Some(value.to_string())
                };
            }
            "request_timeout_secs" => {
                self.request_timeout_secs = value.parse().context("Invalid number")?;
            }
            _ => anyhow::bail!("Unknown config key: {}", key),
        }
        Ok(())
    }

    /// Get a config value. The token is masked.
    pub fn get(&self, key: &str) -> Option<String> {
        match key {
            "api_base_url" => Some(self.api_base_url.clone()),
            "token" => self.token.as_ref().map(|_| "********".to_string()),
            "request_timeout_secs" => Some(self.request_timeout_secs.to_string()),
            _ => None,
        }
    }

    /// List all config values
    pub fn list(&self) -> Vec<(String, String)> {
        ["api_base_url", "token", "request_timeout_secs"]
            .iter()
            .map(|key| {
                (
                    key.to_string(),
                    self.get(key).unwrap_or_else(|| "(not set)".to_string()),
                )
            })
            .collect()
    }

    /// Client settings for the server bridge
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            api_base_url: self.api_base_url.clone(),
            request_timeout_secs: self.request_timeout_secs,
            ..ClientConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_load_creates_default_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config, Config::default());
        assert!(path.exists());
    }

    #[test]
    fn test_set_and_reload() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");

        let mut config = Config::load_from(&path).unwrap();
        config.set("api_base_url", "https://quiz.example.com/").unwrap();
        config.set("token", "secret").unwrap();
        config.set("request_timeout_secs", "5").unwrap();
        config.save_to(&path).unwrap();

        let reloaded = Config::load_from(&path).unwrap();
        assert_eq!(reloaded.api_base_url, "https://quiz.example.com");
        assert_eq!(reloaded.token.as_deref(), Some("secret"));
        assert_eq!(reloaded.client_config().request_timeout_secs, 5);
    }

    #[test]
    fn test_token_is_masked_and_clearable() {
        let mut config = Config::default();
        assert_eq!(config.get("token"), None);
        config.set("token", "secret").unwrap();
        assert_eq!(config.get("token").as_deref(), Some("********"));
        config.set("token", "").unwrap();
        assert!(config.token.is_none());
    }

    #[test]
    fn test_unknown_and_invalid_values_are_rejected() {
        let mut config = Config::default();
        assert!(config.set("listen_port", "1").is_err());
        assert!(config.set("request_timeout_secs", "soon").is_err());
        assert_eq!(config.get("listen_port"), None);
    }
}
