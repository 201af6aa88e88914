//! Application configuration management.
//!
//! This module handles loading and saving the client configuration: the API
//! base URL, the auth endpoint paths, the request timeout, the app routes
//! used by the redirect guard, and the last email used to sign in.
//!
//! Configuration is stored at `~/.config/ledgerly/config.json`. The
//! `LEDGERLY_API_URL` environment variable overrides the base URL.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Application name used for config directory paths
const APP_NAME: &str = "ledgerly";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Environment variable overriding `api_base_url`
pub const API_URL_ENV: &str = "LEDGERLY_API_URL";

/// HTTP request timeout in seconds.
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_base_url: String,
    pub endpoints: Endpoints,
    pub request_timeout_secs: u64,
    pub sign_in_route: String,
    pub sign_up_route: String,
    pub last_email: Option<String>,
}

/// Paths of the four auth endpoints, relative to `api_base_url`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Endpoints {
    pub login: String,
    pub register: String,
    pub refresh: String,
    pub logout: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            login: "/auth/login".to_string(),
            register: "/auth/register".to_string(),
            refresh: "/auth/refresh".to_string(),
            logout: "/auth/logout".to_string(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:5000/api".to_string(),
            endpoints: Endpoints::default(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            sign_in_route: "/login".to_string(),
            sign_up_route: "/register".to_string(),
            last_email: None,
        }
    }
}

impl Config {
    /// Load from the config file (defaults when absent), then apply
    /// environment overrides.
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            Self::from_json(&contents)?
        } else {
            Self::default()
        };
        Ok(config.with_env_overrides())
    }

    pub fn from_json(contents: &str) -> Result<Self> {
        serde_json::from_str(contents).context("Failed to parse config file")
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

    /// Apply `LEDGERLY_API_URL`. `load()` already does this; use it when
    /// falling back to `Config::default()`.
    pub fn with_env_overrides(mut self) -> Self {
        self.override_api_url(std::env::var(API_URL_ENV).ok());
        self
    }

    fn override_api_url(&mut self, url: Option<String>) {
        if let Some(url) = url {
            if !url.trim().is_empty() {
                self.api_base_url = url.trim().to_string();
            }
        }
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_fills_defaults() {
        let config = Config::from_json(r#"{"api_base_url":"https://books.example.com/api","endpoints":{"refresh":"/session/refresh"}}"#)
            .expect("Failed to parse config");
        assert_eq!(config.api_base_url, "https://books.example.com/api");
        assert_eq!(config.endpoints.refresh, "/session/refresh");
        assert_eq!(config.endpoints.login, "/auth/login");
        assert_eq!(config.request_timeout_secs, DEFAULT_REQUEST_TIMEOUT_SECS);
        assert_eq!(config.sign_in_route, "/login");
    }

    #[test]
    fn test_zero_timeout_is_clamped() {
        let config = Config {
            request_timeout_secs: 0,
            ..Config::default()
        };
        assert_eq!(config.request_timeout(), Duration::from_secs(1));
    }

    #[test]
    fn test_api_url_override() {
        let mut config = Config::default();
        config.override_api_url(Some("  ".to_string()));
        assert_eq!(config.api_base_url, Config::default().api_base_url);

        config.override_api_url(Some(" https://staging.example.com/api ".to_string()));
        assert_eq!(config.api_base_url, "https://staging.example.com/api");

        config.override_api_url(None);
        assert_eq!(config.api_base_url, "https://staging.example.com/api");
    }

    #[test]
    fn test_default_config_picks_up_env_override() {
        std::env::set_var(API_URL_ENV, "https://env.example.com/api");
        let config = Config::default().with_env_overrides();
        std::env::remove_var(API_URL_ENV);
        assert_eq!(config.api_base_url, "https://env.example.com/api");
    }

    #[test]
    fn test_invalid_json_is_an_error() {
        assert!(Config::from_json("{not json").is_err());
    }
}
