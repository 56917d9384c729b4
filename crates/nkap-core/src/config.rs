//! Application configuration management.
//!
//! Configuration is stored at `~/.config/nkap/config.json`. The base URL can
//! be overridden with the `NKAP_BASE_URL` environment variable.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::api::client::{DEFAULT_BASE_URL, DEFAULT_REQUEST_TIMEOUT, DEFAULT_UPLOAD_TIMEOUT};
use crate::api::ClientConfig;
use crate::auth::credentials::DEFAULT_SERVICE_NAME;

/// Application name used for the config directory path
const APP_NAME: &str = "nkap";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Environment variable overriding the API base URL
pub const BASE_URL_ENV: &str = "NKAP_BASE_URL";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_timeout_secs: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upload_timeout_secs: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keyring_service: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_identifier: Option<String>,
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse {}", path.display()))
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Environment first, then the config file, then the built-in default.
    pub fn base_url(&self) -> String {
        std::env::var(BASE_URL_ENV)
            .ok()
            .filter(|url| !url.trim().is_empty())
            .or_else(|| self.base_url.clone())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
    }

    pub fn keyring_service(&self) -> &str {
        self.keyring_service.as_deref().unwrap_or(DEFAULT_SERVICE_NAME)
    }

    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            base_url: self.base_url(),
            request_timeout: self
                .request_timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_REQUEST_TIMEOUT),
            upload_timeout: self
                .upload_timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_UPLOAD_TIMEOUT),
        }
    }
}
