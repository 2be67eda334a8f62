//! Application configuration management.
//!
//! Holds the API base URL, where tokens are persisted, and the session
//! timing knobs. Configuration is stored at
//! `~/.config/petmatch/config.json`; `PETMATCH_API_URL` and
//! `PETMATCH_TOKEN_STORE` override the file.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::auth::{FileStore, KeyringStore, MemoryStore, TokenStore};

/// Application name used for config/cache directory paths
const APP_NAME: &str = "petmatch";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Token file name in the cache directory (file token store)
const TOKEN_FILE: &str = "tokens.json";

const DEFAULT_API_URL: &str = "http://localhost:8000/api";

/// Access tokens live for one hour; refreshing every 50 minutes keeps
/// an idle session from expiring.
const DEFAULT_REFRESH_INTERVAL_SECS: u64 = 50 * 60;

/// HTTP request timeout in seconds.
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

pub const API_URL_ENV: &str = "PETMATCH_API_URL";
pub const TOKEN_STORE_ENV: &str = "PETMATCH_TOKEN_STORE";

/// Where access and refresh tokens are persisted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenBackend {
    /// OS keychain
    Keyring,
    /// JSON file in the cache directory
    #[default]
    File,
    /// Not persisted
    Memory,
}

impl FromStr for TokenBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "keyring" => Ok(TokenBackend::Keyring),
            "file" => Ok(TokenBackend::File),
            "memory" => Ok(TokenBackend::Memory),
            other => Err(anyhow::anyhow!(
                "Unknown token store '{}' (expected keyring, file or memory)",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_url: String,
    pub token_store: TokenBackend,
    pub refresh_interval_secs: u64,
    pub request_timeout_secs: u64,
    pub last_email: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            token_store: TokenBackend::default(),
            refresh_interval_secs: DEFAULT_REFRESH_INTERVAL_SECS,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            last_email: None,
        }
    }
}

impl Config {
    /// Load from the default location and apply environment overrides
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from(&Self::config_path()?)?;
        config.apply_env_overrides()?;
        Ok(config)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))
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

    pub fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_overrides(
            std::env::var(API_URL_ENV).ok(),
            std::env::var(TOKEN_STORE_ENV).ok(),
        )
    }

    pub fn apply_overrides(&mut self, api_url: Option<String>, token_store: Option<String>) -> Result<()> {
        if let Some(url) = api_url.filter(|u| !u.trim().is_empty()) {
            self.api_url = url.trim().to_string();
        }
        if let Some(store) = token_store.filter(|s| !s.trim().is_empty()) {
            self.token_store = store.parse()?;
        }
        Ok(())
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs.max(1))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    /// Open the configured token storage backend
    pub fn open_token_store(&self) -> Result<TokenStore> {
        let store = match self.token_store {
            TokenBackend::Keyring => TokenStore::new(Arc::new(KeyringStore::new())),
            TokenBackend::File => {
                TokenStore::new(Arc::new(FileStore::new(Self::cache_dir()?.join(TOKEN_FILE))))
            }
            TokenBackend::Memory => TokenStore::new(Arc::new(MemoryStore::new())),
        };
        Ok(store)
    }

    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    pub fn cache_dir() -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }
}
