//! Application configuration management.
//!
//! The configuration names the document store, the places-service key and
//! an optional places base URL. It is stored at
//! `~/.config/californication/config.json`; environment variables override
//! individual fields.

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};

use crate::api::client::DEFAULT_PLACES_BASE_URL;
use crate::api::{ApiClient, ApiError};
use crate::cache::image::IMAGE_CACHE_DIR;

/// Application name used for config/cache directory paths
const APP_NAME: &str = "californication";

/// Config file name
const CONFIG_FILE: &str = "config.json";

pub const ENV_DATABASE_URL: &str = "CALIFORNICATION_DATABASE_URL";
pub const ENV_DATABASE_AUTH: &str = "CALIFORNICATION_DATABASE_AUTH";
pub const ENV_PLACES_API_KEY: &str = "GOOGLE_PLACES_API_KEY";
pub const ENV_PLACES_BASE_URL: &str = "CALIFORNICATION_PLACES_BASE_URL";

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    pub database_url: Option<String>,
    pub database_auth: Option<String>,
    pub places_api_key: Option<String>,
    pub places_base_url: Option<String>,
}

impl Config {
    /// Load the config file (if any) and apply environment overrides.
    pub fn load() -> Result<Self> {
        let mut config = Self::load_file()?;
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    fn load_file() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Read a config file; a missing file yields the defaults.
    fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Replace fields with non-empty values returned by `lookup`.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        if let Some(v) = get(ENV_DATABASE_URL) {
            self.database_url = Some(v);
        }
        if let Some(v) = get(ENV_DATABASE_AUTH) {
            self.database_auth = Some(v);
        }
        if let Some(v) = get(ENV_PLACES_API_KEY) {
            self.places_api_key = Some(v);
        }
        if let Some(v) = get(ENV_PLACES_BASE_URL) {
            self.places_base_url = Some(v);
        }
    }

    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    pub fn cache_dir(&self) -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }

    pub fn image_cache_dir(&self) -> Result<PathBuf> {
        Ok(self.cache_dir()?.join(IMAGE_CACHE_DIR))
    }

    /// Build the HTTP client for both sources. Fails when the document
    /// store URL or the places key is missing.
    pub fn api_client(&self) -> Result<ApiClient> {
        let database_url = self.database_url.as_deref().ok_or_else(|| {
            anyhow!("No document store URL configured (set {})", ENV_DATABASE_URL)
        })?;
        let api_key = self.places_api_key.as_deref().ok_or_else(|| {
            anyhow!("No places API key configured (set {})", ENV_PLACES_API_KEY)
        })?;

        let client = ApiClient::new(database_url, api_key)
            .map_err(|e: ApiError| anyhow!("Failed to create HTTP client: {}", e))?
            .with_database_auth(self.database_auth.clone())
            .with_places_base_url(
                self.places_base_url.as_deref().unwrap_or(DEFAULT_PLACES_BASE_URL),
            );
        Ok(client)
    }

    /// HTTP client for image downloads only; needs no credentials.
    pub fn image_client(&self) -> Result<ApiClient> {
        ApiClient::new("", "").map_err(|e| anyhow!("Failed to create HTTP client: {}", e))
    }
}
