//! Catalog client configuration.
//!
//! # Environment Variables
//!
//! ## Required
//! - `CATALOG_API_URL` - Base URL of the catalog API, including its base path
//!   (e.g., `https://catalog.example.nl/api`)
//!
//! ## Optional
//! - `CATALOG_API_KEY` - Sent as `Authorization: Bearer <key>`
//! - `CATALOG_CACHE_TTL_SECS` - Response cache lifetime (default: 300)
//! - `CATALOG_TIMEOUT_SECS` - Per-request timeout (default: none)

use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;
use url::Url;

use crate::cache::DEFAULT_TTL;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Catalog client configuration.
#[derive(Clone)]
pub struct ClientConfig {
    /// Base URL every route path is appended to
    pub base_url: Url,
    /// Bearer token for the API gateway
    pub api_key: Option<SecretString>,
    /// Lifetime of cached responses
    pub cache_ttl: Duration,
    /// Per-request timeout
    pub timeout: Option<Duration>,
}

impl ClientConfig {
    /// Configuration for `base_url` with default cache and no key.
    #[must_use]
    pub const fn new(base_url: Url) -> Self {
        Self {
            base_url,
            api_key: None,
            cache_ttl: DEFAULT_TTL,
            timeout: None,
        }
    }

    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the URL is missing or a value does not parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let raw_url = get_optional_env("CATALOG_API_URL")
            .ok_or_else(|| ConfigError::MissingEnvVar("CATALOG_API_URL".to_string()))?;
        let base_url = Url::parse(&raw_url)
            .map_err(|e| ConfigError::InvalidEnvVar("CATALOG_API_URL".to_string(), e.to_string()))?;

        Ok(Self {
            base_url,
            api_key: get_optional_env("CATALOG_API_KEY").map(SecretString::from),
            cache_ttl: parse_secs("CATALOG_CACHE_TTL_SECS")?.unwrap_or(DEFAULT_TTL),
            timeout: parse_secs("CATALOG_TIMEOUT_SECS")?,
        })
    }
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("base_url", &self.base_url.as_str())
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("cache_ttl", &self.cache_ttl)
            .field("timeout", &self.timeout)
            .finish()
    }
}

fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|s| !s.is_empty())
}

fn parse_secs(key: &str) -> Result<Option<Duration>, ConfigError> {
    get_optional_env(key)
        .map(|raw| {
            raw.parse::<u64>()
                .map(Duration::from_secs)
                .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
        })
        .transpose()
}
