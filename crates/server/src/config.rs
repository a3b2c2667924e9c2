//! Server configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `SUPABASE_URL` - Supabase project URL (e.g., `https://abc.supabase.co`)
//! - `SUPABASE_SERVICE_ROLE_KEY` - Service-role key used for storage access
//!
//! ## Optional
//! - `CATALOG_HOST` - Bind address (default: 127.0.0.1)
//! - `CATALOG_PORT` - Listen port (default: 3000)
//! - `CATALOG_BASE_PATH` - Path prefix for the API routes (default: /api)
//! - `CATALOG_DATABASE_URL` - `PostgreSQL` connection string (falls back to
//!   `DATABASE_URL`; without either, an in-memory store is used)
//! - `FABRIC_SYNC_ON_STARTUP` - Run one storage sync at boot (default: false)
//! - `CORS_ALLOW_ORIGIN` - Allowed CORS origin (default: *)
//! - `LOG_FORMAT` - `json` for structured logs, anything else for text
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_SAMPLE_RATE` - Error sample rate (default: 1.0)
//! - `SENTRY_TRACES_SAMPLE_RATE` - Traces sample rate (default: 0.1)

use std::net::{IpAddr, SocketAddr};

use secrecy::SecretString;
use thiserror::Error;
use url::Url;

/// Prefix of Supabase secret API keys.
const SECRET_KEY_PREFIX: &str = "sb_secret_";

/// Prefix of Supabase publishable keys, which cannot list storage buckets.
const PUBLISHABLE_KEY_PREFIX: &str = "sb_publishable_";

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Catalog server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// HTTP listener and routing settings
    pub http: HttpConfig,
    /// `PostgreSQL` connection URL; `None` selects the in-memory store
    pub database_url: Option<SecretString>,
    /// Supabase Storage access
    pub supabase: SupabaseConfig,
    /// Spawn a storage sync when the server starts
    pub sync_on_startup: bool,
    /// Emit JSON logs instead of human-readable text
    pub log_json: bool,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment (e.g., "development", "production")
    pub sentry_environment: Option<String>,
    /// Sentry error sample rate (0.0 to 1.0)
    pub sentry_sample_rate: f32,
    /// Sentry traces sample rate for performance monitoring (0.0 to 1.0)
    pub sentry_traces_sample_rate: f32,
}

/// HTTP listener and routing settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Prefix for the API routes, without a trailing slash. Empty mounts at `/`.
    pub base_path: String,
    /// Value of `Access-Control-Allow-Origin`
    pub cors_allow_origin: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::from([127, 0, 0, 1]),
            port: 3000,
            base_path: "/api".to_string(),
            cors_allow_origin: "*".to_string(),
        }
    }
}

impl HttpConfig {
    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

/// Supabase project settings.
///
/// Implements `Debug` manually to redact the service-role key.
#[derive(Clone)]
pub struct SupabaseConfig {
    /// Project URL
    pub url: Url,
    /// Service-role key (full storage access)
    pub service_role_key: SecretString,
}

impl std::fmt::Debug for SupabaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SupabaseConfig")
            .field("url", &self.url.as_str())
            .field("service_role_key", &"[REDACTED]")
            .finish()
    }
}

impl ServerConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let http = HttpConfig::from_env()?;
        let database_url = get_database_url("CATALOG_DATABASE_URL")?;
        let supabase = SupabaseConfig::from_env()?;
        let sync_on_startup = parse_bool("FABRIC_SYNC_ON_STARTUP", false)?;
        let log_json = get_optional_env("LOG_FORMAT").is_some_and(|f| f.eq_ignore_ascii_case("json"));
        let sentry_dsn = get_optional_env("SENTRY_DSN");
        let sentry_environment = get_optional_env("SENTRY_ENVIRONMENT");
        let sentry_sample_rate = get_optional_env("SENTRY_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(1.0);
        let sentry_traces_sample_rate = get_optional_env("SENTRY_TRACES_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(0.1);

        Ok(Self {
            http,
            database_url,
            supabase,
            sync_on_startup,
            log_json,
            sentry_dsn,
            sentry_environment,
            sentry_sample_rate,
            sentry_traces_sample_rate,
        })
    }
}

impl HttpConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let host = get_env_or_default("CATALOG_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("CATALOG_HOST".to_string(), e.to_string()))?;
        let port = get_env_or_default("CATALOG_PORT", "3000")
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("CATALOG_PORT".to_string(), e.to_string()))?;
        let base_path = normalize_base_path(&get_env_or_default("CATALOG_BASE_PATH", "/api"))?;

        Ok(Self {
            host,
            port,
            base_path,
            cors_allow_origin: get_env_or_default("CORS_ALLOW_ORIGIN", "*"),
        })
    }
}

impl SupabaseConfig {
    /// Load `SUPABASE_URL` and `SUPABASE_SERVICE_ROLE_KEY`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if either is missing, the URL is not an
    /// `http(s)` URL, or the key is not a service-role or secret key.
    pub fn from_env() -> Result<Self, ConfigError> {
        let url = parse_project_url(&get_required_env("SUPABASE_URL")?)?;
        let key = get_required_env("SUPABASE_SERVICE_ROLE_KEY")?;
        validate_service_role_key(&key)?;

        Ok(Self {
            url,
            service_role_key: SecretString::from(key),
        })
    }
}

/// `PostgreSQL` URL from `CATALOG_DATABASE_URL`, falling back to `DATABASE_URL`.
///
/// Calls `dotenvy::dotenv()` to load from `.env` file if present.
///
/// # Errors
///
/// Returns `ConfigError::InvalidEnvVar` if the URL is not a `PostgreSQL` URL.
pub fn database_url_from_env() -> Result<Option<SecretString>, ConfigError> {
    let _ = dotenvy::dotenv();
    get_database_url("CATALOG_DATABASE_URL")
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get database URL with fallback to generic `DATABASE_URL`.
fn get_database_url(primary_key: &str) -> Result<Option<SecretString>, ConfigError> {
    let Some(url) = std::env::var(primary_key)
        .or_else(|_| std::env::var("DATABASE_URL"))
        .ok()
        .filter(|url| !url.is_empty())
    else {
        return Ok(None);
    };
    validate_database_url(&url, primary_key)?;
    Ok(Some(SecretString::from(url)))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse a boolean flag (`true/false/1/0`), falling back to `default` when unset.
fn parse_bool(key: &str, default: bool) -> Result<bool, ConfigError> {
    match get_optional_env(key) {
        None => Ok(default),
        Some(value) => match value.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" => Ok(true),
            "false" | "0" | "no" | "" => Ok(false),
            other => Err(ConfigError::InvalidEnvVar(
                key.to_string(),
                format!("expected true or false, got '{other}'"),
            )),
        },
    }
}

/// Ensure the base path starts with `/` and has no trailing slash.
fn normalize_base_path(raw: &str) -> Result<String, ConfigError> {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Ok(String::new());
    }
    if !trimmed.starts_with('/') {
        return Err(ConfigError::InvalidEnvVar(
            "CATALOG_BASE_PATH".to_string(),
            format!("must start with '/' (got '{raw}')"),
        ));
    }
    Ok(trimmed.to_string())
}

/// Only `postgres://` and `postgresql://` URLs are accepted. The URL itself
/// is never echoed back since it carries the password.
fn validate_database_url(url: &str, var_name: &str) -> Result<(), ConfigError> {
    let scheme = url.split_once("://").map(|(scheme, _)| scheme);
    if matches!(scheme, Some("postgres" | "postgresql")) {
        return Ok(());
    }
    Err(ConfigError::InvalidEnvVar(
        var_name.to_string(),
        "expected a postgres:// or postgresql:// URL".to_string(),
    ))
}

/// The project URL must be `http(s)` with a host; storage paths are appended
/// to it.
fn parse_project_url(raw: &str) -> Result<Url, ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidEnvVar("SUPABASE_URL".to_string(), reason);
    let url = Url::parse(raw.trim()).map_err(|e| invalid(e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return Err(invalid(format!("expected an http(s) project URL, got '{raw}'")));
    }
    Ok(url)
}

/// Storage listing needs elevated access: either a legacy service-role JWT
/// (`header.payload.signature`) or a `sb_secret_` key. Publishable keys are
/// rejected up front instead of failing on the first bucket listing.
fn validate_service_role_key(key: &str) -> Result<(), ConfigError> {
    let invalid = |reason: &str| {
        ConfigError::InvalidEnvVar("SUPABASE_SERVICE_ROLE_KEY".to_string(), reason.to_string())
    };

    if key.starts_with(PUBLISHABLE_KEY_PREFIX) {
        return Err(invalid("publishable keys cannot access storage; use the secret key"));
    }
    if let Some(rest) = key.strip_prefix(SECRET_KEY_PREFIX) {
        return if rest.is_empty() {
            Err(invalid("secret key is truncated"))
        } else {
            Ok(())
        };
    }

    let segments: Vec<&str> = key.split('.').collect();
    let is_jwt = segments.len() == 3
        && segments.iter().all(|segment| {
            !segment.is_empty()
                && segment
                    .bytes()
                    .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
        });
    if is_jwt {
        Ok(())
    } else {
        Err(invalid("expected a service-role JWT or an sb_secret_ key"))
    }
}
