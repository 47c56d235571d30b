//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! All variables are optional.
//!
//! - `CATALOG_BASE_URL` - Catalog API root (default: <https://fakestoreapi.com>)
//! - `CATALOG_CACHE_TTL_SECS` - How long catalog responses are reused (default: 300)
//! - `CATALOG_CACHE_CAPACITY` - Maximum cached catalog responses (default: 1000)
//! - `CATALOG_REQUEST_TIMEOUT_SECS` - Per-request timeout (default: 10)
//! - `SHOPFLOW_STORAGE_DIR` - Directory for durable storage (default: in-memory)
//! - `SHOPFLOW_STORAGE_QUOTA_BYTES` - Storage quota (default: 5242880)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `RUST_LOG` - Log filter (read by [`crate::telemetry`])

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;
use url::Url;

use crate::storage::DEFAULT_QUOTA_BYTES;

/// Public catalog the storefront was built against.
pub const DEFAULT_CATALOG_URL: &str = "https://fakestoreapi.com";

const DEFAULT_CACHE_TTL_SECS: u64 = 300;
const DEFAULT_CACHE_CAPACITY: u64 = 1000;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Storefront application configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// Catalog API configuration
    pub catalog: CatalogConfig,
    /// Durable storage configuration
    pub storage: StorageConfig,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment (e.g., "production")
    pub sentry_environment: Option<String>,
}

/// Catalog API configuration.
#[derive(Debug, Clone)]
pub struct CatalogConfig {
    /// API root; requests go to `{base_url}/products/...`
    pub base_url: Url,
    /// Time-to-live for cached responses
    pub cache_ttl: Duration,
    /// Maximum number of cached responses
    pub cache_capacity: u64,
    /// Timeout for a single request
    pub request_timeout: Duration,
}

/// Durable storage configuration.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Directory for file-backed storage; `None` keeps state in memory
    pub dir: Option<PathBuf>,
    /// Quota in bytes
    pub quota_bytes: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            dir: None,
            quota_bytes: DEFAULT_QUOTA_BYTES,
        }
    }
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set to an invalid value.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Ok(Self {
            catalog: CatalogConfig::from_env()?,
            storage: StorageConfig::from_env()?,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
        })
    }
}

impl CatalogConfig {
    /// Configuration for `base_url` with default cache and timeout settings.
    #[must_use]
    pub const fn with_base_url(base_url: Url) -> Self {
        Self {
            base_url,
            cache_ttl: Duration::from_secs(DEFAULT_CACHE_TTL_SECS),
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }

    fn from_env() -> Result<Self, ConfigError> {
        let base_url = parse_base_url(
            "CATALOG_BASE_URL",
            &get_env_or_default("CATALOG_BASE_URL", DEFAULT_CATALOG_URL),
        )?;

        Ok(Self {
            base_url,
            cache_ttl: Duration::from_secs(parse_env(
                "CATALOG_CACHE_TTL_SECS",
                DEFAULT_CACHE_TTL_SECS,
            )?),
            cache_capacity: parse_env("CATALOG_CACHE_CAPACITY", DEFAULT_CACHE_CAPACITY)?,
            request_timeout: Duration::from_secs(parse_env(
                "CATALOG_REQUEST_TIMEOUT_SECS",
                DEFAULT_REQUEST_TIMEOUT_SECS,
            )?),
        })
    }
}

impl StorageConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            dir: get_optional_env("SHOPFLOW_STORAGE_DIR").map(PathBuf::from),
            quota_bytes: parse_env("SHOPFLOW_STORAGE_QUOTA_BYTES", DEFAULT_QUOTA_BYTES)?,
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get an optional environment variable, treating empty values as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    get_optional_env(key).unwrap_or_else(|| default.to_string())
}

/// Parse an environment variable, falling back to `default` when unset.
fn parse_env<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    get_optional_env(key).map_or(Ok(default), |raw| parse_value(key, &raw))
}

fn parse_value<T>(key: &str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Parse a catalog root URL. Only http(s) URLs that can take path segments qualify.
fn parse_base_url(key: &str, raw: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(raw.trim())
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?;

    if !matches!(url.scheme(), "http" | "https") || url.cannot_be_a_base() {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            format!("expected an http(s) URL, got '{raw}'"),
        ));
    }
    Ok(url)
}
