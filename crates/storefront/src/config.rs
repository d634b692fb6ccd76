//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `CATALOG_API_URL` - Base URL of the remote catalog API
//!
//! ## Optional
//! - `STOREFRONT_HOST` - Bind address (default: 127.0.0.1)
//! - `STOREFRONT_PORT` - Listen port (default: 3000)
//! - `STOREFRONT_BASE_URL` - Public URL, decides secure cookies (default: `http://localhost:3000`)
//! - `STOREFRONT_DATA_DIR` - Directory for cart and order slots (default: ./data)
//! - `CART_IDLE_SECS` - Idle time before a cart leaves memory (default: 1800)
//! - `CATALOG_API_TOKEN` - Bearer token for the catalog API
//! - `CATALOG_TIMEOUT_MS` - Catalog request timeout (default: 10000)
//! - `SEARCH_TOP_CATEGORIES` - Categories pulled into the search index (default: 10)
//! - `SEARCH_PAGE_SIZE` - Products fetched per category (default: 30)
//! - `SEARCH_RESULT_LIMIT` - Maximum results per query (default: 8)
//! - `SEARCH_CATEGORY_TIMEOUT_MS` - Per-category fetch timeout (default: 5000)
//! - `SEARCH_INDEX_TTL_SECS` - Product index lifetime (default: 1800)
//! - `SEARCH_CACHE_TTL_SECS` - Query result lifetime (default: 300)
//! - `SEARCH_CACHE_CAPACITY` - Distinct cached queries (default: 20)
//! - `SEARCH_POLL_INTERVAL_MS` - Wait between checks on a running build (default: 500)
//! - `SEARCH_POLL_RETRIES` - Checks before giving up on a running build (default: 10)
//! - `SEARCH_DEBOUNCE_MS` - Debounce window for keystroke searches (default: 150)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;
use url::Url;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Storefront application configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL for the storefront
    pub base_url: String,
    /// Directory holding cart and order slots
    pub data_dir: PathBuf,
    /// Idle time before an in-memory cart is dropped and reloaded on demand
    pub cart_idle: Duration,
    /// Catalog API configuration
    pub catalog: CatalogConfig,
    /// Search index tuning
    pub search: SearchConfig,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
}

/// Remote catalog API configuration.
///
/// Implements `Debug` manually to redact the access token.
#[derive(Clone)]
pub struct CatalogConfig {
    /// Base URL, e.g. `https://www.outletexpense.xyz/api/public`
    pub base_url: Url,
    /// Optional bearer token
    pub api_token: Option<SecretString>,
    /// Timeout applied to every catalog request
    pub timeout: Duration,
}

impl std::fmt::Debug for CatalogConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogConfig")
            .field("base_url", &self.base_url.as_str())
            .field(
                "api_token",
                &self.api_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Search index and result cache tuning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchConfig {
    /// Number of largest categories pulled into the index
    pub top_categories: usize,
    /// Products requested from each category
    pub page_size: u32,
    /// Maximum results returned for a query
    pub result_limit: usize,
    /// Timeout for each category fetch during a build
    pub category_timeout: Duration,
    /// How long a built index stays fresh
    pub index_ttl: Duration,
    /// How long a cached query result stays fresh
    pub cache_ttl: Duration,
    /// Maximum number of distinct cached queries
    pub cache_capacity: usize,
    /// Wait between checks while another build is running
    pub poll_interval: Duration,
    /// Checks before giving up on a running build
    pub poll_retries: u32,
    /// Debounce window for keystroke searches
    pub debounce: Duration,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            top_categories: 10,
            page_size: 30,
            result_limit: 8,
            category_timeout: Duration::from_millis(5000),
            index_ttl: Duration::from_secs(30 * 60),
            cache_ttl: Duration::from_secs(5 * 60),
            cache_capacity: 20,
            poll_interval: Duration::from_millis(500),
            poll_retries: 10,
            debounce: Duration::from_millis(150),
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
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let host = parse_env_or("STOREFRONT_HOST", "127.0.0.1".parse::<IpAddr>().ok())?;
        let port = parse_env_or("STOREFRONT_PORT", Some(3000u16))?;
        let base_url = get_env_or_default("STOREFRONT_BASE_URL", "http://localhost:3000");
        let data_dir = PathBuf::from(get_env_or_default("STOREFRONT_DATA_DIR", "./data"));
        let cart_idle = Duration::from_secs(parse_env_or("CART_IDLE_SECS", Some(1800))?);

        let catalog = CatalogConfig::from_env()?;
        let search = SearchConfig::from_env()?;
        let sentry_dsn = get_optional_env("SENTRY_DSN");
        let sentry_environment = get_optional_env("SENTRY_ENVIRONMENT");

        Ok(Self {
            host,
            port,
            base_url,
            data_dir,
            cart_idle,
            catalog,
            search,
            sentry_dsn,
            sentry_environment,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether cookies should be marked `Secure`.
    #[must_use]
    pub fn is_secure(&self) -> bool {
        self.base_url.starts_with("https://")
    }
}

impl CatalogConfig {
    /// Load catalog settings from environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if `CATALOG_API_URL` is missing or not a URL.
    pub fn from_env() -> Result<Self, ConfigError> {
        let raw = get_required_env("CATALOG_API_URL")?;
        let base_url = parse_base_url(&raw)
            .map_err(|e| ConfigError::InvalidEnvVar("CATALOG_API_URL".to_string(), e))?;

        Ok(Self {
            base_url,
            api_token: get_optional_env("CATALOG_API_TOKEN").map(SecretString::from),
            timeout: Duration::from_millis(parse_env_or("CATALOG_TIMEOUT_MS", Some(10_000))?),
        })
    }
}

impl SearchConfig {
    /// Load search settings from `SEARCH_*` variables, falling back to the
    /// defaults.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidEnvVar` for unparsable or zero values.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let config = Self {
            top_categories: parse_env_or("SEARCH_TOP_CATEGORIES", Some(defaults.top_categories))?,
            page_size: parse_env_or("SEARCH_PAGE_SIZE", Some(defaults.page_size))?,
            result_limit: parse_env_or("SEARCH_RESULT_LIMIT", Some(defaults.result_limit))?,
            category_timeout: Duration::from_millis(parse_env_or(
                "SEARCH_CATEGORY_TIMEOUT_MS",
                Some(5000),
            )?),
            index_ttl: Duration::from_secs(parse_env_or("SEARCH_INDEX_TTL_SECS", Some(1800))?),
            cache_ttl: Duration::from_secs(parse_env_or("SEARCH_CACHE_TTL_SECS", Some(300))?),
            cache_capacity: parse_env_or("SEARCH_CACHE_CAPACITY", Some(defaults.cache_capacity))?,
            poll_interval: Duration::from_millis(parse_env_or(
                "SEARCH_POLL_INTERVAL_MS",
                Some(500),
            )?),
            poll_retries: parse_env_or("SEARCH_POLL_RETRIES", Some(defaults.poll_retries))?,
            debounce: Duration::from_millis(parse_env_or("SEARCH_DEBOUNCE_MS", Some(150))?),
        };

        config.validate()?;
        Ok(config)
    }

    /// Reject settings that would make the index useless.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidEnvVar` naming the offending setting.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let checks = [
            ("SEARCH_TOP_CATEGORIES", self.top_categories == 0),
            ("SEARCH_PAGE_SIZE", self.page_size == 0),
            ("SEARCH_RESULT_LIMIT", self.result_limit == 0),
            ("SEARCH_CACHE_CAPACITY", self.cache_capacity == 0),
        ];

        for (key, is_zero) in checks {
            if is_zero {
                return Err(ConfigError::InvalidEnvVar(
                    key.to_string(),
                    "must be greater than zero".to_string(),
                ));
            }
        }
        Ok(())
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Parse the catalog base URL, making sure it ends with `/` so relative
/// endpoint paths join underneath it instead of replacing the last segment.
fn parse_base_url(raw: &str) -> Result<Url, String> {
    let trimmed = raw.trim();
    let with_slash = if trimmed.ends_with('/') {
        trimmed.to_string()
    } else {
        format!("{trimmed}/")
    };
    let url = Url::parse(&with_slash).map_err(|e| e.to_string())?;
    if url.cannot_be_a_base() {
        return Err("URL cannot be used as a base".to_string());
    }
    Ok(url)
}

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an optional environment variable, treating empty values as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse an environment variable, falling back to `default` when unset.
fn parse_env_or<T>(key: &str, default: Option<T>) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match get_optional_env(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string())),
        None => default.ok_or_else(|| ConfigError::MissingEnvVar(key.to_string())),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_base_url_appends_slash() {
        let url = parse_base_url("https://api.example.com/public").unwrap();
        assert_eq!(url.as_str(), "https://api.example.com/public/");
        assert_eq!(
            url.join("categories").unwrap().as_str(),
            "https://api.example.com/public/categories"
        );
    }

    #[test]
    fn test_parse_base_url_rejects_garbage() {
        assert!(parse_base_url("not a url").is_err());
        assert!(parse_base_url("mailto:shop@example.com").is_err());
    }

    #[test]
    fn test_search_defaults() {
        let config = SearchConfig::default();
        assert_eq!(config.top_categories, 10);
        assert_eq!(config.result_limit, 8);
        assert_eq!(config.cache_capacity, 20);
        assert_eq!(config.index_ttl, Duration::from_secs(1800));
        assert_eq!(config.cache_ttl, Duration::from_secs(300));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_search_validate_rejects_zero() {
        let config = SearchConfig {
            result_limit: 0,
            ..SearchConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(key, _) if key == "SEARCH_RESULT_LIMIT"));
    }

    #[test]
    fn test_socket_addr() {
        let config = StorefrontConfig {
            host: "127.0.0.1".parse().unwrap(),
            port: 3000,
            base_url: "https://shop.example.com".to_string(),
            data_dir: PathBuf::from("./data"),
            cart_idle: Duration::from_secs(1800),
            catalog: CatalogConfig {
                base_url: parse_base_url("https://api.example.com").unwrap(),
                api_token: None,
                timeout: Duration::from_secs(10),
            },
            search: SearchConfig::default(),
            sentry_dsn: None,
            sentry_environment: None,
        };

        let addr = config.socket_addr();
        assert_eq!(addr.ip().to_string(), "127.0.0.1");
        assert_eq!(addr.port(), 3000);
        assert!(config.is_secure());
    }

    #[test]
    fn test_catalog_config_debug_redacts_token() {
        let config = CatalogConfig {
            base_url: parse_base_url("https://api.example.com").unwrap(),
            api_token: Some(SecretString::from("super_secret_catalog_token")),
            timeout: Duration::from_secs(10),
        };

        let debug_output = format!("{config:?}");

        assert!(debug_output.contains("api.example.com"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("super_secret_catalog_token"));
    }
}
