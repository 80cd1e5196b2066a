//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `PRODUCT_API_URL` - Base URL of the product API (e.g., <http://localhost:4000>)
//!
//! ## Optional
//! - `STOREFRONT_HOST` - Bind address (default: 127.0.0.1)
//! - `STOREFRONT_PORT` - Listen port (default: 3000)
//! - `STOREFRONT_BASE_PATH` - Path prefix the storefront is served under (default: none)
//! - `STOREFRONT_STORAGE_DIR` - Directory for the cart and saved filters (default: .pocket-mall)
//! - `STOREFRONT_SCROLL_THRESHOLD` - Infinite scroll trigger distance in pixels (default: 200)
//! - `PRODUCT_API_CACHE_TTL_SECS` - Product API cache lifetime, 0 disables (default: 300)
//! - `LOG_FORMAT` - `json` for JSON log lines, anything else for text (default: text)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_SAMPLE_RATE` - Error sample rate, 0.0 to 1.0 (default: 1.0)
//! - `SENTRY_TRACES_SAMPLE_RATE` - Transaction sample rate, 0.0 to 1.0 (default: 0.0)

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use url::Url;

use crate::router::normalize_base_path;

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
    /// Path prefix, either empty or `/segment` without a trailing slash
    pub base_path: String,
    /// Product API base URL
    pub product_api_url: Url,
    /// Local storage directory
    pub storage_dir: PathBuf,
    /// Infinite scroll trigger distance in CSS pixels
    pub scroll_threshold: f64,
    /// Product API cache lifetime; `None` disables caching
    pub api_cache_ttl: Option<Duration>,
    /// Emit logs as JSON lines
    pub log_json: bool,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
    /// Fraction of errors sent to Sentry
    pub sentry_sample_rate: f32,
    /// Fraction of transactions sent to Sentry
    pub sentry_traces_sample_rate: f32,
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

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary variable source.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let env = Env(&lookup);

        let host = env.parse_or_default::<IpAddr>("STOREFRONT_HOST", "127.0.0.1")?;
        let port = env.parse_or_default::<u16>("STOREFRONT_PORT", "3000")?;

        let base_path = env.get_or_default("STOREFRONT_BASE_PATH", "");
        let base_path = normalize_base_path(&base_path)
            .map_err(|e| ConfigError::InvalidEnvVar("STOREFRONT_BASE_PATH".to_string(), e.to_string()))?;

        let product_api_url = env.get_required("PRODUCT_API_URL")?;
        let product_api_url = Url::parse(&product_api_url)
            .map_err(|e| ConfigError::InvalidEnvVar("PRODUCT_API_URL".to_string(), e.to_string()))?;
        if !matches!(product_api_url.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidEnvVar(
                "PRODUCT_API_URL".to_string(),
                format!("unsupported scheme {:?}", product_api_url.scheme()),
            ));
        }

        let storage_dir = PathBuf::from(env.get_or_default("STOREFRONT_STORAGE_DIR", ".pocket-mall"));

        let scroll_threshold = env.parse_or_default::<f64>("STOREFRONT_SCROLL_THRESHOLD", "200")?;
        if !scroll_threshold.is_finite() || scroll_threshold < 0.0 {
            return Err(ConfigError::InvalidEnvVar(
                "STOREFRONT_SCROLL_THRESHOLD".to_string(),
                "must be a non-negative number".to_string(),
            ));
        }

        let ttl_secs = env.parse_or_default::<u64>("PRODUCT_API_CACHE_TTL_SECS", "300")?;
        let api_cache_ttl = (ttl_secs > 0).then(|| Duration::from_secs(ttl_secs));

        Ok(Self {
            host,
            port,
            base_path,
            product_api_url,
            storage_dir,
            scroll_threshold,
            api_cache_ttl,
            log_json: env
                .get_optional("LOG_FORMAT")
                .is_some_and(|format| format.trim().eq_ignore_ascii_case("json")),
            sentry_dsn: env.get_optional("SENTRY_DSN"),
            sentry_environment: env.get_optional("SENTRY_ENVIRONMENT"),
            sentry_sample_rate: env.parse_rate("SENTRY_SAMPLE_RATE", "1.0")?,
            sentry_traces_sample_rate: env.parse_rate("SENTRY_TRACES_SAMPLE_RATE", "0.0")?,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

struct Env<'a, F>(&'a F);

impl<F: Fn(&str) -> Option<String>> Env<'_, F> {
    /// Get an optional variable. Blank values count as unset.
    fn get_optional(&self, key: &str) -> Option<String> {
        (self.0)(key).filter(|value| !value.trim().is_empty())
    }

    /// Get a required variable.
    fn get_required(&self, key: &str) -> Result<String, ConfigError> {
        self.get_optional(key)
            .ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
    }

    /// Get a variable with a default value.
    fn get_or_default(&self, key: &str, default: &str) -> String {
        self.get_optional(key).unwrap_or_else(|| default.to_string())
    }

    /// Parse a variable, falling back to `default` when unset.
    fn parse_or_default<T>(&self, key: &str, default: &str) -> Result<T, ConfigError>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display,
    {
        self.get_or_default(key, default)
            .trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
    }

    /// Parse a sample rate between 0.0 and 1.0.
    fn parse_rate(&self, key: &str, default: &str) -> Result<f32, ConfigError> {
        let rate = self.parse_or_default::<f32>(key, default)?;
        if (0.0..=1.0).contains(&rate) {
            Ok(rate)
        } else {
            Err(ConfigError::InvalidEnvVar(
                key.to_string(),
                format!("{rate} is outside 0.0..=1.0"),
            ))
        }
    }
}
