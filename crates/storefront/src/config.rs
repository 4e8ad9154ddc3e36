//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! All variables are optional.
//!
//! - `STOREFRONT_DATABASE_URL` - `PostgreSQL` connection string (falls back to
//!   `DATABASE_URL`; without either, orders are kept in memory)
//! - `STOREFRONT_CATALOG_URL` - Base URL serving `products.json` and
//!   `categories.json`
//! - `STOREFRONT_CATALOG_CACHE_TTL_SECS` - Catalog cache TTL (default: 300)
//! - `STOREFRONT_PERSIST_TIMEOUT_MS` - Order write timeout (default: 10000)
//! - `STOREFRONT_CLEAR_CART_ON_SIGN_OUT` - Empty the cart on sign-out
//!   (default: true)
//! - `STOREFRONT_CURRENCY` - ISO 4217 display currency (default: USD)
//! - `STOREFRONT_LOG_JSON` - Emit JSON logs (default: false)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_SAMPLE_RATE` - Error event sample rate (default: 1.0)
//! - `SENTRY_TRACES_SAMPLE_RATE` - Trace sample rate (default: 0.0)

use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;
use url::Url;

use techhub_core::CurrencyCode;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Storefront configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: Option<SecretString>,
    /// Catalog base URL
    pub catalog_url: Option<Url>,
    /// How long catalog listings are cached
    pub catalog_cache_ttl: Duration,
    /// Upper bound on a single order write
    pub persist_timeout: Duration,
    /// Whether signing out empties the cart
    pub clear_cart_on_sign_out: bool,
    /// Currency used when formatting prices
    pub currency: CurrencyCode,
    /// Emit logs as JSON lines
    pub log_json: bool,
    /// Error tracking
    pub sentry: SentryConfig,
}

/// Sentry configuration.
///
/// Implements `Debug` manually to redact the DSN.
#[derive(Clone)]
pub struct SentryConfig {
    pub dsn: Option<String>,
    pub environment: Option<String>,
    pub sample_rate: f32,
    pub traces_sample_rate: f32,
}

impl std::fmt::Debug for SentryConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SentryConfig")
            .field("dsn", &self.dsn.as_ref().map(|_| "[REDACTED]"))
            .field("environment", &self.environment)
            .field("sample_rate", &self.sample_rate)
            .field("traces_sample_rate", &self.traces_sample_rate)
            .finish()
    }
}

impl Default for SentryConfig {
    fn default() -> Self {
        Self {
            dsn: None,
            environment: None,
            sample_rate: 1.0,
            traces_sample_rate: 0.0,
        }
    }
}

impl Default for StorefrontConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            catalog_url: None,
            catalog_cache_ttl: Duration::from_secs(300),
            persist_timeout: Duration::from_millis(10_000),
            clear_cart_on_sign_out: true,
            currency: CurrencyCode::USD,
            log_json: false,
            sentry: SentryConfig::default(),
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
    /// Returns `ConfigError` if a variable is set but cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through `lookup` instead of the process
    /// environment.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set but cannot be parsed.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Env(lookup);
        let defaults = Self::default();

        let database_url = env
            .get("STOREFRONT_DATABASE_URL")
            .or_else(|| env.get("DATABASE_URL"))
            .map(SecretString::from);

        let catalog_url = env
            .get("STOREFRONT_CATALOG_URL")
            .map(|raw| {
                Url::parse(&raw).map_err(|e| {
                    ConfigError::InvalidEnvVar("STOREFRONT_CATALOG_URL".to_string(), e.to_string())
                })
            })
            .transpose()?;

        let catalog_cache_ttl = env
            .parse::<u64>("STOREFRONT_CATALOG_CACHE_TTL_SECS")?
            .map_or(defaults.catalog_cache_ttl, Duration::from_secs);

        let persist_timeout = match env.parse::<u64>("STOREFRONT_PERSIST_TIMEOUT_MS")? {
            Some(0) => {
                return Err(ConfigError::InvalidEnvVar(
                    "STOREFRONT_PERSIST_TIMEOUT_MS".to_string(),
                    "must be greater than zero".to_string(),
                ));
            }
            Some(ms) => Duration::from_millis(ms),
            None => defaults.persist_timeout,
        };

        let clear_cart_on_sign_out = env
            .flag("STOREFRONT_CLEAR_CART_ON_SIGN_OUT")?
            .unwrap_or(defaults.clear_cart_on_sign_out);

        let currency = env
            .parse::<CurrencyCode>("STOREFRONT_CURRENCY")?
            .unwrap_or(defaults.currency);

        let log_json = env.flag("STOREFRONT_LOG_JSON")?.unwrap_or(defaults.log_json);

        let sentry = SentryConfig {
            dsn: env.get("SENTRY_DSN"),
            environment: env.get("SENTRY_ENVIRONMENT"),
            sample_rate: env
                .parse("SENTRY_SAMPLE_RATE")?
                .unwrap_or(defaults.sentry.sample_rate),
            traces_sample_rate: env
                .parse("SENTRY_TRACES_SAMPLE_RATE")?
                .unwrap_or(defaults.sentry.traces_sample_rate),
        };

        Ok(Self {
            database_url,
            catalog_url,
            catalog_cache_ttl,
            persist_timeout,
            clear_cart_on_sign_out,
            currency,
            log_json,
            sentry,
        })
    }

    /// Require a database URL.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingEnvVar` if none is configured.
    pub fn require_database_url(&self) -> Result<&SecretString, ConfigError> {
        self.database_url
            .as_ref()
            .ok_or_else(|| ConfigError::MissingEnvVar("STOREFRONT_DATABASE_URL".to_string()))
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

struct Env<F>(F);

impl<F> Env<F>
where
    F: Fn(&str) -> Option<String>,
{
    /// Get a variable, treating blank values as unset.
    fn get(&self, key: &str) -> Option<String> {
        (self.0)(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    /// Parse a variable if set.
    fn parse<T>(&self, key: &str) -> Result<Option<T>, ConfigError>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display,
    {
        self.get(key)
            .map(|raw| {
                raw.parse::<T>()
                    .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
            })
            .transpose()
    }

    /// Parse a boolean flag (`true`/`false`, `1`/`0`, `yes`/`no`).
    fn flag(&self, key: &str) -> Result<Option<bool>, ConfigError> {
        self.get(key)
            .map(|raw| match raw.to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" => Ok(true),
                "false" | "0" | "no" => Ok(false),
                _ => Err(ConfigError::InvalidEnvVar(
                    key.to_string(),
                    format!("expected true or false, got '{raw}'"),
                )),
            })
            .transpose()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;

    use secrecy::ExposeSecret;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<StorefrontConfig, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        StorefrontConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[]).unwrap();
        assert!(config.database_url.is_none());
        assert!(config.catalog_url.is_none());
        assert_eq!(config.catalog_cache_ttl, Duration::from_secs(300));
        assert_eq!(config.persist_timeout, Duration::from_secs(10));
        assert!(config.clear_cart_on_sign_out);
        assert_eq!(config.currency, CurrencyCode::USD);
        assert!(!config.log_json);
        assert!(config.require_database_url().is_err());
    }

    #[test]
    fn test_database_url_fallback() {
        let config = load(&[("DATABASE_URL", "postgres://fallback/db")]).unwrap();
        assert_eq!(
            config.database_url.unwrap().expose_secret(),
            "postgres://fallback/db"
        );

        let config = load(&[
            ("DATABASE_URL", "postgres://fallback/db"),
            ("STOREFRONT_DATABASE_URL", "postgres://primary/db"),
        ])
        .unwrap();
        assert_eq!(
            config.require_database_url().unwrap().expose_secret(),
            "postgres://primary/db"
        );
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("STOREFRONT_CATALOG_URL", "https://catalog.example/v1"),
            ("STOREFRONT_CATALOG_CACHE_TTL_SECS", "30"),
            ("STOREFRONT_PERSIST_TIMEOUT_MS", "2500"),
            ("STOREFRONT_CLEAR_CART_ON_SIGN_OUT", "no"),
            ("STOREFRONT_CURRENCY", "eur"),
            ("STOREFRONT_LOG_JSON", "1"),
            ("SENTRY_ENVIRONMENT", "staging"),
        ])
        .unwrap();

        assert_eq!(config.catalog_url.unwrap().host_str(), Some("catalog.example"));
        assert_eq!(config.catalog_cache_ttl, Duration::from_secs(30));
        assert_eq!(config.persist_timeout, Duration::from_millis(2500));
        assert!(!config.clear_cart_on_sign_out);
        assert_eq!(config.currency, CurrencyCode::EUR);
        assert!(config.log_json);
        assert_eq!(config.sentry.environment.as_deref(), Some("staging"));
    }

    #[test]
    fn test_blank_values_ignored() {
        let config = load(&[("STOREFRONT_CURRENCY", "  "), ("SENTRY_DSN", "")]).unwrap();
        assert_eq!(config.currency, CurrencyCode::USD);
        assert!(config.sentry.dsn.is_none());
    }

    #[test]
    fn test_invalid_values_rejected() {
        for (key, value) in [
            ("STOREFRONT_CATALOG_URL", "not a url"),
            ("STOREFRONT_PERSIST_TIMEOUT_MS", "0"),
            ("STOREFRONT_PERSIST_TIMEOUT_MS", "soon"),
            ("STOREFRONT_CLEAR_CART_ON_SIGN_OUT", "maybe"),
            ("STOREFRONT_CURRENCY", "DOGE"),
        ] {
            let err = load(&[(key, value)]).unwrap_err();
            assert!(
                matches!(&err, ConfigError::InvalidEnvVar(k, _) if k == key),
                "{key}={value} gave {err:?}"
            );
        }
    }

    #[test]
    fn test_sentry_debug_redacts_dsn() {
        let config = load(&[("SENTRY_DSN", "https://public_key_value@o1.ingest.example/1")]).unwrap();
        let debug_output = format!("{:?}", config.sentry);
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("public_key_value"));
    }
}
