//! Admin configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required (postgres store)
//! - `SHOPDESK_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//!
//! ## Optional
//! - `SHOPDESK_STORE` - Storage backend, `postgres` or `memory` (default: postgres)
//! - `SHOPDESK_HOST` - Bind address (default: 127.0.0.1)
//! - `SHOPDESK_PORT` - Listen port (default: 3001)
//! - `SHOPDESK_CURRENCY` - Display currency (default: MYR)
//! - `SHOPDESK_PER_PAGE` - Default table page size (default: 10)
//! - `SHOPDESK_LOG_FORMAT` - `json` for structured logs, anything else for text
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_SAMPLE_RATE` - Error sample rate (default: 1.0)
//! - `SENTRY_TRACES_SAMPLE_RATE` - Traces sample rate (default: 0.1)

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::str::FromStr;

use secrecy::SecretString;
use thiserror::Error;

use shopdesk_core::CurrencyCode;

/// Largest page size a client may request.
pub const MAX_PER_PAGE: u32 = 100;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Which storage backend serves the admin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StoreKind {
    /// `PostgreSQL` through a sqlx pool.
    #[default]
    Postgres,
    /// Process-local maps; data is lost on restart.
    Memory,
}

impl FromStr for StoreKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(Self::Postgres),
            "memory" => Ok(Self::Memory),
            _ => Err(format!("expected 'postgres' or 'memory', got '{s}'")),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Admin application configuration.
#[derive(Clone)]
pub struct AdminConfig {
    /// Storage backend
    pub store: StoreKind,
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: Option<SecretString>,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Currency used when displaying money
    pub currency: CurrencyCode,
    /// Default page size for resource tables
    pub per_page: u32,
    /// Log output format
    pub log_format: LogFormat,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment (e.g., "development", "staging", "production")
    pub sentry_environment: Option<String>,
    /// Sentry error sample rate (0.0 to 1.0)
    pub sentry_sample_rate: f32,
    /// Sentry traces sample rate for performance monitoring (0.0 to 1.0)
    pub sentry_traces_sample_rate: f32,
}

impl std::fmt::Debug for AdminConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminConfig")
            .field("store", &self.store)
            .field(
                "database_url",
                &self.database_url.as_ref().map(|_| "[REDACTED]"),
            )
            .field("host", &self.host)
            .field("port", &self.port)
            .field("currency", &self.currency)
            .field("per_page", &self.per_page)
            .field("log_format", &self.log_format)
            .field("sentry_dsn", &self.sentry_dsn.as_ref().map(|_| "[REDACTED]"))
            .field("sentry_environment", &self.sentry_environment)
            .finish_non_exhaustive()
    }
}

impl Default for AdminConfig {
    /// In-memory configuration used by tests and demos.
    fn default() -> Self {
        Self {
            store: StoreKind::Memory,
            database_url: None,
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 3001,
            currency: CurrencyCode::default(),
            per_page: 10,
            log_format: LogFormat::Text,
            sentry_dsn: None,
            sentry_environment: None,
            sentry_sample_rate: 1.0,
            sentry_traces_sample_rate: 0.1,
        }
    }
}

impl AdminConfig {
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

        let store = parse_env::<StoreKind>("SHOPDESK_STORE", "postgres")?;
        let database_url = match store {
            StoreKind::Postgres => Some(get_database_url("SHOPDESK_DATABASE_URL")?),
            StoreKind::Memory => None,
        };
        let host = parse_env::<IpAddr>("SHOPDESK_HOST", "127.0.0.1")?;
        let port = parse_env::<u16>("SHOPDESK_PORT", "3001")?;
        let currency = parse_env::<CurrencyCode>("SHOPDESK_CURRENCY", "MYR")?;
        let per_page = parse_env::<u32>("SHOPDESK_PER_PAGE", "10")?;
        if per_page == 0 || per_page > MAX_PER_PAGE {
            return Err(ConfigError::InvalidEnvVar(
                "SHOPDESK_PER_PAGE".to_string(),
                format!("must be between 1 and {MAX_PER_PAGE}"),
            ));
        }
        let log_format = match get_optional_env("SHOPDESK_LOG_FORMAT").as_deref() {
            Some("json") => LogFormat::Json,
            _ => LogFormat::Text,
        };
        let sentry_dsn = get_optional_env("SENTRY_DSN");
        let sentry_environment = get_optional_env("SENTRY_ENVIRONMENT");
        let sentry_sample_rate = get_optional_env("SENTRY_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(1.0);
        let sentry_traces_sample_rate = get_optional_env("SENTRY_TRACES_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(0.1);

        Ok(Self {
            store,
            database_url,
            host,
            port,
            currency,
            per_page,
            log_format,
            sentry_dsn,
            sentry_environment,
            sentry_sample_rate,
            sentry_traces_sample_rate,
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

/// Get database URL with fallback to generic `DATABASE_URL`.
fn get_database_url(primary_key: &str) -> Result<SecretString, ConfigError> {
    if let Ok(value) = std::env::var(primary_key) {
        return Ok(SecretString::from(value));
    }
    if let Ok(value) = std::env::var("DATABASE_URL") {
        return Ok(SecretString::from(value));
    }
    Err(ConfigError::MissingEnvVar(primary_key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse an environment variable (or its default) into `T`.
fn parse_env<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    get_env_or_default(key, default)
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_store_kind_parse() {
        assert_eq!("memory".parse::<StoreKind>().unwrap(), StoreKind::Memory);
        assert_eq!("Postgres".parse::<StoreKind>().unwrap(), StoreKind::Postgres);
        assert!("sqlite".parse::<StoreKind>().is_err());
    }

    #[test]
    fn test_parse_env_uses_default() {
        let port = parse_env::<u16>("SHOPDESK_TEST_UNSET_PORT", "4000").unwrap();
        assert_eq!(port, 4000);
    }

    #[test]
    fn test_parse_env_reports_key() {
        let err = parse_env::<u16>("SHOPDESK_TEST_UNSET_BAD", "not-a-port").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(key, _) if key == "SHOPDESK_TEST_UNSET_BAD"));
    }

    #[test]
    fn test_socket_addr() {
        let config = AdminConfig {
            port: 8080,
            ..AdminConfig::default()
        };

        let addr = config.socket_addr();
        assert_eq!(addr.ip().to_string(), "127.0.0.1");
        assert_eq!(addr.port(), 8080);
    }

    #[test]
    fn test_default_currency_is_ringgit() {
        assert_eq!(AdminConfig::default().currency.symbol(), "RM");
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let config = AdminConfig {
            store: StoreKind::Postgres,
            database_url: Some(SecretString::from("postgres://shop:hunter2@db/shop")),
            sentry_dsn: Some("https://key@sentry.invalid/1".to_string()),
            ..AdminConfig::default()
        };

        let debug_output = format!("{config:?}");

        assert!(debug_output.contains("Postgres"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("hunter2"));
        assert!(!debug_output.contains("sentry.invalid"));
    }
}
