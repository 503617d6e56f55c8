//! Server configuration management.
//!
//! Consolidates all environment variable reads and provides validated configuration.

use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;
use tictac_rooms::db::{DatabaseConfig, timeouts::DEFAULT_QUERY_TIMEOUT};
use tictac_rooms::session::DEFAULT_SESSION_MAX_AGE;
use tictac_rooms::matchmaking::DEFAULT_APP_DOMAIN;
use tictac_rooms::store::DEFAULT_RESERVATION_TTL;

/// Default server bind address
pub const DEFAULT_BIND: SocketAddr = SocketAddr::new(
    std::net::IpAddr::V4(std::net::Ipv4Addr::LOCALHOST),
    8080,
);

/// Minimum length of the cookie signing secret
pub const MIN_SESSION_SECRET_LEN: usize = 16;

/// Complete server configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Server bind address
    pub bind: SocketAddr,
    /// Database configuration
    pub database: DatabaseConfig,
    /// Origin used in invitation links
    pub app_domain: String,
    /// Client session cookie configuration
    pub session: SessionSettings,
    /// Which room store to run against
    pub store_backend: StoreBackend,
    /// Prometheus scrape address, if metrics are enabled
    pub metrics_bind: Option<SocketAddr>,
    /// Per-query timeout for the PostgreSQL store
    pub query_timeout: Duration,
    /// Age after which a room reservation counts as abandoned
    pub reservation_ttl: Duration,
}

/// Client session cookie settings
#[derive(Debug, Clone)]
pub struct SessionSettings {
    /// Cookie signing secret (required)
    pub secret: String,
    /// Lifetime of the cookie and of the session binding
    pub max_age: Duration,
}

/// Room store backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(StoreBackend::Postgres),
            "memory" => Ok(StoreBackend::Memory),
            other => Err(ConfigError::Invalid {
                var: "STORE_BACKEND".to_string(),
                reason: format!("Unknown backend '{other}', expected 'postgres' or 'memory'"),
            }),
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// # Arguments
    ///
    /// * `bind_override` - Optional bind address override (from CLI args)
    /// * `database_url_override` - Optional database URL override (from CLI args)
    ///
    /// # Returns
    ///
    /// * `Result<ServerConfig, ConfigError>` - Loaded configuration or error
    ///
    /// # Errors
    ///
    /// Returns error if required variables are missing or invalid
    pub fn from_env(
        bind_override: Option<SocketAddr>,
        database_url_override: Option<String>,
    ) -> Result<Self, ConfigError> {
        let bind = bind_override
            .or_else(|| {
                std::env::var("SERVER_BIND")
                    .ok()
                    .and_then(|s| s.parse().ok())
            })
            .unwrap_or(DEFAULT_BIND);

        let mut database = DatabaseConfig::from_env();
        if let Some(database_url) = database_url_override {
            database.database_url = database_url;
        }

        // Session secret (REQUIRED)
        let secret = std::env::var("SESSION_SECRET").map_err(|_| ConfigError::MissingRequired {
            var: "SESSION_SECRET".to_string(),
            hint: "Generate with: openssl rand -hex 32".to_string(),
        })?;

        if secret.len() < MIN_SESSION_SECRET_LEN {
            return Err(ConfigError::Invalid {
                var: "SESSION_SECRET".to_string(),
                reason: format!("Must be at least {MIN_SESSION_SECRET_LEN} characters"),
            });
        }

        let session = SessionSettings {
            secret,
            max_age: Duration::from_secs(parse_env_or(
                "SESSION_MAX_AGE_SECS",
                DEFAULT_SESSION_MAX_AGE.as_secs(),
            )),
        };

        let store_backend = match std::env::var("STORE_BACKEND") {
            Ok(value) => value.parse()?,
            Err(_) => StoreBackend::Postgres,
        };

        let metrics_bind = match std::env::var("METRICS_BIND") {
            Ok(value) => Some(value.parse().map_err(|_| ConfigError::Invalid {
                var: "METRICS_BIND".to_string(),
                reason: format!("'{value}' is not a socket address"),
            })?),
            Err(_) => None,
        };

        Ok(ServerConfig {
            bind,
            database,
            app_domain: std::env::var("APP_DOMAIN").unwrap_or_else(|_| DEFAULT_APP_DOMAIN.to_string()),
            session,
            store_backend,
            metrics_bind,
            query_timeout: Duration::from_millis(parse_env_or(
                "QUERY_TIMEOUT_MS",
                DEFAULT_QUERY_TIMEOUT.as_millis() as u64,
            )),
            reservation_ttl: Duration::from_secs(parse_env_or(
                "RESERVATION_TTL_SECS",
                DEFAULT_RESERVATION_TTL.as_secs(),
            )),
        })
    }

    /// Validate configuration after loading
    ///
    /// # Returns
    ///
    /// * `Result<(), ConfigError>` - Success or validation error
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.app_domain.starts_with("http://") && !self.app_domain.starts_with("https://") {
            return Err(ConfigError::Invalid {
                var: "APP_DOMAIN".to_string(),
                reason: "Must start with http:// or https://".to_string(),
            });
        }

        if self.session.max_age.is_zero() {
            return Err(ConfigError::Invalid {
                var: "SESSION_MAX_AGE_SECS".to_string(),
                reason: "Must be greater than 0".to_string(),
            });
        }

        if self.query_timeout.is_zero() {
            return Err(ConfigError::Invalid {
                var: "QUERY_TIMEOUT_MS".to_string(),
                reason: "Must be greater than 0".to_string(),
            });
        }

        if self.reservation_ttl <= self.query_timeout {
            return Err(ConfigError::Invalid {
                var: "RESERVATION_TTL_SECS".to_string(),
                reason: "Must be longer than QUERY_TIMEOUT_MS".to_string(),
            });
        }

        if self.store_backend == StoreBackend::Postgres
            && self.database.max_connections < self.database.min_connections
        {
            return Err(ConfigError::Invalid {
                var: "DB_MAX_CONNECTIONS".to_string(),
                reason: format!(
                    "Must be at least DB_MIN_CONNECTIONS ({})",
                    self.database.min_connections
                ),
            });
        }

        Ok(())
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {var}\nHint: {hint}")]
    MissingRequired { var: String, hint: String },

    #[error("Invalid configuration for {var}: {reason}")]
    Invalid { var: String, reason: String },
}

/// Helper to parse environment variable with default fallback
fn parse_env_or<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
