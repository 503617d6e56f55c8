//! PostgreSQL pool setup and schema migrations.
//!
//! [`Database`] only builds the pool and applies `migrations/`; the room
//! store and session binder share the pool it hands out.

use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;

pub mod config;
pub mod timeouts;

pub use config::DatabaseConfig;

/// Connected, migratable pool
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Connect a pool sized and timed by `config`.
    ///
    /// ```no_run
    /// use tictac_rooms::db::{Database, DatabaseConfig};
    ///
    /// # async fn connect() -> Result<(), sqlx::Error> {
    /// let db = Database::new(&DatabaseConfig::development()).await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn new(config: &DatabaseConfig) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.connection_timeout_secs))
            .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
            .max_lifetime(Duration::from_secs(config.max_lifetime_secs))
            .connect(&config.database_url)
            .await?;

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Bring the `rooms` and `session_bindings` tables up to date
    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }
}
