//! Store configuration loaded from environment variables.

use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

use crate::Result;

/// Database configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `DATABASE_URL`: PostgreSQL connection string
///   (default: `"postgres://localhost/fulfillment"`)
/// - `DATABASE_MAX_CONNECTIONS`: pool size (default: `10`)
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub database_url: String,
    pub max_connections: u32,
}

impl StoreConfig {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self {
            database_url: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| "postgres://localhost/fulfillment".to_string()),
            max_connections: std::env::var("DATABASE_MAX_CONNECTIONS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(10),
        }
    }

    /// Connects a pool using this configuration.
    pub async fn connect(&self) -> Result<PgPool> {
        let pool = PgPoolOptions::new()
            .max_connections(self.max_connections)
            .connect(&self.database_url)
            .await?;
        Ok(pool)
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database_url: "postgres://localhost/fulfillment".to_string(),
            max_connections: 10,
        }
    }
}
