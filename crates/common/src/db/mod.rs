//! Database layer for TradeForge
//!
//! Provides the shared (public-schema) connection used by the tenant
//! registry and by partition DDL. Per-tenant connections are owned by
//! the tenancy crate's connection router, never by this pool.

use crate::config::DatabaseConfig;
use crate::errors::{AppError, Result};
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use std::time::Duration;
use tracing::info;

/// Shared database connection wrapper.
///
/// One per process, created at startup and passed by reference; the
/// explicit shutdown hook is [`SharedDb::close`].
#[derive(Clone)]
pub struct SharedDb {
    conn: DatabaseConnection,
}

impl SharedDb {
    /// Connect to the shared cluster using the base connection string.
    ///
    /// A missing or malformed URL is fatal: the process must not start
    /// without a usable shared connection.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        validate_base_url(&config.url)?;

        info!("Connecting to shared database...");

        let mut opts = ConnectOptions::new(&config.url);
        opts.max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
            .sqlx_logging(false);

        let conn = Database::connect(opts)
            .await
            .map_err(|e| AppError::ConnectionUnavailable {
                message: format!("failed to connect to shared database: {e}"),
            })?;

        info!("Shared database connection established");

        Ok(Self { conn })
    }

    /// Get the shared connection
    pub fn conn(&self) -> &DatabaseConnection {
        &self.conn
    }

    /// Ping the database to check connectivity
    pub async fn ping(&self) -> Result<()> {
        use sea_orm::ConnectionTrait;

        self.conn
            .execute_unprepared("SELECT 1")
            .await
            .map_err(|e| AppError::ConnectionUnavailable {
                message: format!("shared ping failed: {e}"),
            })?;

        Ok(())
    }

    /// Close the shared connection. Part of process shutdown.
    pub async fn close(self) -> Result<()> {
        self.conn.close().await.map_err(AppError::from)
    }
}

/// Reject an unusable base connection string before any connect attempt.
fn validate_base_url(url: &str) -> Result<()> {
    if url.trim().is_empty() {
        return Err(AppError::ConnectionUnavailable {
            message: "database.url is empty".into(),
        });
    }

    if !url.starts_with("postgres://") && !url.starts_with("postgresql://") {
        return Err(AppError::ConnectionUnavailable {
            message: "database.url must be a postgres:// connection string".into(),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_empty_url() {
        let err = validate_base_url("   ").unwrap_err();
        assert!(matches!(err, AppError::ConnectionUnavailable { .. }));
    }

    #[test]
    fn test_rejects_wrong_scheme() {
        let err = validate_base_url("mysql://host/db").unwrap_err();
        assert!(matches!(err, AppError::ConnectionUnavailable { .. }));
    }

    #[test]
    fn test_accepts_postgres_schemes() {
        assert!(validate_base_url("postgres://host/db").is_ok());
        assert!(validate_base_url("postgresql://host/db").is_ok());
    }
}
