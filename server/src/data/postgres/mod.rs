//! PostgreSQL database service.
//!
//! Provides connection pooling, migrations, and the chat repository trio
//! for the `postgres` database backend.

mod migrations;
pub mod repositories;
mod schema;

pub use sqlx::PgPool;

use std::time::Duration;

use sqlx::ConnectOptions;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::log::LevelFilter;

use crate::core::config::PostgresConfig;
use crate::data::error::DataError;

const BACKEND: &str = "postgres";

/// PostgreSQL database service.
///
/// Handles connection pooling and background maintenance. Created once at
/// server startup and shared across all repositories.
pub struct PostgresService {
    pool: PgPool,
}

impl PostgresService {
    /// Initialize the database service from configuration: builds a
    /// connection pool sized for the configured workload and runs pending
    /// migrations.
    pub async fn init(config: &PostgresConfig) -> Result<Self, DataError> {
        if config.url.is_empty() {
            return Err(DataError::Config("PostgreSQL URL is required".into()));
        }

        let mut options: PgConnectOptions = config
            .url
            .parse()
            .map_err(|e| DataError::Config(format!("Invalid PostgreSQL URL: {e}")))?;

        options = options.log_statements(LevelFilter::Trace);
        if config.statement_timeout_secs > 0 {
            options = options.options([("statement_timeout", format!("{}s", config.statement_timeout_secs))]);
        }

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
            .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
            .max_lifetime(Duration::from_secs(config.max_lifetime_secs))
            .connect_with(options)
            .await?;

        migrations::run_migrations(&pool).await?;

        tracing::debug!(
            max_connections = config.max_connections,
            min_connections = config.min_connections,
            "PostgresService initialized"
        );
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn close(&self) {
        self.pool.close().await;
        tracing::debug!("PostgreSQL pool closed");
    }

    pub async fn health_check(&self) -> Result<(), DataError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    /// Start a background health-check task, bounded by `shutdown_rx`.
    pub fn start_health_check_task(pool: PgPool, mut shutdown_rx: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(60));
            loop {
                tokio::select! {
                    biased;
                    _ = shutdown_rx.changed() => {
                        if *shutdown_rx.borrow() {
                            tracing::debug!("PostgreSQL health check task shutting down");
                            break;
                        }
                    }
                    _ = interval.tick() => {
                        if let Err(e) = sqlx::query("SELECT 1").execute(&pool).await {
                            tracing::warn!(error = %e, backend = BACKEND, "PostgreSQL health check failed");
                        }
                    }
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    // PostgreSQL tests require a running instance and are run as integration
    // tests, not part of the unit test suite.
}
