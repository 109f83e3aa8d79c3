use std::time::Duration;

use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::Executor;

use queuelens_core::config::DatabaseConfig;
use queuelens_core::error::{QueueLensError, Result};

/// Read-only connection pool to the event store.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
    config: DatabaseConfig,
}

impl Database {
    /// Connect using the given configuration.
    pub async fn from_config(config: &DatabaseConfig) -> Result<Self> {
        config.validate()?;

        let statement_timeout_ms = config.statement_timeout_secs * 1000;
        let pool = PgPoolOptions::new()
            .max_connections(config.pool_size)
            .acquire_timeout(Duration::from_secs(config.pool_timeout_secs))
            .after_connect(move |conn, _meta| {
                Box::pin(async move {
                    conn.execute(
                        format!("SET statement_timeout = {}", statement_timeout_ms).as_str(),
                    )
                    .await?;
                    conn.execute("SET default_transaction_read_only = on").await?;
                    Ok(())
                })
            })
            .connect(&config.url)
            .await
            .map_err(|e| QueueLensError::Database(format!("Failed to connect: {}", e)))?;

        tracing::debug!(pool_size = config.pool_size, "Database pool created");

        Ok(Self {
            pool,
            config: config.clone(),
        })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub fn config(&self) -> &DatabaseConfig {
        &self.config
    }

    /// Check database connectivity.
    pub async fn health_check(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| QueueLensError::Database(format!("Health check failed: {}", e)))?;
        Ok(())
    }

    /// Close all connections gracefully.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}
