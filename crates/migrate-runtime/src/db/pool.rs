use std::str::FromStr;
use std::time::Duration;

use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};
use tracing::debug;

use migrate_core::config::DatabaseConfig;
use migrate_core::error::{MigrateError, Result};

/// Database connection wrapper.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Connect using the given configuration.
    pub async fn from_config(config: &DatabaseConfig) -> Result<Self> {
        let options = Self::connect_options(config)?;

        debug!(
            "Connecting to {}:{} (pool size {})",
            options.get_host(),
            options.get_port(),
            config.pool_size
        );

        let pool = PgPoolOptions::new()
            .max_connections(config.pool_size.max(1))
            .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
            .connect_with(options)
            .await
            .map_err(|e| MigrateError::Database(format!("Failed to connect: {}", e)))?;

        Ok(Self { pool })
    }

    /// Build connect options, applying the statement timeout if configured.
    fn connect_options(config: &DatabaseConfig) -> Result<PgConnectOptions> {
        let url = config.connection_url();
        let options = PgConnectOptions::from_str(&url)
            .map_err(|e| MigrateError::Config(format!("Invalid connection string: {}", e)))?;

        Ok(match config.statement_timeout_secs {
            Some(secs) => options.options([("statement_timeout", format!("{}s", secs))]),
            None => options,
        })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Close all connections gracefully.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}
