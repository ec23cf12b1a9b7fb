//! Database context provider
//!
//! Multi-tenant connection routing lives outside this system; the engine
//! only asks the provider for the pool belonging to the current request.

use crate::config::DatabaseConfig;
use crate::error::Result;
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;

/// Hands the engine the database pool for the current request.
///
/// Implementations own the routing decision (which tenant, which physical
/// database); the engine never makes it.
#[async_trait]
pub trait ContextProvider: Send + Sync {
    async fn pool(&self) -> Result<SqlitePool>;
}

/// Single-database provider used by the server binary and the tests
pub struct StaticContext {
    pool: SqlitePool,
}

impl StaticContext {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open a pool per the database configuration, creating the database
    /// file when missing and running migrations when configured to.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(&config.url)?.create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .connect_with(options)
            .await?;

        if config.auto_migrate {
            log::info!("Running database migrations");
            run_migrations(&pool).await?;
        }

        Ok(Self::new(pool))
    }
}

#[async_trait]
impl ContextProvider for StaticContext {
    async fn pool(&self) -> Result<SqlitePool> {
        Ok(self.pool.clone())
    }
}

/// Apply the embedded migrations to the given pool
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}
