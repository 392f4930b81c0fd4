// Persistence layer for the Tally users service.
// Store traits live in `repositories`; Postgres and in-memory backends implement them.

pub mod config;
pub mod models;
pub mod repositories;

// Re-export commonly used items
pub use config::DatabaseConfig;
pub use repositories::{
    transactional, InMemoryRefreshTokenStore, InMemoryUserStore, PgRefreshTokenStore, PgUserStore,
    RefreshTokenStore, UserStore, UserTransaction,
};
pub use sqlx;

use anyhow::{Context, Result};
use sqlx::{postgres::PgPoolOptions, PgPool};

/// Database connection manager
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Create a new database instance from configuration
    pub async fn new(config: &DatabaseConfig) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.connect_timeout())
            .connect(&config.database_url)
            .await
            .context("Failed to connect to database")?;

        Ok(Self { pool })
    }

    pub fn users(&self) -> PgUserStore {
        PgUserStore::new(self.pool.clone())
    }

    pub fn refresh_tokens(&self) -> PgRefreshTokenStore {
        PgRefreshTokenStore::new(self.pool.clone())
    }

    /// Run database migrations
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .context("Failed to run migrations")?;
        Ok(())
    }
}
