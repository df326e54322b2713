//! SQLite storage backend for the storefront.
//!
//! ```no_run
//! use storefront_storage_sqlite::SqliteStorage;
//!
//! # async fn run() -> Result<(), storefront_core::Error> {
//! let storage = SqliteStorage::connect("sqlite://storefront.db?mode=rwc").await?;
//! storage.migrate().await?;
//! let repositories = storage.into_repository_provider();
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod migrations;
pub mod repositories;

pub use repositories::{
    SqliteCartRepository, SqliteOrderRepository, SqlitePasswordRepository,
    SqliteProductRepository, SqliteRateLimiterRepository, SqliteRepositoryProvider,
    SqliteUserRepository,
};

use std::str::FromStr;
use std::time::Duration;

use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use storefront_core::{Error, error::StorageError, repositories::RepositoryProvider};

use crate::error::DatabaseResultExt;

/// A connection pool to a SQLite database.
pub struct SqliteStorage {
    pool: SqlitePool,
}

impl SqliteStorage {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open (creating if needed) the database at `database_url`.
    ///
    /// File databases use WAL journaling; every connection waits up to five
    /// seconds on a locked database before failing.
    pub async fn connect(database_url: &str) -> Result<Self, Error> {
        let mut options = SqliteConnectOptions::from_str(database_url)
            .map_err(|e| {
                tracing::error!(error = %e, "Invalid database URL");
                StorageError::Connection(format!("Invalid database URL: {e}"))
            })?
            .create_if_missing(true)
            .busy_timeout(Duration::from_secs(5));

        if !database_url.contains(":memory:") {
            options = options.journal_mode(SqliteJournalMode::Wal);
        }

        let pool = SqlitePoolOptions::new()
            .connect_with(options)
            .await
            .map_db_err("Failed to connect to database")?;

        tracing::debug!("Connected to SQLite database");
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Bring the schema up to date.
    pub async fn migrate(&self) -> Result<(), Error> {
        SqliteRepositoryProvider::new(self.pool.clone())
            .migrate()
            .await
    }

    pub fn into_repository_provider(self) -> SqliteRepositoryProvider {
        SqliteRepositoryProvider::new(self.pool)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use storefront_core::{
        Product, ProductId, User,
        repositories::{ProductRepository, UserRepository},
        storage::{NewProduct, NewUser},
    };

    pub async fn setup_test_db() -> SqlitePool {
        let _ = tracing_subscriber::fmt().try_init();

        let pool = SqlitePool::connect("sqlite::memory:")
            .await
            .expect("Failed to create pool");
        SqliteRepositoryProvider::new(pool.clone())
            .migrate()
            .await
            .expect("Failed to run migrations");
        pool
    }

    pub async fn seed_user(pool: &SqlitePool, username: &str) -> User {
        SqliteUserRepository::new(pool.clone())
            .create(
                NewUser::builder()
                    .username(username.to_string())
                    .email(format!("{username}@example.com"))
                    .build()
                    .unwrap(),
            )
            .await
            .unwrap()
    }

    pub async fn seed_product(pool: &SqlitePool, name: &str, price: f64) -> Product {
        SqliteProductRepository::new(pool.clone())
            .create(NewProduct {
                id: ProductId::new_random(),
                name: name.to_string(),
                description: String::new(),
                price,
                image: format!("https://example.com/{name}.png"),
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_connect_in_memory() {
        let storage = SqliteStorage::connect("sqlite::memory:").await.unwrap();
        storage.migrate().await.unwrap();

        let provider = storage.into_repository_provider();
        provider.health_check().await.unwrap();
    }
}
