//! Repository implementations for SQLite storage

pub mod cart;
pub mod order;
pub mod password;
pub mod product;
pub mod rate_limiter;
pub mod user;

pub use cart::SqliteCartRepository;
pub use order::SqliteOrderRepository;
pub use password::SqlitePasswordRepository;
pub use product::SqliteProductRepository;
pub use rate_limiter::SqliteRateLimiterRepository;
pub use user::SqliteUserRepository;

use async_trait::async_trait;
use sqlx::SqlitePool;
use std::sync::Arc;
use storefront_core::{
    Error,
    repositories::{
        CartRepositoryProvider, OrderRepositoryProvider, PasswordRepositoryProvider,
        ProductRepositoryProvider, RateLimiterRepositoryProvider, RepositoryProvider,
        UserRepositoryProvider,
    },
};
use storefront_migration::MigrationManager;

use crate::error::DatabaseResultExt;
use crate::migrations::{SqliteMigrationManager, all_migrations};

/// Repository provider implementation for SQLite
///
/// Every repository shares the same connection pool.
pub struct SqliteRepositoryProvider {
    pool: SqlitePool,
    user: Arc<SqliteUserRepository>,
    password: Arc<SqlitePasswordRepository>,
    rate_limiter: Arc<SqliteRateLimiterRepository>,
    product: Arc<SqliteProductRepository>,
    cart: Arc<SqliteCartRepository>,
    order: Arc<SqliteOrderRepository>,
}

impl SqliteRepositoryProvider {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            user: Arc::new(SqliteUserRepository::new(pool.clone())),
            password: Arc::new(SqlitePasswordRepository::new(pool.clone())),
            rate_limiter: Arc::new(SqliteRateLimiterRepository::new(pool.clone())),
            product: Arc::new(SqliteProductRepository::new(pool.clone())),
            cart: Arc::new(SqliteCartRepository::new(pool.clone())),
            order: Arc::new(SqliteOrderRepository::new(pool.clone())),
            pool,
        }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

impl UserRepositoryProvider for SqliteRepositoryProvider {
    type UserRepo = SqliteUserRepository;

    fn user(&self) -> &Self::UserRepo {
        &self.user
    }
}

impl PasswordRepositoryProvider for SqliteRepositoryProvider {
    type PasswordRepo = SqlitePasswordRepository;

    fn password(&self) -> &Self::PasswordRepo {
        &self.password
    }
}

impl RateLimiterRepositoryProvider for SqliteRepositoryProvider {
    type RateLimiterRepo = SqliteRateLimiterRepository;

    fn rate_limiter(&self) -> &Self::RateLimiterRepo {
        &self.rate_limiter
    }
}

impl ProductRepositoryProvider for SqliteRepositoryProvider {
    type ProductRepo = SqliteProductRepository;

    fn product(&self) -> &Self::ProductRepo {
        &self.product
    }
}

impl CartRepositoryProvider for SqliteRepositoryProvider {
    type CartRepo = SqliteCartRepository;

    fn cart(&self) -> &Self::CartRepo {
        &self.cart
    }
}

impl OrderRepositoryProvider for SqliteRepositoryProvider {
    type OrderRepo = SqliteOrderRepository;

    fn order(&self) -> &Self::OrderRepo {
        &self.order
    }
}

#[async_trait]
impl RepositoryProvider for SqliteRepositoryProvider {
    async fn migrate(&self) -> Result<(), Error> {
        let manager = SqliteMigrationManager::new(self.pool.clone());
        manager.initialize().await?;
        manager.up(&all_migrations()).await?;

        tracing::info!("Database migrations are up to date");
        Ok(())
    }

    async fn health_check(&self) -> Result<(), Error> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_db_err("Health check failed")?;
        Ok(())
    }
}
