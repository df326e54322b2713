//! Repository traits for data access layer
//!
//! This module defines the repository interfaces that services use to interact with storage.
//!
//! # Trait Hierarchy
//!
//! - Individual `*Repository` traits define the operations for each data domain
//! - Individual `*RepositoryProvider` traits provide access to each repository type
//! - [`RepositoryProvider`] is a supertrait combining all provider traits plus lifecycle methods

pub mod adapter;
pub mod cart;
pub mod order;
pub mod password;
pub mod product;
pub mod rate_limiter;
pub mod user;

pub use adapter::{
    CartRepositoryAdapter, OrderRepositoryAdapter, PasswordRepositoryAdapter,
    ProductRepositoryAdapter, RateLimiterRepositoryAdapter, UserRepositoryAdapter,
};
pub use cart::CartRepository;
pub use order::OrderRepository;
pub use password::PasswordRepository;
pub use product::ProductRepository;
pub use rate_limiter::RateLimiterRepository;
pub use user::UserRepository;

use async_trait::async_trait;

use crate::Error;

// ============================================================================
// Individual Repository Provider Traits
// ============================================================================

/// Provider trait for user repository access.
pub trait UserRepositoryProvider: Send + Sync + 'static {
    type UserRepo: UserRepository;

    fn user(&self) -> &Self::UserRepo;
}

/// Provider trait for password hash access.
pub trait PasswordRepositoryProvider: Send + Sync + 'static {
    type PasswordRepo: PasswordRepository;

    fn password(&self) -> &Self::PasswordRepo;
}

/// Provider trait for the persistent rate limiter counters.
pub trait RateLimiterRepositoryProvider: Send + Sync + 'static {
    type RateLimiterRepo: RateLimiterRepository;

    fn rate_limiter(&self) -> &Self::RateLimiterRepo;
}

/// Provider trait for the product catalog.
pub trait ProductRepositoryProvider: Send + Sync + 'static {
    type ProductRepo: ProductRepository;

    fn product(&self) -> &Self::ProductRepo;
}

/// Provider trait for shopping carts.
pub trait CartRepositoryProvider: Send + Sync + 'static {
    type CartRepo: CartRepository;

    fn cart(&self) -> &Self::CartRepo;
}

/// Provider trait for orders.
pub trait OrderRepositoryProvider: Send + Sync + 'static {
    type OrderRepo: OrderRepository;

    fn order(&self) -> &Self::OrderRepo;
}

// ============================================================================
// Unified Repository Provider Trait
// ============================================================================

/// Provider trait that storage implementations must implement to provide all repositories.
///
/// # Implementing a Storage Backend
///
/// 1. Implement each individual `*Repository` trait for your backend
/// 2. Implement each individual `*RepositoryProvider` trait
/// 3. Implement the `RepositoryProvider` trait with `migrate()` and `health_check()`
#[async_trait]
pub trait RepositoryProvider:
    UserRepositoryProvider
    + PasswordRepositoryProvider
    + RateLimiterRepositoryProvider
    + ProductRepositoryProvider
    + CartRepositoryProvider
    + OrderRepositoryProvider
{
    /// Run migrations for all repositories
    async fn migrate(&self) -> Result<(), Error>;

    /// Health check for all repositories
    async fn health_check(&self) -> Result<(), Error>;
}
