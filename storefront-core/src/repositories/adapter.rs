use crate::{
    Cart, Error, Order, OrderId, Product, ProductId, User, UserId,
    repositories::{
        CartRepository, OrderRepository, PasswordRepository, ProductRepository,
        RateLimiterRepository, RepositoryProvider, UserRepository,
    },
    storage::{
        CartLine, NewOrder, NewProduct, NewUser, ProductUpdate, RateLimiterConfig,
        RateLimiterState,
    },
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Adapter that wraps a RepositoryProvider and implements individual repository traits
pub struct UserRepositoryAdapter<R: RepositoryProvider> {
    provider: Arc<R>,
}

impl<R: RepositoryProvider> UserRepositoryAdapter<R> {
    pub fn new(provider: Arc<R>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl<R: RepositoryProvider> UserRepository for UserRepositoryAdapter<R> {
    async fn create(&self, user: NewUser) -> Result<User, Error> {
        self.provider.user().create(user).await
    }

    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, Error> {
        self.provider.user().find_by_id(id).await
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, Error> {
        self.provider.user().find_by_username(username).await
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, Error> {
        self.provider.user().find_by_email(email).await
    }

    async fn list(&self) -> Result<Vec<User>, Error> {
        self.provider.user().list().await
    }

    async fn delete(&self, id: &UserId) -> Result<(), Error> {
        self.provider.user().delete(id).await
    }
}

pub struct PasswordRepositoryAdapter<R: RepositoryProvider> {
    provider: Arc<R>,
}

impl<R: RepositoryProvider> PasswordRepositoryAdapter<R> {
    pub fn new(provider: Arc<R>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl<R: RepositoryProvider> PasswordRepository for PasswordRepositoryAdapter<R> {
    async fn set_password_hash(&self, user_id: &UserId, hash: &str) -> Result<(), Error> {
        self.provider.password().set_password_hash(user_id, hash).await
    }

    async fn get_password_hash(&self, user_id: &UserId) -> Result<Option<String>, Error> {
        self.provider.password().get_password_hash(user_id).await
    }
}

pub struct RateLimiterRepositoryAdapter<R: RepositoryProvider> {
    provider: Arc<R>,
}

impl<R: RepositoryProvider> RateLimiterRepositoryAdapter<R> {
    pub fn new(provider: Arc<R>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl<R: RepositoryProvider> RateLimiterRepository for RateLimiterRepositoryAdapter<R> {
    async fn get(&self, key: &str, now: DateTime<Utc>) -> Result<Option<RateLimiterState>, Error> {
        self.provider.rate_limiter().get(key, now).await
    }

    async fn consume(
        &self,
        key: &str,
        config: &RateLimiterConfig,
        now: DateTime<Utc>,
    ) -> Result<RateLimiterState, Error> {
        self.provider.rate_limiter().consume(key, config, now).await
    }

    async fn delete(&self, key: &str) -> Result<(), Error> {
        self.provider.rate_limiter().delete(key).await
    }

    async fn cleanup_expired(&self, before: DateTime<Utc>) -> Result<u64, Error> {
        self.provider.rate_limiter().cleanup_expired(before).await
    }
}

pub struct ProductRepositoryAdapter<R: RepositoryProvider> {
    provider: Arc<R>,
}

impl<R: RepositoryProvider> ProductRepositoryAdapter<R> {
    pub fn new(provider: Arc<R>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl<R: RepositoryProvider> ProductRepository for ProductRepositoryAdapter<R> {
    async fn create(&self, product: NewProduct) -> Result<Product, Error> {
        self.provider.product().create(product).await
    }

    async fn find_by_id(&self, id: &ProductId) -> Result<Option<Product>, Error> {
        self.provider.product().find_by_id(id).await
    }

    async fn list(&self) -> Result<Vec<Product>, Error> {
        self.provider.product().list().await
    }

    async fn update(
        &self,
        id: &ProductId,
        update: ProductUpdate,
    ) -> Result<Option<Product>, Error> {
        self.provider.product().update(id, update).await
    }

    async fn soft_delete(&self, id: &ProductId) -> Result<bool, Error> {
        self.provider.product().soft_delete(id).await
    }
}

pub struct CartRepositoryAdapter<R: RepositoryProvider> {
    provider: Arc<R>,
}

impl<R: RepositoryProvider> CartRepositoryAdapter<R> {
    pub fn new(provider: Arc<R>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl<R: RepositoryProvider> CartRepository for CartRepositoryAdapter<R> {
    async fn get(&self, user_id: &UserId) -> Result<Cart, Error> {
        self.provider.cart().get(user_id).await
    }

    async fn replace(&self, user_id: &UserId, lines: &[CartLine]) -> Result<Cart, Error> {
        self.provider.cart().replace(user_id, lines).await
    }
}

pub struct OrderRepositoryAdapter<R: RepositoryProvider> {
    provider: Arc<R>,
}

impl<R: RepositoryProvider> OrderRepositoryAdapter<R> {
    pub fn new(provider: Arc<R>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl<R: RepositoryProvider> OrderRepository for OrderRepositoryAdapter<R> {
    async fn create(&self, order: NewOrder) -> Result<Order, Error> {
        self.provider.order().create(order).await
    }

    async fn find_by_id(&self, id: &OrderId) -> Result<Option<Order>, Error> {
        self.provider.order().find_by_id(id).await
    }

    async fn list(&self) -> Result<Vec<Order>, Error> {
        self.provider.order().list().await
    }

    async fn list_for_user(&self, user_id: &UserId) -> Result<Vec<Order>, Error> {
        self.provider.order().list_for_user(user_id).await
    }
}
