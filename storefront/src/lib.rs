//! # Storefront
//!
//! A small e-commerce backend: user accounts, a product catalog, per-user
//! shopping carts and orders, with password logins protected against brute
//! force by two persistent rate limiters.
//!
//! [`Storefront`] wires the services of `storefront-core` to a storage backend
//! and enforces who may do what. HTTP routes live in `storefront-axum`.
//!
//! ## Example
//!
//! ```rust,no_run
//! use storefront::{JwtConfig, LoginOutcome, StorefrontBuilder};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let storefront = StorefrontBuilder::new()
//!         .with_sqlite("sqlite::memory:")
//!         .await?
//!         .with_jwt(JwtConfig::new_hs256(b"change-me".to_vec()))
//!         .apply_migrations(true)
//!         .build()
//!         .await?;
//!
//!     storefront
//!         .register_user(None, "alice", "alice@example.com", "correct horse", false)
//!         .await?;
//!
//!     match storefront.login("alice", "correct horse", "127.0.0.1").await? {
//!         LoginOutcome::Accepted { session, .. } => println!("token: {}", session.token),
//!         LoginOutcome::Rejected => println!("username or password is wrong"),
//!         LoginOutcome::Throttled { retry_after_seconds } => {
//!             println!("retry in {retry_after_seconds}s")
//!         }
//!     }
//!
//!     Ok(())
//! }
//! ```
use std::sync::Arc;

use chrono::Duration;
use storefront_core::{
    error::{AuthError, SessionError},
    repositories::{
        CartRepositoryAdapter, OrderRepositoryAdapter, PasswordRepositoryAdapter,
        ProductRepositoryAdapter, RateLimiterRepositoryAdapter, RepositoryProvider,
        UserRepositoryAdapter,
    },
    services::{CartService, OrderService, PasswordService, ProductService, RateLimiter},
};
use tokio::{sync::watch, task::JoinHandle};

pub mod builder;

pub use builder::{NoStorage, StorefrontBuilder, StorefrontBuilderError, WithStorage};

/// Re-export core types from storefront_core
pub use storefront_core::{
    Cart, CartItem, Error, JwtConfig, LoginGuard, LoginOutcome, LoginProtectionConfig, Order,
    OrderId, OrderItem, Product, ProductId, RateLimiterConfig, Session, SessionProvider,
    SessionToken, User, UserId,
    storage::{
        CartLine, IP_LIMITER_WINDOW_DAY_SECS, IP_LIMITER_WINDOW_HOUR_SECS,
        MAX_CONSECUTIVE_FAILS_BY_USERNAME_AND_IP, MAX_WRONG_ATTEMPTS_BY_IP_PER_DAY, ProductUpdate,
        USERNAME_IP_LIMITER_BLOCK_SECS, USERNAME_IP_LIMITER_WINDOW_SECS,
    },
};

/// Re-export storage backends
#[cfg(feature = "sqlite")]
pub use storefront_storage_sqlite::{SqliteRepositoryProvider, SqliteStorage};

/// Default lifetime of an issued token.
pub const DEFAULT_SESSION_EXPIRY_SECS: i64 = 60 * 60;

/// Token signing and lifetime.
///
/// # Example
///
/// ```rust
/// use chrono::Duration;
/// use storefront::{JwtConfig, SessionConfig};
///
/// let config = SessionConfig::new(JwtConfig::new_hs256(b"secret".to_vec()))
///     .expires_in(Duration::minutes(30));
/// assert_eq!(config.expires_in, Duration::minutes(30));
/// ```
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// The duration until an issued token expires
    pub expires_in: Duration,
    pub jwt: JwtConfig,
}

impl SessionConfig {
    pub fn new(jwt: JwtConfig) -> Self {
        Self {
            expires_in: Duration::seconds(DEFAULT_SESSION_EXPIRY_SECS),
            jwt,
        }
    }

    /// Set the session expiration time
    pub fn expires_in(mut self, duration: Duration) -> Self {
        self.expires_in = duration;
        self
    }
}

type Users<R> = UserRepositoryAdapter<R>;
type Passwords<R> = PasswordRepositoryAdapter<R>;
type Limits<R> = RateLimiterRepositoryAdapter<R>;
type Products<R> = ProductRepositoryAdapter<R>;

/// The login guard as wired by [`Storefront`].
pub type StorefrontLoginGuard<R> = LoginGuard<Users<R>, Passwords<R>, Limits<R>>;

/// The storefront: services over one repository provider.
///
/// Operations that act on behalf of a signed-in user take that user as
/// `caller` and check ownership or the admin role before touching storage.
/// Refusals are `AuthError::Forbidden`.
pub struct Storefront<R: RepositoryProvider> {
    repositories: Arc<R>,
    password_service: Arc<PasswordService<Users<R>, Passwords<R>>>,
    product_service: Arc<ProductService<Products<R>>>,
    cart_service: CartService<CartRepositoryAdapter<R>, Products<R>>,
    order_service: OrderService<OrderRepositoryAdapter<R>, Products<R>>,
    session_provider: Arc<dyn SessionProvider>,
    login_guard: StorefrontLoginGuard<R>,
    session_config: SessionConfig,
    login_protection: LoginProtectionConfig,
}

impl<R: RepositoryProvider> Storefront<R> {
    /// Create a storefront with the default login protection
    pub fn new(repositories: Arc<R>, session_config: SessionConfig) -> Self {
        let password_service = Arc::new(PasswordService::new(
            Arc::new(UserRepositoryAdapter::new(repositories.clone())),
            Arc::new(PasswordRepositoryAdapter::new(repositories.clone())),
        ));
        let product_service = Arc::new(ProductService::new(Arc::new(
            ProductRepositoryAdapter::new(repositories.clone()),
        )));
        let session_provider: Arc<dyn SessionProvider> = Arc::new(
            storefront_core::JwtSessionProvider::new(session_config.jwt.clone()),
        );
        let login_protection = LoginProtectionConfig::default();

        Self {
            cart_service: CartService::new(
                Arc::new(CartRepositoryAdapter::new(repositories.clone())),
                product_service.clone(),
            ),
            order_service: OrderService::new(
                Arc::new(OrderRepositoryAdapter::new(repositories.clone())),
                product_service.clone(),
            ),
            login_guard: Self::build_login_guard(
                &repositories,
                &password_service,
                &session_provider,
                &session_config,
                &login_protection,
            ),
            repositories,
            password_service,
            product_service,
            session_provider,
            session_config,
            login_protection,
        }
    }

    /// Replace the thresholds and windows of both login limiters
    pub fn with_login_protection(mut self, config: LoginProtectionConfig) -> Self {
        self.login_guard = Self::build_login_guard(
            &self.repositories,
            &self.password_service,
            &self.session_provider,
            &self.session_config,
            &config,
        );
        self.login_protection = config;
        self
    }

    fn build_login_guard(
        repositories: &Arc<R>,
        password_service: &Arc<PasswordService<Users<R>, Passwords<R>>>,
        session_provider: &Arc<dyn SessionProvider>,
        session_config: &SessionConfig,
        protection: &LoginProtectionConfig,
    ) -> StorefrontLoginGuard<R> {
        let limits = Arc::new(RateLimiterRepositoryAdapter::new(repositories.clone()));
        LoginGuard::new(
            password_service.clone(),
            session_provider.clone(),
            session_config.expires_in,
            RateLimiter::new(limits.clone(), protection.ip.clone()),
            RateLimiter::new(limits, protection.username_ip.clone()),
        )
    }

    pub fn session_config(&self) -> &SessionConfig {
        &self.session_config
    }

    pub fn login_protection(&self) -> &LoginProtectionConfig {
        &self.login_protection
    }

    pub fn login_guard(&self) -> &StorefrontLoginGuard<R> {
        &self.login_guard
    }

    /// Run migrations for all repositories
    pub async fn migrate(&self) -> Result<(), Error> {
        self.repositories.migrate().await
    }

    /// Health check for all repositories
    pub async fn health_check(&self) -> Result<(), Error> {
        self.repositories.health_check().await
    }

    /// Start deleting lapsed rate limiter records every `interval` until
    /// `shutdown` changes.
    ///
    /// Both limiters share one table, so a single task covers them.
    pub fn start_cleanup_task(
        &self,
        interval: std::time::Duration,
        shutdown: watch::Receiver<bool>,
    ) -> JoinHandle<()> {
        self.login_guard
            .ip_limiter()
            .start_cleanup_task(interval, shutdown)
    }

    // ------------------------------------------------------------------
    // Authentication
    // ------------------------------------------------------------------

    /// Attempt a password login from `client_ip`.
    pub async fn login(
        &self,
        username: &str,
        password: &str,
        client_ip: &str,
    ) -> Result<LoginOutcome, Error> {
        self.login_guard
            .attempt_login(username, password, client_ip)
            .await
    }

    /// Resolve a bearer token to the user it was issued to.
    ///
    /// A token whose user has since been deleted is reported as invalid.
    pub async fn authenticate(&self, token: &SessionToken) -> Result<User, Error> {
        let session = self.session_provider.get_session(token).await?;

        self.password_service
            .user_service()
            .get_user(&session.user_id)
            .await?
            .ok_or_else(|| {
                tracing::debug!(user_id = %session.user_id, "Token refers to a deleted user");
                SessionError::InvalidToken("User no longer exists".to_string()).into()
            })
    }

    // ------------------------------------------------------------------
    // Users
    // ------------------------------------------------------------------

    /// Register a user with a password.
    ///
    /// Anyone may register an ordinary account; only an admin `caller` may
    /// create another admin.
    pub async fn register_user(
        &self,
        caller: Option<&User>,
        username: &str,
        email: &str,
        password: &str,
        admin: bool,
    ) -> Result<User, Error> {
        let caller_is_admin = caller.is_some_and(|caller| caller.admin);
        if admin && !caller_is_admin {
            tracing::warn!(
                caller = caller.map(|c| c.username.as_str()),
                username = %username,
                "Refused to create admin account"
            );
            return Err(AuthError::Forbidden.into());
        }

        self.password_service
            .register_user(username, email, password, admin)
            .await
    }

    /// Create an admin account with no admin caller, for bootstrapping an
    /// empty installation from the command line.
    pub async fn create_admin(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<User, Error> {
        self.password_service
            .register_user(username, email, password, true)
            .await
    }

    /// Set a password without knowing the old one (admin tooling).
    pub async fn set_password(&self, username: &str, password: &str) -> Result<(), Error> {
        let user = self
            .password_service
            .user_service()
            .require_user_by_username(username)
            .await?;
        self.password_service.set_password(&user.id, password).await
    }

    pub async fn list_users(&self, caller: &User) -> Result<Vec<User>, Error> {
        caller.ensure_admin()?;
        self.password_service.user_service().list_users().await
    }

    pub async fn get_user(&self, caller: &User, username: &str) -> Result<User, Error> {
        caller.ensure_can_act_for(username)?;
        self.password_service
            .user_service()
            .require_user_by_username(username)
            .await
    }

    /// Delete a user together with their cart and orders.
    pub async fn delete_user(&self, caller: &User, username: &str) -> Result<User, Error> {
        caller.ensure_can_act_for(username)?;
        self.password_service
            .user_service()
            .delete_user(username)
            .await
    }

    // ------------------------------------------------------------------
    // Products
    // ------------------------------------------------------------------

    pub async fn list_products(&self) -> Result<Vec<Product>, Error> {
        self.product_service.list_products().await
    }

    pub async fn get_product(&self, id: &ProductId) -> Result<Product, Error> {
        self.product_service.get_product(id).await
    }

    pub async fn create_product(
        &self,
        caller: &User,
        name: &str,
        description: &str,
        price: f64,
        image: &str,
    ) -> Result<Product, Error> {
        caller.ensure_admin()?;
        self.product_service
            .create_product(name, description, price, image)
            .await
    }

    pub async fn update_product(
        &self,
        caller: &User,
        id: &ProductId,
        update: ProductUpdate,
    ) -> Result<Product, Error> {
        caller.ensure_admin()?;
        self.product_service.update_product(id, update).await
    }

    pub async fn delete_product(&self, caller: &User, id: &ProductId) -> Result<(), Error> {
        caller.ensure_admin()?;
        self.product_service.delete_product(id).await
    }

    // ------------------------------------------------------------------
    // Carts and orders
    // ------------------------------------------------------------------

    /// Check that `caller` may act for `username` and look the owner up.
    async fn owner(&self, caller: &User, username: &str) -> Result<User, Error> {
        caller.ensure_can_act_for(username)?;
        if caller.username == username {
            return Ok(caller.clone());
        }
        self.password_service
            .user_service()
            .require_user_by_username(username)
            .await
    }

    pub async fn get_cart(&self, caller: &User, username: &str) -> Result<Cart, Error> {
        let owner = self.owner(caller, username).await?;
        self.cart_service.get_cart(&owner.id).await
    }

    pub async fn replace_cart(
        &self,
        caller: &User,
        username: &str,
        lines: &[CartLine],
    ) -> Result<Cart, Error> {
        let owner = self.owner(caller, username).await?;
        self.cart_service.replace_cart(&owner.id, lines).await
    }

    pub async fn list_orders(&self, caller: &User) -> Result<Vec<Order>, Error> {
        caller.ensure_admin()?;
        self.order_service.list_orders().await
    }

    pub async fn list_orders_for_user(
        &self,
        caller: &User,
        username: &str,
    ) -> Result<Vec<Order>, Error> {
        let owner = self.owner(caller, username).await?;
        self.order_service.list_orders_for_user(&owner.id).await
    }

    pub async fn get_order(
        &self,
        caller: &User,
        username: &str,
        order_id: &OrderId,
    ) -> Result<Order, Error> {
        let owner = self.owner(caller, username).await?;
        self.order_service
            .get_order_for_user(&owner.id, order_id)
            .await
    }

    pub async fn place_order(
        &self,
        caller: &User,
        username: &str,
        lines: &[CartLine],
    ) -> Result<Order, Error> {
        let owner = self.owner(caller, username).await?;
        self.order_service.place_order(&owner.id, lines).await
    }
}
