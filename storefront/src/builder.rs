//! Builder pattern for constructing Storefront instances
//!
//! This module provides a type-safe builder for creating [`Storefront`] instances
//! with compile-time validation of storage configuration.
//!
//! # Example
//!
//! ```rust,no_run
//! use storefront::{JwtConfig, StorefrontBuilder};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let storefront = StorefrontBuilder::new()
//!         .with_sqlite("sqlite://storefront.db")
//!         .await?
//!         .with_jwt(JwtConfig::new_hs256(b"secret".to_vec()))
//!         .apply_migrations(true)
//!         .build()
//!         .await?;
//!
//!     Ok(())
//! }
//! ```

use std::sync::Arc;

use chrono::Duration;
use storefront_core::repositories::RepositoryProvider;

use crate::{
    DEFAULT_SESSION_EXPIRY_SECS, JwtConfig, LoginProtectionConfig, SessionConfig, Storefront,
};

// ============================================================================
// Error Types
// ============================================================================

/// Errors that can occur when building a Storefront instance.
#[derive(Debug, thiserror::Error)]
pub enum StorefrontBuilderError {
    /// Failed to connect to storage backend
    #[error("Storage connection failed: {0}")]
    StorageConnection(String),

    /// Failed to run database migrations
    #[error("Migration failed: {0}")]
    Migration(String),

    /// Invalid configuration provided
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}

// ============================================================================
// Type-State Markers
// ============================================================================

/// Marker type indicating no storage has been configured yet.
pub struct NoStorage;

/// Marker type indicating storage has been configured.
pub struct WithStorage<R: RepositoryProvider> {
    repositories: Arc<R>,
}

// ============================================================================
// Builder Implementation
// ============================================================================

/// A type-safe builder for constructing [`Storefront`] instances.
///
/// Storage has to be configured before anything else, and a JWT signing
/// secret has to be supplied before [`build`](StorefrontBuilder::build)
/// succeeds.
pub struct StorefrontBuilder<Storage> {
    storage: Storage,
    jwt_config: Option<JwtConfig>,
    session_expiry: Duration,
    login_protection: LoginProtectionConfig,
    apply_migrations: bool,
}

impl Default for StorefrontBuilder<NoStorage> {
    fn default() -> Self {
        Self::new()
    }
}

impl StorefrontBuilder<NoStorage> {
    /// Create a new builder with default configuration.
    ///
    /// # Defaults
    ///
    /// - Session expiry: 1 hour
    /// - Login protection: 100 failures per IP per day, 10 consecutive
    ///   failures per username and IP
    /// - Apply migrations: false
    pub fn new() -> Self {
        Self {
            storage: NoStorage,
            jwt_config: None,
            session_expiry: Duration::seconds(DEFAULT_SESSION_EXPIRY_SECS),
            login_protection: LoginProtectionConfig::default(),
            apply_migrations: false,
        }
    }

    /// Use an already constructed repository provider.
    pub fn with_repositories<R: RepositoryProvider>(
        self,
        repositories: Arc<R>,
    ) -> StorefrontBuilder<WithStorage<R>> {
        StorefrontBuilder {
            storage: WithStorage { repositories },
            jwt_config: self.jwt_config,
            session_expiry: self.session_expiry,
            login_protection: self.login_protection,
            apply_migrations: self.apply_migrations,
        }
    }
}

#[cfg(feature = "sqlite")]
impl StorefrontBuilder<NoStorage> {
    /// Configure SQLite storage by connecting to the given URL.
    ///
    /// # Arguments
    ///
    /// * `url` - SQLite connection URL (e.g., "sqlite::memory:" or "sqlite://path/to/db.sqlite")
    pub async fn with_sqlite(
        self,
        url: &str,
    ) -> Result<
        StorefrontBuilder<WithStorage<storefront_storage_sqlite::SqliteRepositoryProvider>>,
        StorefrontBuilderError,
    > {
        let storage = storefront_storage_sqlite::SqliteStorage::connect(url)
            .await
            .map_err(|e| StorefrontBuilderError::StorageConnection(e.to_string()))?;

        Ok(self.with_repositories(Arc::new(storage.into_repository_provider())))
    }

    /// Configure SQLite storage with an existing connection pool.
    pub fn with_sqlite_pool(
        self,
        pool: sqlx::SqlitePool,
    ) -> StorefrontBuilder<WithStorage<storefront_storage_sqlite::SqliteRepositoryProvider>> {
        self.with_repositories(Arc::new(
            storefront_storage_sqlite::SqliteRepositoryProvider::new(pool),
        ))
    }
}

// ============================================================================
// Configuration Methods (available after storage is configured)
// ============================================================================

impl<R: RepositoryProvider> StorefrontBuilder<WithStorage<R>> {
    /// Sign session tokens with this configuration.
    pub fn with_jwt(mut self, config: JwtConfig) -> Self {
        self.jwt_config = Some(config);
        self
    }

    /// Sign session tokens with HS256 and the given secret.
    pub fn with_jwt_secret(self, secret: impl AsRef<[u8]>) -> Self {
        self.with_jwt(JwtConfig::new_hs256(secret.as_ref().to_vec()))
    }

    /// Set how long issued tokens stay valid.
    pub fn with_session_expiry(mut self, duration: Duration) -> Self {
        self.session_expiry = duration;
        self
    }

    /// Configure the two login rate limiters.
    pub fn with_login_protection(mut self, config: LoginProtectionConfig) -> Self {
        self.login_protection = config;
        self
    }

    /// Run pending migrations during [`build`](Self::build).
    pub fn apply_migrations(mut self, apply: bool) -> Self {
        self.apply_migrations = apply;
        self
    }

    pub async fn build(self) -> Result<Storefront<R>, StorefrontBuilderError> {
        let jwt_config = self.jwt_config.ok_or_else(|| {
            StorefrontBuilderError::InvalidConfiguration(
                "a JWT signing secret is required".to_string(),
            )
        })?;

        if self.session_expiry <= Duration::zero() {
            return Err(StorefrontBuilderError::InvalidConfiguration(
                "session expiry must be positive".to_string(),
            ));
        }
        if self.login_protection.ip.points == 0 || self.login_protection.username_ip.points == 0 {
            return Err(StorefrontBuilderError::InvalidConfiguration(
                "login limiter thresholds must be at least 1".to_string(),
            ));
        }
        for limiter in [&self.login_protection.ip, &self.login_protection.username_ip] {
            if limiter.duration <= Duration::zero() {
                return Err(StorefrontBuilderError::InvalidConfiguration(format!(
                    "{} window must be positive",
                    limiter.key_prefix
                )));
            }
            if limiter.block_duration < Duration::zero() {
                return Err(StorefrontBuilderError::InvalidConfiguration(format!(
                    "{} block duration must not be negative",
                    limiter.key_prefix
                )));
            }
        }

        if self.apply_migrations {
            self.storage
                .repositories
                .migrate()
                .await
                .map_err(|e| StorefrontBuilderError::Migration(e.to_string()))?;
        }

        let session_config = SessionConfig::new(jwt_config).expires_in(self.session_expiry);
        let storefront = Storefront::new(self.storage.repositories, session_config)
            .with_login_protection(self.login_protection);

        tracing::info!(
            session_expiry_secs = self.session_expiry.num_seconds(),
            "Storefront ready"
        );
        Ok(storefront)
    }
}
