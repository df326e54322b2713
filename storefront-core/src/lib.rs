//! Core functionality for the storefront backend
//!
//! This crate holds the domain types ([`User`], [`Product`], [`Cart`],
//! [`Order`]), the repository traits storage backends implement, and the
//! services built on top of them.
//!
//! The part with real design content is login protection: [`LoginGuard`]
//! consults two persistent [`RateLimiter`]s, one keyed by client IP and one
//! keyed by `username_ip`, before a password is ever checked. See
//! [`services::login`] for the exact rules.
//!
//! Storage is abstracted by [`repositories::RepositoryProvider`]; the SQLite
//! implementation lives in `storefront-storage-sqlite`.
pub mod cart;
pub mod error;
pub mod id;
pub mod order;
pub mod product;
pub mod repositories;
pub mod services;
pub mod session;
pub mod storage;
pub mod user;
pub mod validation;

#[cfg(test)]
pub(crate) mod test_support;

pub use cart::{Cart, CartItem};
pub use error::Error;
pub use order::{Order, OrderId, OrderItem};
pub use product::{Product, ProductId};
pub use services::{
    CartService, ConsumeOutcome, CredentialCheck, LoginGuard, LoginOutcome, OrderService,
    PasswordService, ProductService, RateLimiter, RateLimiterStatus, UserService,
};
pub use session::{JwtClaims, JwtConfig, JwtSessionProvider, Session, SessionProvider, SessionToken};
pub use storage::{LoginProtectionConfig, RateLimiterConfig};
pub use user::{User, UserId};
