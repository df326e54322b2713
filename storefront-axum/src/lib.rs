//! # Storefront Axum Integration
//!
//! HTTP routes for the [`storefront`] backend: password login, user accounts,
//! the product catalog, carts and orders.
//!
//! Every request passes through [`auth_middleware`], which resolves an
//! `Authorization: Bearer <token>` header to the signed-in [`storefront::User`].
//! Handlers that need a user take an [`AuthUser`]; a missing or invalid token
//! is answered with `401`.
//!
//! CRUD responses share one JSON envelope, [`ApiResponse`]:
//!
//! ```json
//! {
//!   "success": true,
//!   "dateTime": 1700000000000,
//!   "data": { "...": "..." },
//!   "message": "Product created"
//! }
//! ```
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use std::{net::SocketAddr, sync::Arc};
//! use storefront::StorefrontBuilder;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let storefront = StorefrontBuilder::new()
//!         .with_sqlite("sqlite://storefront.db")
//!         .await?
//!         .with_jwt_secret("change-me")
//!         .apply_migrations(true)
//!         .build()
//!         .await?;
//!
//!     let app = storefront_axum::create_router(Arc::new(storefront));
//!
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:5500").await?;
//!     // Login rate limiting keys on the client address
//!     axum::serve(
//!         listener,
//!         app.into_make_service_with_connect_info::<SocketAddr>(),
//!     )
//!     .await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Routes
//!
//! | Method             | Path                        | Access                |
//! |--------------------|-----------------------------|-----------------------|
//! | `GET`              | `/health`                   | public                |
//! | `POST`             | `/auth/login`               | public, rate limited  |
//! | `GET`              | `/auth/me`                  | signed in             |
//! | `GET`              | `/users`                    | admin                 |
//! | `POST`             | `/users`                    | public; admin for `admin: true` |
//! | `GET`, `DELETE`    | `/users/{username}`         | owner or admin        |
//! | `GET`              | `/products`                 | public                |
//! | `POST`             | `/products`                 | admin                 |
//! | `GET`              | `/products/{id}`            | public                |
//! | `PATCH`, `DELETE`  | `/products/{id}`            | admin                 |
//! | `GET`              | `/cart/{username}`          | owner or admin        |
//! | `POST`             | `/cart/{username}/products` | owner or admin        |
//! | `GET`              | `/orders`                   | admin                 |
//! | `GET`, `POST`      | `/orders/{username}`        | owner or admin        |
//! | `GET`              | `/orders/{username}/{id}`   | owner or admin        |

mod error;
mod extractors;
mod middleware;
mod routes;
mod types;

pub use error::{ApiError, Result, WRONG_CREDENTIALS};
pub use extractors::{ApiJson, AuthUser, OptionalAuthUser};
pub use middleware::{AppState, auth_middleware};
pub use routes::create_router;
pub use types::{
    ApiResponse, ConnectionInfo, CreateProductRequest, CreateUserRequest, HealthResponse,
    LineRequest, LoginRequest, LoginResponse, PlaceOrderRequest, UpdateProductRequest,
};
