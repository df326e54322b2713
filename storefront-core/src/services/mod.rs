//! Service layer for business logic
//!
//! Services wrap repositories and hold the rules of the storefront: account
//! creation, credential checks, login protection and the catalog, cart and
//! order workflows.

pub mod cart;
pub mod login;
pub mod order;
pub mod password;
pub mod product;
pub mod rate_limiter;
pub mod user;

pub use cart::CartService;
pub use login::{LoginGuard, LoginOutcome};
pub use order::OrderService;
pub use password::{CredentialCheck, PasswordService};
pub use product::ProductService;
pub use rate_limiter::{ConsumeOutcome, RateLimiter, RateLimiterStatus};
pub use user::UserService;
