use crate::{Cart, Error, UserId, storage::CartLine};
use async_trait::async_trait;

/// Repository for shopping carts
#[async_trait]
pub trait CartRepository: Send + Sync + 'static {
    /// Get a user's cart; a user who never filled their cart gets an empty one
    async fn get(&self, user_id: &UserId) -> Result<Cart, Error>;

    /// Replace the whole content of a user's cart
    async fn replace(&self, user_id: &UserId, lines: &[CartLine]) -> Result<Cart, Error>;
}
