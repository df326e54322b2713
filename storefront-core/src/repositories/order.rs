use crate::{Error, Order, OrderId, UserId, storage::NewOrder};
use async_trait::async_trait;

/// Repository for orders
#[async_trait]
pub trait OrderRepository: Send + Sync + 'static {
    /// Create an order together with all of its lines
    async fn create(&self, order: NewOrder) -> Result<Order, Error>;

    /// Find an order by ID
    async fn find_by_id(&self, id: &OrderId) -> Result<Option<Order>, Error>;

    /// List every order, most recent first
    async fn list(&self) -> Result<Vec<Order>, Error>;

    /// List the orders placed by a user, most recent first
    async fn list_for_user(&self, user_id: &UserId) -> Result<Vec<Order>, Error>;
}
