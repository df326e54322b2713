use crate::{
    Error, Product, ProductId,
    storage::{NewProduct, ProductUpdate},
};
use async_trait::async_trait;

/// Repository for the product catalog
#[async_trait]
pub trait ProductRepository: Send + Sync + 'static {
    /// Create a new product
    ///
    /// Fails with `StorageError::Constraint` when the name is already used.
    async fn create(&self, product: NewProduct) -> Result<Product, Error>;

    /// Find a product by ID, including soft-deleted products
    async fn find_by_id(&self, id: &ProductId) -> Result<Option<Product>, Error>;

    /// List every product, including soft-deleted ones
    async fn list(&self) -> Result<Vec<Product>, Error>;

    /// Apply an update to a product that has not been deleted
    ///
    /// Returns `None` when no such product exists or it has been deleted.
    async fn update(&self, id: &ProductId, update: ProductUpdate)
    -> Result<Option<Product>, Error>;

    /// Mark a product as deleted
    ///
    /// Returns `false` when the product does not exist.
    async fn soft_delete(&self, id: &ProductId) -> Result<bool, Error>;
}
