use crate::{
    Error, Product, ProductId,
    error::ValidationError,
    repositories::ProductRepository,
    storage::{CartLine, NewProduct, ProductUpdate},
    validation::{validate_image_url, validate_price, validate_product_name},
};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Catalog management
pub struct ProductService<R: ProductRepository> {
    repository: Arc<R>,
}

impl<R: ProductRepository> ProductService<R> {
    pub fn new(repository: Arc<R>) -> Self {
        Self { repository }
    }

    /// Add a product to the catalog
    ///
    /// Product names are unique; the repository reports a clash as
    /// `StorageError::Constraint`.
    pub async fn create_product(
        &self,
        name: &str,
        description: &str,
        price: f64,
        image: &str,
    ) -> Result<Product, Error> {
        validate_product_name(name)?;
        validate_price(price)?;
        validate_image_url(image)?;

        let product = self
            .repository
            .create(NewProduct {
                id: ProductId::new_random(),
                name: name.trim().to_string(),
                description: description.to_string(),
                price,
                image: image.to_string(),
            })
            .await?;

        tracing::info!(product_id = %product.id, name = %product.name, "Created product");
        Ok(product)
    }

    pub async fn get_product(&self, id: &ProductId) -> Result<Product, Error> {
        self.repository
            .find_by_id(id)
            .await?
            .ok_or_else(|| Error::NotFound("Product".to_string()))
    }

    /// Every product, soft-deleted ones included
    pub async fn list_products(&self) -> Result<Vec<Product>, Error> {
        self.repository.list().await
    }

    /// Edit the given fields of a product that has not been deleted
    pub async fn update_product(
        &self,
        id: &ProductId,
        mut update: ProductUpdate,
    ) -> Result<Product, Error> {
        if update.is_empty() {
            return Err(ValidationError::MissingField(
                "At least one field is required".to_string(),
            )
            .into());
        }

        if let Some(name) = update.name.as_mut() {
            validate_product_name(name)?;
            *name = name.trim().to_string();
        }
        if let Some(price) = update.price {
            validate_price(price)?;
        }
        if let Some(image) = &update.image {
            validate_image_url(image)?;
        }

        self.repository
            .update(id, update)
            .await?
            .ok_or_else(|| Error::NotFound("Product".to_string()))
    }

    /// Mark a product as deleted. It stays readable but can no longer be
    /// edited, added to a cart or ordered.
    pub async fn delete_product(&self, id: &ProductId) -> Result<(), Error> {
        if self.repository.soft_delete(id).await? {
            tracing::info!(product_id = %id, "Soft deleted product");
            Ok(())
        } else {
            Err(Error::NotFound("Product".to_string()))
        }
    }

    /// Resolve cart or order lines against the catalog.
    ///
    /// Lines with a zero quantity are dropped and repeated products are merged.
    /// Every remaining product must exist and must not be deleted.
    pub async fn resolve_lines(&self, lines: &[CartLine]) -> Result<Vec<(Product, u32)>, Error> {
        let mut merged: BTreeMap<ProductId, u32> = BTreeMap::new();
        for line in lines.iter().filter(|line| line.quantity > 0) {
            let quantity = merged.entry(line.product.clone()).or_default();
            *quantity = quantity.saturating_add(line.quantity);
        }

        let mut resolved = Vec::with_capacity(merged.len());
        for (id, quantity) in merged {
            let product = self
                .repository
                .find_by_id(&id)
                .await?
                .ok_or_else(|| Error::NotFound(format!("Product {id}")))?;

            if !product.is_available() {
                return Err(ValidationError::InvalidField(format!(
                    "Product {id} is no longer available"
                ))
                .into());
            }

            resolved.push((product, quantity));
        }

        Ok(resolved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::MockProductRepository;

    fn service() -> ProductService<MockProductRepository> {
        ProductService::new(Arc::new(MockProductRepository::default()))
    }

    async fn mug(service: &ProductService<MockProductRepository>) -> Product {
        service
            .create_product("Mug", "A mug", 9.5, "https://cdn.example.com/mug.png")
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_create_and_get_product() {
        let service = service();
        let product = mug(&service).await;

        assert!(product.id.as_str().starts_with("prd_"));
        assert!(!product.deleted);
        let found = service.get_product(&product.id).await.unwrap();
        assert_eq!(found.name, "Mug");
    }

    #[tokio::test]
    async fn test_create_product_validates_fields() {
        let service = service();

        assert!(
            service
                .create_product("", "d", 1.0, "https://example.com/a.png")
                .await
                .is_err()
        );
        assert!(
            service
                .create_product("Mug", "d", -1.0, "https://example.com/a.png")
                .await
                .is_err()
        );
        assert!(
            service
                .create_product("Mug", "d", 1.0, "not a url")
                .await
                .is_err()
        );
    }

    #[tokio::test]
    async fn test_update_only_applies_given_fields() {
        let service = service();
        let product = mug(&service).await;

        let updated = service
            .update_product(
                &product.id,
                ProductUpdate {
                    price: Some(12.0),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.price, 12.0);
        assert_eq!(updated.name, "Mug");
    }

    #[tokio::test]
    async fn test_update_requires_a_field() {
        let service = service();
        let product = mug(&service).await;

        let result = service
            .update_product(&product.id, ProductUpdate::default())
            .await;
        assert!(matches!(
            result,
            Err(Error::Validation(ValidationError::MissingField(_)))
        ));
    }

    #[tokio::test]
    async fn test_deleted_product_cannot_be_updated() {
        let service = service();
        let product = mug(&service).await;

        service.delete_product(&product.id).await.unwrap();
        let read = service.get_product(&product.id).await.unwrap();
        assert!(read.deleted);

        let result = service
            .update_product(
                &product.id,
                ProductUpdate {
                    price: Some(1.0),
                    ..Default::default()
                },
            )
            .await;
        assert!(matches!(result, Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn test_delete_unknown_product() {
        let service = service();
        let result = service.delete_product(&ProductId::new_random()).await;
        assert!(matches!(result, Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn test_resolve_lines_merges_and_drops_zero() {
        let service = service();
        let product = mug(&service).await;
        let other = service
            .create_product("Plate", "A plate", 4.0, "https://cdn.example.com/plate.png")
            .await
            .unwrap();

        let lines = vec![
            CartLine {
                product: product.id.clone(),
                quantity: 1,
            },
            CartLine {
                product: other.id.clone(),
                quantity: 0,
            },
            CartLine {
                product: product.id.clone(),
                quantity: 2,
            },
        ];

        let resolved = service.resolve_lines(&lines).await.unwrap();
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].0.id, product.id);
        assert_eq!(resolved[0].1, 3);
    }

    #[tokio::test]
    async fn test_resolve_lines_rejects_missing_and_deleted() {
        let service = service();
        let product = mug(&service).await;

        let missing = service
            .resolve_lines(&[CartLine {
                product: ProductId::new_random(),
                quantity: 1,
            }])
            .await;
        assert!(matches!(missing, Err(Error::NotFound(_))));

        service.delete_product(&product.id).await.unwrap();
        let deleted = service
            .resolve_lines(&[CartLine {
                product: product.id.clone(),
                quantity: 1,
            }])
            .await;
        assert!(matches!(
            deleted,
            Err(Error::Validation(ValidationError::InvalidField(_)))
        ));
    }
}
