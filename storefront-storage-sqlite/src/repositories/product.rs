use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use storefront_core::{
    Error, Product, ProductId,
    repositories::ProductRepository,
    storage::{NewProduct, ProductUpdate},
};

use crate::error::DatabaseResultExt;

pub(crate) const PRODUCT_COLUMNS: &str =
    "id, name, description, price, image, deleted, created_at, updated_at";

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct SqliteProduct {
    id: String,
    name: String,
    description: String,
    price: f64,
    image: String,
    deleted: bool,
    created_at: i64,
    updated_at: i64,
}

impl From<SqliteProduct> for Product {
    fn from(row: SqliteProduct) -> Self {
        Product {
            id: ProductId::new(&row.id),
            name: row.name,
            description: row.description,
            price: row.price,
            image: row.image,
            deleted: row.deleted,
            created_at: DateTime::from_timestamp(row.created_at, 0).unwrap_or_default(),
            updated_at: DateTime::from_timestamp(row.updated_at, 0).unwrap_or_default(),
        }
    }
}

/// A product joined with the quantity of a cart or order line.
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct SqliteProductLine {
    #[sqlx(flatten)]
    pub product: SqliteProduct,
    pub quantity: i64,
}

impl SqliteProductLine {
    pub fn into_parts(self) -> (Product, u32) {
        (
            self.product.into(),
            u32::try_from(self.quantity).unwrap_or_default(),
        )
    }
}

/// `PRODUCT_COLUMNS` qualified with the `p` alias used in joins.
pub(crate) fn joined_product_columns() -> String {
    PRODUCT_COLUMNS
        .split(", ")
        .map(|column| format!("p.{column}"))
        .collect::<Vec<_>>()
        .join(", ")
}

pub struct SqliteProductRepository {
    pool: SqlitePool,
}

impl SqliteProductRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProductRepository for SqliteProductRepository {
    async fn create(&self, product: NewProduct) -> Result<Product, Error> {
        let now = Utc::now().timestamp();

        let row = sqlx::query_as::<_, SqliteProduct>(&format!(
            r#"
            INSERT INTO products
                (id, name, description, price, image, deleted, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, 0, ?6, ?6)
            RETURNING {PRODUCT_COLUMNS}
            "#
        ))
        .bind(product.id.as_str())
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price)
        .bind(&product.image)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_db_err("Failed to create product")?;

        Ok(row.into())
    }

    async fn find_by_id(&self, id: &ProductId) -> Result<Option<Product>, Error> {
        let row = sqlx::query_as::<_, SqliteProduct>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?1"
        ))
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_db_err("Failed to find product")?;

        Ok(row.map(Into::into))
    }

    async fn list(&self) -> Result<Vec<Product>, Error> {
        let rows = sqlx::query_as::<_, SqliteProduct>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products ORDER BY created_at, name"
        ))
        .fetch_all(&self.pool)
        .await
        .map_db_err("Failed to list products")?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn update(
        &self,
        id: &ProductId,
        update: ProductUpdate,
    ) -> Result<Option<Product>, Error> {
        let row = sqlx::query_as::<_, SqliteProduct>(&format!(
            r#"
            UPDATE products SET
                name = COALESCE(?2, name),
                description = COALESCE(?3, description),
                price = COALESCE(?4, price),
                image = COALESCE(?5, image),
                updated_at = ?6
            WHERE id = ?1 AND deleted = 0
            RETURNING {PRODUCT_COLUMNS}
            "#
        ))
        .bind(id.as_str())
        .bind(update.name)
        .bind(update.description)
        .bind(update.price)
        .bind(update.image)
        .bind(Utc::now().timestamp())
        .fetch_optional(&self.pool)
        .await
        .map_db_err("Failed to update product")?;

        Ok(row.map(Into::into))
    }

    async fn soft_delete(&self, id: &ProductId) -> Result<bool, Error> {
        let result = sqlx::query("UPDATE products SET deleted = 1, updated_at = ?2 WHERE id = ?1")
            .bind(id.as_str())
            .bind(Utc::now().timestamp())
            .execute(&self.pool)
            .await
            .map_db_err("Failed to delete product")?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::setup_test_db;
    use storefront_core::error::StorageError;

    fn new_product(name: &str, price: f64) -> NewProduct {
        NewProduct {
            id: ProductId::new_random(),
            name: name.to_string(),
            description: format!("A {name}"),
            price,
            image: format!("https://example.com/{name}.png"),
        }
    }

    #[tokio::test]
    async fn test_create_and_find_product() {
        let repo = SqliteProductRepository::new(setup_test_db().await);

        let product = repo.create(new_product("mug", 5.5)).await.unwrap();
        assert_eq!(product.name, "mug");
        assert_eq!(product.price, 5.5);
        assert!(!product.deleted);

        let found = repo.find_by_id(&product.id).await.unwrap().unwrap();
        assert_eq!(found, product);
        assert!(
            repo.find_by_id(&ProductId::new_random())
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_duplicate_name_is_constraint_violation() {
        let repo = SqliteProductRepository::new(setup_test_db().await);
        repo.create(new_product("mug", 5.0)).await.unwrap();

        let result = repo.create(new_product("mug", 6.0)).await;
        assert!(matches!(
            result,
            Err(Error::Storage(StorageError::Constraint(_)))
        ));
    }

    #[tokio::test]
    async fn test_partial_update() {
        let repo = SqliteProductRepository::new(setup_test_db().await);
        let product = repo.create(new_product("mug", 5.0)).await.unwrap();

        let updated = repo
            .update(
                &product.id,
                ProductUpdate {
                    price: Some(7.25),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
            .unwrap();

        assert_eq!(updated.price, 7.25);
        assert_eq!(updated.name, "mug");
        assert_eq!(updated.description, product.description);

        assert!(
            repo.update(&ProductId::new_random(), ProductUpdate::default())
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_soft_delete_keeps_product_readable() {
        let repo = SqliteProductRepository::new(setup_test_db().await);
        let product = repo.create(new_product("mug", 5.0)).await.unwrap();

        assert!(repo.soft_delete(&product.id).await.unwrap());
        assert!(!repo.soft_delete(&ProductId::new_random()).await.unwrap());

        let found = repo.find_by_id(&product.id).await.unwrap().unwrap();
        assert!(found.deleted);
        assert_eq!(repo.list().await.unwrap().len(), 1);

        // Deleted products can no longer be edited
        let update = ProductUpdate {
            name: Some("cup".to_string()),
            ..Default::default()
        };
        assert!(repo.update(&product.id, update).await.unwrap().is_none());
    }
}
