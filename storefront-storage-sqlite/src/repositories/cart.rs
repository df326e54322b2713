use async_trait::async_trait;
use sqlx::SqlitePool;
use storefront_core::{
    Cart, CartItem, Error, UserId, repositories::CartRepository, storage::CartLine,
};

use super::product::{SqliteProductLine, joined_product_columns};
use crate::error::DatabaseResultExt;

pub struct SqliteCartRepository {
    pool: SqlitePool,
}

impl SqliteCartRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CartRepository for SqliteCartRepository {
    async fn get(&self, user_id: &UserId) -> Result<Cart, Error> {
        let rows = sqlx::query_as::<_, SqliteProductLine>(&format!(
            r#"
            SELECT {}, c.quantity
            FROM cart_items c
            JOIN products p ON p.id = c.product_id
            WHERE c.user_id = ?1
            ORDER BY c.position
            "#,
            joined_product_columns()
        ))
        .bind(user_id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_db_err("Failed to load cart")?;

        Ok(Cart {
            user_id: user_id.clone(),
            items: rows
                .into_iter()
                .map(|row| {
                    let (product, quantity) = row.into_parts();
                    CartItem { product, quantity }
                })
                .collect(),
        })
    }

    async fn replace(&self, user_id: &UserId, lines: &[CartLine]) -> Result<Cart, Error> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_db_err("Failed to begin cart transaction")?;

        sqlx::query("DELETE FROM cart_items WHERE user_id = ?1")
            .bind(user_id.as_str())
            .execute(&mut *tx)
            .await
            .map_db_err("Failed to clear cart")?;

        for (position, line) in lines.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO cart_items (user_id, product_id, quantity, position)
                VALUES (?1, ?2, ?3, ?4)
                "#,
            )
            .bind(user_id.as_str())
            .bind(line.product.as_str())
            .bind(i64::from(line.quantity))
            .bind(position as i64)
            .execute(&mut *tx)
            .await
            .map_db_err("Failed to store cart item")?;
        }

        tx.commit()
            .await
            .map_db_err("Failed to commit cart transaction")?;

        self.get(user_id).await
    }
}
