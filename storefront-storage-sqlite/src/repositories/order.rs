use std::collections::HashMap;

use async_trait::async_trait;
use chrono::DateTime;
use sqlx::SqlitePool;
use storefront_core::{
    Error, Order, OrderId, OrderItem, UserId, repositories::OrderRepository, storage::NewOrder,
};

use super::product::{SqliteProductLine, joined_product_columns};
use crate::error::DatabaseResultExt;

#[derive(Debug, sqlx::FromRow)]
struct SqliteOrder {
    id: String,
    user_id: String,
    order_date: i64,
    total_price: f64,
}

impl SqliteOrder {
    fn into_order(self, items: Vec<OrderItem>) -> Order {
        Order {
            id: OrderId::new(&self.id),
            user_id: UserId::new(&self.user_id),
            order_date: DateTime::from_timestamp_millis(self.order_date).unwrap_or_default(),
            total_price: self.total_price,
            items,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct SqliteOrderLine {
    order_id: String,
    #[sqlx(flatten)]
    line: SqliteProductLine,
}

pub struct SqliteOrderRepository {
    pool: SqlitePool,
}

impl SqliteOrderRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Attach the items of each order, preserving line order.
    ///
    /// `filter` restricts the line query the same way the order query was
    /// restricted; it is appended to the `WHERE` clause with `?1` bound to
    /// `value`.
    async fn with_items(
        &self,
        orders: Vec<SqliteOrder>,
        filter: &str,
        value: Option<&str>,
    ) -> Result<Vec<Order>, Error> {
        if orders.is_empty() {
            return Ok(Vec::new());
        }

        let sql = format!(
            r#"
            SELECT oi.order_id, {}, oi.quantity
            FROM order_items oi
            JOIN orders o ON o.id = oi.order_id
            JOIN products p ON p.id = oi.product_id
            WHERE {filter}
            ORDER BY oi.order_id, oi.position
            "#,
            joined_product_columns()
        );
        let mut query = sqlx::query_as::<_, SqliteOrderLine>(&sql);
        if let Some(value) = value {
            query = query.bind(value);
        }
        let lines = query
            .fetch_all(&self.pool)
            .await
            .map_db_err("Failed to load order items")?;

        let mut items: HashMap<String, Vec<OrderItem>> = HashMap::new();
        for row in lines {
            let (product, quantity) = row.line.into_parts();
            items
                .entry(row.order_id)
                .or_default()
                .push(OrderItem { product, quantity });
        }

        Ok(orders
            .into_iter()
            .map(|order| {
                let order_items = items.remove(&order.id).unwrap_or_default();
                order.into_order(order_items)
            })
            .collect())
    }
}

#[async_trait]
impl OrderRepository for SqliteOrderRepository {
    async fn create(&self, order: NewOrder) -> Result<Order, Error> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_db_err("Failed to begin order transaction")?;

        sqlx::query(
            "INSERT INTO orders (id, user_id, order_date, total_price) VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(order.id.as_str())
        .bind(order.user_id.as_str())
        .bind(order.order_date.timestamp_millis())
        .bind(order.total_price)
        .execute(&mut *tx)
        .await
        .map_db_err("Failed to create order")?;

        for (position, line) in order.lines.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO order_items (order_id, product_id, quantity, position)
                VALUES (?1, ?2, ?3, ?4)
                "#,
            )
            .bind(order.id.as_str())
            .bind(line.product.as_str())
            .bind(i64::from(line.quantity))
            .bind(position as i64)
            .execute(&mut *tx)
            .await
            .map_db_err("Failed to create order item")?;
        }

        tx.commit()
            .await
            .map_db_err("Failed to commit order transaction")?;

        self.find_by_id(&order.id)
            .await?
            .ok_or_else(|| Error::NotFound("Order".to_string()))
    }

    async fn find_by_id(&self, id: &OrderId) -> Result<Option<Order>, Error> {
        let order = sqlx::query_as::<_, SqliteOrder>(
            "SELECT id, user_id, order_date, total_price FROM orders WHERE id = ?1",
        )
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_db_err("Failed to find order")?;

        let Some(order) = order else {
            return Ok(None);
        };

        let mut orders = self
            .with_items(vec![order], "o.id = ?1", Some(id.as_str()))
            .await?;
        Ok(orders.pop())
    }

    async fn list(&self) -> Result<Vec<Order>, Error> {
        let orders = sqlx::query_as::<_, SqliteOrder>(
            "SELECT id, user_id, order_date, total_price FROM orders ORDER BY order_date, id",
        )
        .fetch_all(&self.pool)
        .await
        .map_db_err("Failed to list orders")?;

        self.with_items(orders, "1 = 1", None).await
    }

    async fn list_for_user(&self, user_id: &UserId) -> Result<Vec<Order>, Error> {
        let orders = sqlx::query_as::<_, SqliteOrder>(
            r#"
            SELECT id, user_id, order_date, total_price
            FROM orders
            WHERE user_id = ?1
            ORDER BY order_date, id
            "#,
        )
        .bind(user_id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_db_err("Failed to list orders")?;

        self.with_items(orders, "o.user_id = ?1", Some(user_id.as_str()))
            .await
    }
}
