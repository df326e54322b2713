//! Orders
//!
//! An order freezes its total price at creation time. Its lines reference
//! products, which may later be soft-deleted from the catalog.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Product, UserId, id::prefixed_id};

prefixed_id!(
    /// A unique, stable identifier for an order
    OrderId,
    "ord"
);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub order_date: DateTime<Utc>,
    pub total_price: f64,
    pub items: Vec<OrderItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub product: Product,
    pub quantity: u32,
}
