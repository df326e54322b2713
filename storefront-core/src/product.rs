//! Catalog products
//!
//! Products are never removed from storage: deleting one sets `deleted`, so
//! existing orders keep resolving their lines.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::id::prefixed_id;

prefixed_id!(
    /// A unique, stable identifier for a catalog product
    ProductId,
    "prd"
);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub description: String,
    pub price: f64,
    pub image: String,
    pub deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Whether the product can still be put in carts and orders.
    pub fn is_available(&self) -> bool {
        !self.deleted
    }
}
