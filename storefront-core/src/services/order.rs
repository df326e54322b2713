use crate::{
    Error, Order, OrderId, UserId,
    error::ValidationError,
    repositories::{OrderRepository, ProductRepository},
    services::ProductService,
    storage::{CartLine, NewOrder},
};
use chrono::Utc;
use std::sync::Arc;

/// Order placement and lookup
pub struct OrderService<O: OrderRepository, P: ProductRepository> {
    repository: Arc<O>,
    product_service: Arc<ProductService<P>>,
}

impl<O: OrderRepository, P: ProductRepository> OrderService<O, P> {
    pub fn new(repository: Arc<O>, product_service: Arc<ProductService<P>>) -> Self {
        Self {
            repository,
            product_service,
        }
    }

    /// Place an order for `user_id`.
    ///
    /// The total is computed from the catalog prices at the time of the call;
    /// the order and all of its lines are written together.
    pub async fn place_order(&self, user_id: &UserId, lines: &[CartLine]) -> Result<Order, Error> {
        let resolved = self.product_service.resolve_lines(lines).await?;
        if resolved.is_empty() {
            return Err(ValidationError::MissingField(
                "An order needs at least one item".to_string(),
            )
            .into());
        }

        let total_price = resolved
            .iter()
            .map(|(product, quantity)| product.price * f64::from(*quantity))
            .sum();

        let order = self
            .repository
            .create(NewOrder {
                id: OrderId::new_random(),
                user_id: user_id.clone(),
                order_date: Utc::now(),
                total_price,
                lines: resolved
                    .into_iter()
                    .map(|(product, quantity)| CartLine {
                        product: product.id,
                        quantity,
                    })
                    .collect(),
            })
            .await?;

        tracing::info!(
            order_id = %order.id,
            user_id = %user_id,
            total_price = order.total_price,
            "Placed order"
        );
        Ok(order)
    }

    pub async fn list_orders(&self) -> Result<Vec<Order>, Error> {
        self.repository.list().await
    }

    pub async fn list_orders_for_user(&self, user_id: &UserId) -> Result<Vec<Order>, Error> {
        self.repository.list_for_user(user_id).await
    }

    /// One order of `user_id`. An order owned by someone else is reported as
    /// not found.
    pub async fn get_order_for_user(
        &self,
        user_id: &UserId,
        order_id: &OrderId,
    ) -> Result<Order, Error> {
        self.repository
            .find_by_id(order_id)
            .await?
            .filter(|order| &order.user_id == user_id)
            .ok_or_else(|| Error::NotFound("Order".to_string()))
    }
}
