use crate::{
    Cart, Error, UserId,
    repositories::{CartRepository, ProductRepository},
    services::ProductService,
    storage::CartLine,
};
use std::sync::Arc;

/// Shopping carts, one per user, created on first write
pub struct CartService<C: CartRepository, P: ProductRepository> {
    repository: Arc<C>,
    product_service: Arc<ProductService<P>>,
}

impl<C: CartRepository, P: ProductRepository> CartService<C, P> {
    pub fn new(repository: Arc<C>, product_service: Arc<ProductService<P>>) -> Self {
        Self {
            repository,
            product_service,
        }
    }

    /// The user's cart; empty when nothing was ever added
    pub async fn get_cart(&self, user_id: &UserId) -> Result<Cart, Error> {
        self.repository.get(user_id).await
    }

    /// Replace the whole cart with `lines`
    pub async fn replace_cart(&self, user_id: &UserId, lines: &[CartLine]) -> Result<Cart, Error> {
        let lines: Vec<CartLine> = self
            .product_service
            .resolve_lines(lines)
            .await?
            .into_iter()
            .map(|(product, quantity)| CartLine {
                product: product.id,
                quantity,
            })
            .collect();

        let cart = self.repository.replace(user_id, &lines).await?;
        tracing::debug!(user_id = %user_id, lines = cart.items.len(), "Replaced cart");
        Ok(cart)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{MockCartRepository, MockProductRepository};

    async fn setup() -> (
        Arc<ProductService<MockProductRepository>>,
        CartService<MockCartRepository, MockProductRepository>,
    ) {
        let product_repo = Arc::new(MockProductRepository::default());
        let product_service = Arc::new(ProductService::new(product_repo.clone()));
        let cart_service = CartService::new(
            Arc::new(MockCartRepository::new(product_repo)),
            product_service.clone(),
        );
        (product_service, cart_service)
    }

    #[tokio::test]
    async fn test_new_user_has_empty_cart() {
        let (_, carts) = setup().await;
        let user_id = UserId::new_random();

        let cart = carts.get_cart(&user_id).await.unwrap();
        assert_eq!(cart.user_id, user_id);
        assert!(cart.items.is_empty());
        assert_eq!(cart.total_price(), 0.0);
    }

    #[tokio::test]
    async fn test_replace_cart() {
        let (products, carts) = setup().await;
        let user_id = UserId::new_random();
        let mug = products
            .create_product("Mug", "", 5.0, "https://example.com/mug.png")
            .await
            .unwrap();
        let plate = products
            .create_product("Plate", "", 2.5, "https://example.com/plate.png")
            .await
            .unwrap();

        carts
            .replace_cart(
                &user_id,
                &[CartLine {
                    product: mug.id.clone(),
                    quantity: 1,
                }],
            )
            .await
            .unwrap();

        let cart = carts
            .replace_cart(
                &user_id,
                &[
                    CartLine {
                        product: plate.id.clone(),
                        quantity: 2,
                    },
                    CartLine {
                        product: mug.id.clone(),
                        quantity: 0,
                    },
                ],
            )
            .await
            .unwrap();

        assert_eq!(cart.items.len(), 1);
        assert_eq!(cart.items[0].product.id, plate.id);
        assert_eq!(cart.total_price(), 5.0);
        assert_eq!(carts.get_cart(&user_id).await.unwrap(), cart);
    }

    #[tokio::test]
    async fn test_replace_cart_with_deleted_product_leaves_cart_untouched() {
        let (products, carts) = setup().await;
        let user_id = UserId::new_random();
        let mug = products
            .create_product("Mug", "", 5.0, "https://example.com/mug.png")
            .await
            .unwrap();
        let line = CartLine {
            product: mug.id.clone(),
            quantity: 1,
        };
        carts.replace_cart(&user_id, &[line.clone()]).await.unwrap();

        products.delete_product(&mug.id).await.unwrap();
        assert!(carts.replace_cart(&user_id, &[line]).await.is_err());

        assert_eq!(carts.get_cart(&user_id).await.unwrap().items.len(), 1);
    }
}
