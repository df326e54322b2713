//! In-memory repositories shared by the service tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use crate::{
    Cart, CartItem, Error, Order, OrderId, OrderItem, Product, ProductId, Session, SessionToken,
    User, UserId,
    error::{CryptoError, StorageError},
    repositories::{
        CartRepository, OrderRepository, PasswordRepository, ProductRepository,
        RateLimiterRepository, UserRepository,
    },
    session::SessionProvider,
    storage::{
        CartLine, NewOrder, NewProduct, NewUser, ProductUpdate, RateLimiterConfig,
        RateLimiterState,
    },
};

type PasswordTable = Arc<Mutex<HashMap<UserId, String>>>;

/// Users and their password hashes, which share a table as they do in SQL.
#[derive(Default)]
pub struct MockUserRepository {
    users: Mutex<HashMap<UserId, User>>,
    passwords: PasswordTable,
}

impl MockUserRepository {
    pub fn is_empty(&self) -> bool {
        self.users.lock().unwrap().is_empty()
    }

    /// A password repository over this repository's hashes.
    pub fn password_repository(&self) -> MockPasswordRepository {
        MockPasswordRepository {
            passwords: self.passwords.clone(),
            failing: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl UserRepository for MockUserRepository {
    async fn create(&self, new_user: NewUser) -> Result<User, Error> {
        let now = Utc::now();
        let user = User {
            id: new_user.id,
            username: new_user.username,
            email: new_user.email,
            admin: new_user.admin,
            created_at: now,
            updated_at: now,
        };
        if let Some(hash) = new_user.password_hash {
            self.passwords.lock().unwrap().insert(user.id.clone(), hash);
        }
        self.users
            .lock()
            .unwrap()
            .insert(user.id.clone(), user.clone());
        Ok(user)
    }

    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, Error> {
        Ok(self.users.lock().unwrap().get(id).cloned())
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, Error> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .values()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, Error> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .values()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn list(&self) -> Result<Vec<User>, Error> {
        Ok(self.users.lock().unwrap().values().cloned().collect())
    }

    async fn delete(&self, id: &UserId) -> Result<(), Error> {
        self.users.lock().unwrap().remove(id);
        self.passwords.lock().unwrap().remove(id);
        Ok(())
    }
}

#[derive(Default)]
pub struct MockPasswordRepository {
    passwords: PasswordTable,
    failing: AtomicBool,
}

impl MockPasswordRepository {
    pub fn hash_for(&self, user_id: &UserId) -> Option<String> {
        self.passwords.lock().unwrap().get(user_id).cloned()
    }

    /// Make every `set_password_hash` fail with a storage error.
    pub fn fail_writes(&self) {
        self.failing.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl PasswordRepository for MockPasswordRepository {
    async fn set_password_hash(&self, user_id: &UserId, hash: &str) -> Result<(), Error> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StorageError::Connection("password store unavailable".to_string()).into());
        }
        self.passwords
            .lock()
            .unwrap()
            .insert(user_id.clone(), hash.to_string());
        Ok(())
    }

    async fn get_password_hash(&self, user_id: &UserId) -> Result<Option<String>, Error> {
        Ok(self.hash_for(user_id))
    }
}

/// Applies [`RateLimiterState::advance`] under a lock, which is the
/// behaviour the SQL backends reproduce with a single statement.
#[derive(Default)]
pub struct MockRateLimiterRepository {
    states: Mutex<HashMap<String, RateLimiterState>>,
    failing: AtomicBool,
}

impl MockRateLimiterRepository {
    pub fn fail_with_storage_error(&self) {
        self.failing.store(true, Ordering::SeqCst);
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<_> = self.states.lock().unwrap().keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Move a record's window and block by `delta`, to simulate elapsed time.
    pub fn shift_expiry(&self, key: &str, delta: Duration) {
        if let Some(state) = self.states.lock().unwrap().get_mut(key) {
            state.window_expires_at += delta;
            state.blocked_until = state.blocked_until.map(|until| until + delta);
        }
    }

    fn check(&self) -> Result<(), Error> {
        if self.failing.load(Ordering::SeqCst) {
            Err(StorageError::Connection("limiter store unavailable".to_string()).into())
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl RateLimiterRepository for MockRateLimiterRepository {
    async fn get(&self, key: &str, now: DateTime<Utc>) -> Result<Option<RateLimiterState>, Error> {
        self.check()?;
        Ok(self
            .states
            .lock()
            .unwrap()
            .get(key)
            .filter(|state| state.is_live(now))
            .cloned())
    }

    async fn consume(
        &self,
        key: &str,
        config: &RateLimiterConfig,
        now: DateTime<Utc>,
    ) -> Result<RateLimiterState, Error> {
        self.check()?;
        let mut states = self.states.lock().unwrap();
        let next = RateLimiterState::advance(states.get(key), key, config, now);
        states.insert(key.to_string(), next.clone());
        Ok(next)
    }

    async fn delete(&self, key: &str) -> Result<(), Error> {
        self.check()?;
        self.states.lock().unwrap().remove(key);
        Ok(())
    }

    async fn cleanup_expired(&self, before: DateTime<Utc>) -> Result<u64, Error> {
        self.check()?;
        let mut states = self.states.lock().unwrap();
        let len = states.len();
        states.retain(|_, state| state.is_live(before));
        Ok((len - states.len()) as u64)
    }
}

#[derive(Default)]
pub struct MockProductRepository {
    products: Mutex<HashMap<ProductId, Product>>,
}

impl MockProductRepository {
    fn snapshot(&self, id: &ProductId) -> Option<Product> {
        self.products.lock().unwrap().get(id).cloned()
    }
}

#[async_trait]
impl ProductRepository for MockProductRepository {
    async fn create(&self, product: NewProduct) -> Result<Product, Error> {
        let mut products = self.products.lock().unwrap();
        if products.values().any(|p| p.name == product.name) {
            return Err(StorageError::Constraint("product name taken".to_string()).into());
        }

        let now = Utc::now();
        let product = Product {
            id: product.id,
            name: product.name,
            description: product.description,
            price: product.price,
            image: product.image,
            deleted: false,
            created_at: now,
            updated_at: now,
        };
        products.insert(product.id.clone(), product.clone());
        Ok(product)
    }

    async fn find_by_id(&self, id: &ProductId) -> Result<Option<Product>, Error> {
        Ok(self.snapshot(id))
    }

    async fn list(&self) -> Result<Vec<Product>, Error> {
        Ok(self.products.lock().unwrap().values().cloned().collect())
    }

    async fn update(
        &self,
        id: &ProductId,
        update: ProductUpdate,
    ) -> Result<Option<Product>, Error> {
        let mut products = self.products.lock().unwrap();
        let Some(product) = products.get_mut(id).filter(|p| !p.deleted) else {
            return Ok(None);
        };

        if let Some(name) = update.name {
            product.name = name;
        }
        if let Some(description) = update.description {
            product.description = description;
        }
        if let Some(price) = update.price {
            product.price = price;
        }
        if let Some(image) = update.image {
            product.image = image;
        }
        product.updated_at = Utc::now();
        Ok(Some(product.clone()))
    }

    async fn soft_delete(&self, id: &ProductId) -> Result<bool, Error> {
        let mut products = self.products.lock().unwrap();
        match products.get_mut(id) {
            Some(product) => {
                product.deleted = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

pub struct MockCartRepository {
    products: Arc<MockProductRepository>,
    lines: Mutex<HashMap<UserId, Vec<CartLine>>>,
}

impl MockCartRepository {
    pub fn new(products: Arc<MockProductRepository>) -> Self {
        Self {
            products,
            lines: Mutex::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl CartRepository for MockCartRepository {
    async fn get(&self, user_id: &UserId) -> Result<Cart, Error> {
        let lines = self
            .lines
            .lock()
            .unwrap()
            .get(user_id)
            .cloned()
            .unwrap_or_default();

        let items = lines
            .into_iter()
            .filter_map(|line| {
                self.products.snapshot(&line.product).map(|product| CartItem {
                    product,
                    quantity: line.quantity,
                })
            })
            .collect();

        Ok(Cart {
            user_id: user_id.clone(),
            items,
        })
    }

    async fn replace(&self, user_id: &UserId, lines: &[CartLine]) -> Result<Cart, Error> {
        self.lines
            .lock()
            .unwrap()
            .insert(user_id.clone(), lines.to_vec());
        self.get(user_id).await
    }
}

pub struct MockOrderRepository {
    products: Arc<MockProductRepository>,
    orders: Mutex<Vec<Order>>,
}

impl MockOrderRepository {
    pub fn new(products: Arc<MockProductRepository>) -> Self {
        Self {
            products,
            orders: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl OrderRepository for MockOrderRepository {
    async fn create(&self, order: NewOrder) -> Result<Order, Error> {
        let items = order
            .lines
            .iter()
            .map(|line| {
                self.products
                    .snapshot(&line.product)
                    .map(|product| OrderItem {
                        product,
                        quantity: line.quantity,
                    })
                    .ok_or_else(|| Error::NotFound("Product".to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let order = Order {
            id: order.id,
            user_id: order.user_id,
            order_date: order.order_date,
            total_price: order.total_price,
            items,
        };
        self.orders.lock().unwrap().push(order.clone());
        Ok(order)
    }

    async fn find_by_id(&self, id: &OrderId) -> Result<Option<Order>, Error> {
        Ok(self
            .orders
            .lock()
            .unwrap()
            .iter()
            .find(|o| &o.id == id)
            .cloned())
    }

    async fn list(&self) -> Result<Vec<Order>, Error> {
        Ok(self.orders.lock().unwrap().clone())
    }

    async fn list_for_user(&self, user_id: &UserId) -> Result<Vec<Order>, Error> {
        Ok(self
            .orders
            .lock()
            .unwrap()
            .iter()
            .filter(|o| &o.user_id == user_id)
            .cloned()
            .collect())
    }
}

/// Session provider whose signing always fails.
pub struct FailingSessionProvider;

#[async_trait]
impl SessionProvider for FailingSessionProvider {
    async fn create_session(
        &self,
        _user_id: &UserId,
        _duration: Duration,
    ) -> Result<Session, Error> {
        Err(CryptoError::JwtSigning("no signing key".to_string()).into())
    }

    async fn get_session(&self, token: &SessionToken) -> Result<Session, Error> {
        Err(crate::error::SessionError::InvalidToken(token.to_string()).into())
    }
}
