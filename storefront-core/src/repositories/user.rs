use crate::{Error, User, UserId, storage::NewUser};
use async_trait::async_trait;

/// Repository for user data access
#[async_trait]
pub trait UserRepository: Send + Sync + 'static {
    /// Create a new user
    ///
    /// Fails with `AuthError::UserAlreadyExists` when the username or email is taken.
    async fn create(&self, user: NewUser) -> Result<User, Error>;

    /// Find a user by ID
    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, Error>;

    /// Find a user by username
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, Error>;

    /// Find a user by email
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, Error>;

    /// List every user, oldest first
    async fn list(&self) -> Result<Vec<User>, Error>;

    /// Delete a user by ID, together with their cart
    async fn delete(&self, id: &UserId) -> Result<(), Error>;
}
