use crate::{
    Error, User, UserId,
    error::AuthError,
    repositories::UserRepository,
    storage::NewUser,
    validation::{validate_email, validate_username},
};
use std::sync::Arc;

/// Service for user management operations
pub struct UserService<R: UserRepository> {
    repository: Arc<R>,
}

impl<R: UserRepository> UserService<R> {
    /// Create a new UserService with the given repository
    pub fn new(repository: Arc<R>) -> Self {
        Self { repository }
    }

    /// Create a new user
    ///
    /// Usernames and emails are unique; a clash with either fails with
    /// `AuthError::UserAlreadyExists`.
    pub async fn create_user(
        &self,
        username: &str,
        email: &str,
        admin: bool,
    ) -> Result<User, Error> {
        self.insert_user(username, email, admin, None).await
    }

    /// Create a new user whose password hash is written with the profile,
    /// so no account ever exists without its credentials.
    pub async fn create_user_with_password_hash(
        &self,
        username: &str,
        email: &str,
        admin: bool,
        password_hash: String,
    ) -> Result<User, Error> {
        self.insert_user(username, email, admin, Some(password_hash))
            .await
    }

    async fn insert_user(
        &self,
        username: &str,
        email: &str,
        admin: bool,
        password_hash: Option<String>,
    ) -> Result<User, Error> {
        validate_username(username)?;
        validate_email(email)?;

        if self.repository.find_by_username(username).await?.is_some()
            || self.repository.find_by_email(email).await?.is_some()
        {
            return Err(AuthError::UserAlreadyExists.into());
        }

        let mut builder = NewUser::builder()
            .id(UserId::new_random())
            .username(username.to_string())
            .email(email.to_string())
            .admin(admin);
        if let Some(password_hash) = password_hash {
            builder = builder.password_hash(password_hash);
        }

        let new_user = builder.build()?;

        let user = self.repository.create(new_user).await?;
        tracing::info!(user_id = %user.id, username = %user.username, admin, "Created user");
        Ok(user)
    }

    /// Get a user by ID
    pub async fn get_user(&self, user_id: &UserId) -> Result<Option<User>, Error> {
        self.repository.find_by_id(user_id).await
    }

    /// Get a user by username
    pub async fn get_user_by_username(&self, username: &str) -> Result<Option<User>, Error> {
        self.repository.find_by_username(username).await
    }

    /// Get a user by username, failing with `Error::NotFound` when absent
    pub async fn require_user_by_username(&self, username: &str) -> Result<User, Error> {
        self.get_user_by_username(username)
            .await?
            .ok_or_else(|| Error::NotFound("User".to_string()))
    }

    /// Get a user by email
    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, Error> {
        self.repository.find_by_email(email).await
    }

    pub async fn list_users(&self) -> Result<Vec<User>, Error> {
        self.repository.list().await
    }

    /// Delete a user together with their password, cart and orders
    pub async fn delete_user(&self, username: &str) -> Result<User, Error> {
        let user = self.require_user_by_username(username).await?;
        self.repository.delete(&user.id).await?;
        tracing::info!(user_id = %user.id, "Deleted user");
        Ok(user)
    }
}
