use crate::{
    Error, User, UserId,
    repositories::{PasswordRepository, UserRepository},
    services::UserService,
    validation::validate_password,
};
use std::sync::Arc;

/// Outcome of checking a username and password.
#[derive(Debug, Clone)]
pub enum CredentialCheck {
    Verified(User),
    /// The user exists but the password does not match.
    Mismatch,
    UnknownUser,
}

impl CredentialCheck {
    pub fn user_exists(&self) -> bool {
        !matches!(self, CredentialCheck::UnknownUser)
    }
}

/// Service for password authentication operations
pub struct PasswordService<U: UserRepository, P: PasswordRepository> {
    user_service: Arc<UserService<U>>,
    password_repository: Arc<P>,
}

impl<U: UserRepository, P: PasswordRepository> PasswordService<U, P> {
    /// Create a new PasswordService with the given repositories
    pub fn new(user_repository: Arc<U>, password_repository: Arc<P>) -> Self {
        let user_service = Arc::new(UserService::new(user_repository));
        Self {
            user_service,
            password_repository,
        }
    }

    pub fn user_service(&self) -> &UserService<U> {
        &self.user_service
    }

    /// Register a new user with a password
    ///
    /// The password is validated and hashed before anything is written, and
    /// the hash is stored with the user row in a single insert.
    pub async fn register_user(
        &self,
        username: &str,
        email: &str,
        password: &str,
        admin: bool,
    ) -> Result<User, Error> {
        validate_password(password)?;

        let password_hash = Self::hash_password(password);
        self.user_service
            .create_user_with_password_hash(username, email, admin, password_hash)
            .await
    }

    /// Check a username and password.
    ///
    /// Mismatches are reported as values rather than errors; only storage
    /// failures come back as `Err`.
    pub async fn verify_credentials(
        &self,
        username: &str,
        password: &str,
    ) -> Result<CredentialCheck, Error> {
        let Some(user) = self.user_service.get_user_by_username(username).await? else {
            return Ok(CredentialCheck::UnknownUser);
        };

        let Some(password_hash) = self.password_repository.get_password_hash(&user.id).await?
        else {
            return Ok(CredentialCheck::Mismatch);
        };

        if Self::verify_password(password, &password_hash) {
            Ok(CredentialCheck::Verified(user))
        } else {
            Ok(CredentialCheck::Mismatch)
        }
    }

    /// Set a user's password (admin operation, no old password required)
    pub async fn set_password(&self, user_id: &UserId, password: &str) -> Result<(), Error> {
        validate_password(password)?;

        let password_hash = Self::hash_password(password);
        self.password_repository
            .set_password_hash(user_id, &password_hash)
            .await
    }

    /// Hash a password using argon2
    fn hash_password(password: &str) -> String {
        password_auth::generate_hash(password)
    }

    fn verify_password(password: &str, hash: &str) -> bool {
        password_auth::verify_password(password, hash).is_ok()
    }
}
