//! Session provider trait
//!
//! Abstracts issuing and validating bearer tokens so the login guard does not
//! depend on a particular token format.

use async_trait::async_trait;
use chrono::Duration;

use crate::{Error, Session, SessionToken, UserId};

/// Trait for session token providers
#[async_trait]
pub trait SessionProvider: Send + Sync {
    /// Issue a new session for the given user
    ///
    /// # Arguments
    /// * `user_id` - The ID of the user to create a session for
    /// * `duration` - How long the session should be valid for
    ///
    /// # Errors
    /// `CryptoError::JwtSigning` when the token cannot be signed
    async fn create_session(&self, user_id: &UserId, duration: Duration)
    -> Result<Session, Error>;

    /// Validate a token and return the session it carries
    async fn get_session(&self, token: &SessionToken) -> Result<Session, Error>;
}

#[async_trait]
impl SessionProvider for Box<dyn SessionProvider> {
    async fn create_session(
        &self,
        user_id: &UserId,
        duration: Duration,
    ) -> Result<Session, Error> {
        (**self).create_session(user_id, duration).await
    }

    async fn get_session(&self, token: &SessionToken) -> Result<Session, Error> {
        (**self).get_session(token).await
    }
}
