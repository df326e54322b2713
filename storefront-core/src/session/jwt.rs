//! JWT session provider implementation

use async_trait::async_trait;
use chrono::{Duration, Utc};

use crate::{Error, JwtConfig, Session, SessionToken, UserId};

use super::provider::SessionProvider;

/// Stateless session provider backed by HS256 JWTs.
pub struct JwtSessionProvider {
    config: JwtConfig,
}

impl JwtSessionProvider {
    pub fn new(config: JwtConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl SessionProvider for JwtSessionProvider {
    async fn create_session(
        &self,
        user_id: &UserId,
        duration: Duration,
    ) -> Result<Session, Error> {
        let now = Utc::now();
        let mut session = Session {
            token: SessionToken::new(""),
            user_id: user_id.clone(),
            created_at: now,
            expires_at: now + duration,
        };

        let claims = session.to_jwt_claims(self.config.issuer.clone());
        session.token = SessionToken::new_jwt(&claims, &self.config)?;

        Ok(session)
    }

    async fn get_session(&self, token: &SessionToken) -> Result<Session, Error> {
        let claims = token.verify_jwt(&self.config)?;
        Session::from_jwt_claims(token.clone(), &claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SessionError;

    const TEST_HS256_SECRET: &[u8] = b"test_secret_key_for_hs256_jwt_tokens_not_for_production_use";

    #[tokio::test]
    async fn test_jwt_session_provider_create_and_get() {
        let provider = JwtSessionProvider::new(JwtConfig::new_hs256(TEST_HS256_SECRET.to_vec()));
        let user_id = UserId::new_random();

        let session = provider
            .create_session(&user_id, Duration::hours(1))
            .await
            .unwrap();
        assert_eq!(session.expires_in(), 3600);

        let retrieved = provider.get_session(&session.token).await.unwrap();
        assert_eq!(retrieved.user_id, user_id);
    }

    #[tokio::test]
    async fn test_jwt_session_provider_rejects_expired_token() {
        let provider = JwtSessionProvider::new(JwtConfig::new_hs256(TEST_HS256_SECRET.to_vec()));
        let session = provider
            .create_session(&UserId::new_random(), Duration::seconds(-10))
            .await
            .unwrap();

        let result = provider.get_session(&session.token).await;
        assert!(matches!(result, Err(Error::Session(SessionError::Expired))));
    }
}
