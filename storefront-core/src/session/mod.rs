//! Bearer sessions
//!
//! Sessions are stateless HS256 JSON Web Tokens. Nothing is stored server
//! side: a token is valid until its `exp` claim passes.
//!
//! | Field        | Type           | Description                                 |
//! | ------------ | -------------- | ------------------------------------------- |
//! | `token`      | `SessionToken` | The signed bearer token.                    |
//! | `user_id`    | `UserId`       | The user the token was issued to.           |
//! | `created_at` | `DateTime`     | When the token was issued.                  |
//! | `expires_at` | `DateTime`     | When the token stops being accepted.        |

pub mod jwt;
pub mod provider;

use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use jsonwebtoken::errors::ErrorKind;
use serde::{Deserialize, Serialize};

use crate::{
    Error,
    error::{CryptoError, SessionError},
    user::UserId,
};

pub use jwt::JwtSessionProvider;
pub use provider::SessionProvider;

/// A signed bearer token
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionToken(String);

impl SessionToken {
    pub fn new(token: &str) -> Self {
        SessionToken(token.to_string())
    }

    /// Sign `claims` into a new token
    pub fn new_jwt(claims: &JwtClaims, config: &JwtConfig) -> Result<Self, Error> {
        let token = encode(&Header::new(Algorithm::HS256), claims, &config.encoding_key())
            .map_err(|e| CryptoError::JwtSigning(e.to_string()))?;

        Ok(SessionToken(token))
    }

    /// Verify the signature and expiry of this token and return its claims
    pub fn verify_jwt(&self, config: &JwtConfig) -> Result<JwtClaims, Error> {
        let token_data = decode::<JwtClaims>(&self.0, &config.decoding_key(), &config.validation())
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => Error::Session(SessionError::Expired),
                _ => Error::Session(SessionError::InvalidToken(e.to_string())),
            })?;

        Ok(token_data.claims)
    }

    pub fn into_inner(self) -> String {
        self.0
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for SessionToken {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for SessionToken {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl std::fmt::Display for SessionToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// JWT claims for session tokens
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtClaims {
    /// Subject - user ID
    pub sub: String,
    /// Issued at in seconds (as UTC timestamp)
    pub iat: i64,
    /// Expiration time in seconds (as UTC timestamp)
    pub exp: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
}

/// Configuration for HS256 signed sessions
#[derive(Clone)]
pub struct JwtConfig {
    secret_key: Vec<u8>,
    pub issuer: Option<String>,
}

impl JwtConfig {
    pub fn new_hs256(secret_key: Vec<u8>) -> Self {
        Self {
            secret_key,
            issuer: None,
        }
    }

    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = Some(issuer.into());
        self
    }

    fn encoding_key(&self) -> EncodingKey {
        EncodingKey::from_secret(&self.secret_key)
    }

    fn decoding_key(&self) -> DecodingKey {
        DecodingKey::from_secret(&self.secret_key)
    }

    fn validation(&self) -> Validation {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        if let Some(issuer) = &self.issuer {
            validation.set_issuer(&[issuer]);
        }
        validation
    }
}

impl std::fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtConfig")
            .field("secret_key", &"<redacted>")
            .field("issuer", &self.issuer)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub token: SessionToken,
    pub user_id: UserId,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn is_expired(&self) -> bool {
        Utc::now() > self.expires_at
    }

    /// Seconds between issuance and expiry
    pub fn expires_in(&self) -> i64 {
        (self.expires_at - self.created_at).num_seconds()
    }

    pub fn to_jwt_claims(&self, issuer: Option<String>) -> JwtClaims {
        JwtClaims {
            sub: self.user_id.to_string(),
            iat: self.created_at.timestamp(),
            exp: self.expires_at.timestamp(),
            iss: issuer,
        }
    }

    pub fn from_jwt_claims(token: SessionToken, claims: &JwtClaims) -> Result<Self, Error> {
        let created_at = DateTime::from_timestamp(claims.iat, 0)
            .ok_or_else(|| SessionError::InvalidToken("iat out of range".to_string()))?;
        let expires_at = DateTime::from_timestamp(claims.exp, 0)
            .ok_or_else(|| SessionError::InvalidToken("exp out of range".to_string()))?;

        Ok(Self {
            token,
            user_id: UserId::new(&claims.sub),
            created_at,
            expires_at,
        })
    }
}
