use axum::{
    Json,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use storefront::Error;
use storefront_core::error::{AuthError, StorageError};
use thiserror::Error;

use crate::types::ApiResponse;

/// Message for rejected credentials. Identical for unknown users and wrong
/// passwords.
pub const WRONG_CREDENTIALS: &str = "username or password is wrong";

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("Not authorized")]
    Forbidden,

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Too Many Requests")]
    TooManyRequests { retry_after_seconds: u64 },

    #[error("Service unavailable")]
    ServiceUnavailable,

    #[error("Internal server error")]
    Internal,
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        match err {
            Error::Validation(e) => ApiError::BadRequest(e.to_string()),
            Error::Auth(AuthError::Forbidden) => ApiError::Forbidden,
            Error::Auth(AuthError::UserAlreadyExists) => {
                ApiError::Conflict("User already exists".to_string())
            }
            Error::Auth(AuthError::InvalidCredentials) => {
                ApiError::BadRequest(WRONG_CREDENTIALS.to_string())
            }
            Error::Auth(AuthError::UserNotFound) => {
                ApiError::NotFound("User not found".to_string())
            }
            Error::Session(e) => {
                tracing::debug!(error = %e, "Rejected session token");
                ApiError::Unauthorized("Invalid or expired token".to_string())
            }
            Error::NotFound(what) => ApiError::NotFound(format!("{what} not found")),
            Error::Storage(StorageError::Constraint(msg)) => {
                tracing::debug!(error = %msg, "Constraint violation");
                ApiError::Conflict("Resource already exists or is still referenced".to_string())
            }
            Error::Storage(StorageError::Connection(msg)) => {
                tracing::error!(error = %msg, "Storage unavailable");
                ApiError::ServiceUnavailable
            }
            err => {
                tracing::error!(error = %err, "Request failed");
                ApiError::Internal
            }
        }
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::TooManyRequests { .. } => StatusCode::TOO_MANY_REQUESTS,
            ApiError::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        if let ApiError::TooManyRequests {
            retry_after_seconds,
        } = self
        {
            let mut response = (status, "Too Many Requests").into_response();
            response.headers_mut().insert(
                header::RETRY_AFTER,
                HeaderValue::from(retry_after_seconds),
            );
            return response;
        }

        (status, Json(ApiResponse::error(self.to_string()))).into_response()
    }
}

pub type Result<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use storefront_core::error::{CryptoError, SessionError, ValidationError};

    #[test]
    fn test_error_status_mapping() {
        let cases: Vec<(Error, StatusCode)> = vec![
            (
                ValidationError::MissingField("Username".to_string()).into(),
                StatusCode::BAD_REQUEST,
            ),
            (AuthError::Forbidden.into(), StatusCode::FORBIDDEN),
            (AuthError::UserAlreadyExists.into(), StatusCode::CONFLICT),
            (SessionError::Expired.into(), StatusCode::UNAUTHORIZED),
            (Error::NotFound("Order".to_string()), StatusCode::NOT_FOUND),
            (
                StorageError::Constraint("UNIQUE".to_string()).into(),
                StatusCode::CONFLICT,
            ),
            (
                StorageError::Connection("pool timed out".to_string()).into(),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                StorageError::Database("disk I/O".to_string()).into(),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                CryptoError::JwtSigning("bad key".to_string()).into(),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (error, status) in cases {
            let description = error.to_string();
            assert_eq!(ApiError::from(error).status(), status, "{description}");
        }
    }

    #[test]
    fn test_too_many_requests_sets_retry_after() {
        let response = ApiError::TooManyRequests {
            retry_after_seconds: 42,
        }
        .into_response();

        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()[header::RETRY_AFTER], "42");
    }
}
