use std::sync::Arc;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use storefront::{Storefront, User};
use storefront_core::repositories::RepositoryProvider;

use crate::{error::ApiError, extractors::bearer_token};

pub struct AppState<R: RepositoryProvider> {
    pub storefront: Arc<Storefront<R>>,
}

impl<R: RepositoryProvider> Clone for AppState<R> {
    fn clone(&self) -> Self {
        Self {
            storefront: self.storefront.clone(),
        }
    }
}

/// Resolve the bearer token, if any, and attach the user to the request.
///
/// Requests without a valid token pass through unauthenticated; handlers
/// that need a user reject them through [`AuthUser`](crate::AuthUser).
/// A storage failure while resolving the token ends the request with the
/// storage error instead.
pub async fn auth_middleware<R>(
    State(state): State<AppState<R>>,
    mut request: Request,
    next: Next,
) -> Response
where
    R: RepositoryProvider,
{
    if let Some(token) = bearer_token(request.headers()) {
        match state.storefront.authenticate(&token).await {
            Ok(user) => {
                request.extensions_mut().insert::<User>(user);
            }
            Err(e) if e.is_storage_error() => {
                return ApiError::from(e).into_response();
            }
            Err(e) => {
                tracing::debug!(error = %e, "Invalid bearer token");
            }
        }
    }

    next.run(request).await
}
