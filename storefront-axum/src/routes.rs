use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use storefront::{CartLine, LoginOutcome, OrderId, ProductId, Storefront};
use storefront_core::repositories::RepositoryProvider;

use crate::{
    error::{ApiError, Result, WRONG_CREDENTIALS},
    extractors::{ApiJson, AuthUser, OptionalAuthUser},
    middleware::{AppState, auth_middleware},
    types::*,
};

pub fn create_router<R>(storefront: Arc<Storefront<R>>) -> Router
where
    R: RepositoryProvider + 'static,
{
    let state = AppState { storefront };

    Router::new()
        .route("/health", get(health_handler))
        .route("/auth/login", post(login_handler))
        .route("/auth/me", get(me_handler))
        .route("/users", get(list_users_handler).post(create_user_handler))
        .route(
            "/users/{username}",
            get(get_user_handler).delete(delete_user_handler),
        )
        .route(
            "/products",
            get(list_products_handler).post(create_product_handler),
        )
        .route(
            "/products/{id}",
            get(get_product_handler)
                .patch(update_product_handler)
                .delete(delete_product_handler),
        )
        .route("/cart/{username}", get(get_cart_handler))
        .route("/cart/{username}/products", post(replace_cart_handler))
        .route("/orders", get(list_orders_handler))
        .route(
            "/orders/{username}",
            get(list_user_orders_handler).post(place_order_handler),
        )
        .route("/orders/{username}/{id}", get(get_order_handler))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            auth_middleware::<R>,
        ))
        .with_state(state)
}

/// 404 with `message` for an empty listing.
fn non_empty<T>(items: Vec<T>, message: &str) -> Result<Vec<T>> {
    if items.is_empty() {
        Err(ApiError::NotFound(message.to_string()))
    } else {
        Ok(items)
    }
}

fn lines(request: Vec<LineRequest>) -> Vec<CartLine> {
    request.into_iter().map(Into::into).collect()
}

async fn health_handler<R>(State(state): State<AppState<R>>) -> Result<impl IntoResponse>
where
    R: RepositoryProvider,
{
    state.storefront.health_check().await?;

    Ok(Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    }))
}

// ============================================================================
// Auth
// ============================================================================

async fn login_handler<R>(
    State(state): State<AppState<R>>,
    connection: ConnectionInfo,
    ApiJson(request): ApiJson<LoginRequest>,
) -> Result<impl IntoResponse>
where
    R: RepositoryProvider,
{
    tracing::debug!(
        username = %request.username,
        client_ip = %connection.ip,
        user_agent = connection.user_agent.as_deref(),
        "Login attempt"
    );

    let outcome = state
        .storefront
        .login(&request.username, &request.password, &connection.ip)
        .await?;

    match outcome {
        LoginOutcome::Accepted { user, session } => Ok(Json(LoginResponse {
            token: session.token.into_inner(),
            expires_in: state.storefront.session_config().expires_in.num_seconds(),
            user,
        })),
        LoginOutcome::Rejected => Err(ApiError::BadRequest(WRONG_CREDENTIALS.to_string())),
        LoginOutcome::Throttled {
            retry_after_seconds,
        } => Err(ApiError::TooManyRequests {
            retry_after_seconds,
        }),
    }
}

/// The caller's profile, unwrapped like the login response.
async fn me_handler(AuthUser(user): AuthUser) -> impl IntoResponse {
    Json(user)
}

// ============================================================================
// Users
// ============================================================================

async fn list_users_handler<R>(
    State(state): State<AppState<R>>,
    AuthUser(caller): AuthUser,
) -> Result<impl IntoResponse>
where
    R: RepositoryProvider,
{
    let users = non_empty(
        state.storefront.list_users(&caller).await?,
        "No users found",
    )?;
    Ok(Json(ApiResponse::ok(users, "Users found")))
}

async fn create_user_handler<R>(
    State(state): State<AppState<R>>,
    OptionalAuthUser(caller): OptionalAuthUser,
    ApiJson(request): ApiJson<CreateUserRequest>,
) -> Result<impl IntoResponse>
where
    R: RepositoryProvider,
{
    let user = state
        .storefront
        .register_user(
            caller.as_ref(),
            &request.username,
            &request.email,
            &request.password,
            request.admin,
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(user, "User created")),
    ))
}

async fn get_user_handler<R>(
    State(state): State<AppState<R>>,
    AuthUser(caller): AuthUser,
    Path(username): Path<String>,
) -> Result<impl IntoResponse>
where
    R: RepositoryProvider,
{
    let user = state.storefront.get_user(&caller, &username).await?;
    Ok(Json(ApiResponse::ok(user, "User found")))
}

async fn delete_user_handler<R>(
    State(state): State<AppState<R>>,
    AuthUser(caller): AuthUser,
    Path(username): Path<String>,
) -> Result<impl IntoResponse>
where
    R: RepositoryProvider,
{
    let user = state.storefront.delete_user(&caller, &username).await?;
    Ok(Json(ApiResponse::ok(user, "User deleted")))
}

// ============================================================================
// Products
// ============================================================================

async fn list_products_handler<R>(State(state): State<AppState<R>>) -> Result<impl IntoResponse>
where
    R: RepositoryProvider,
{
    let products = non_empty(
        state.storefront.list_products().await?,
        "No products found",
    )?;
    Ok(Json(ApiResponse::ok(products, "Products found")))
}

async fn get_product_handler<R>(
    State(state): State<AppState<R>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse>
where
    R: RepositoryProvider,
{
    let product = state.storefront.get_product(&ProductId::new(&id)).await?;
    Ok(Json(ApiResponse::ok(product, "Product found")))
}

async fn create_product_handler<R>(
    State(state): State<AppState<R>>,
    AuthUser(caller): AuthUser,
    ApiJson(request): ApiJson<CreateProductRequest>,
) -> Result<impl IntoResponse>
where
    R: RepositoryProvider,
{
    let product = state
        .storefront
        .create_product(
            &caller,
            &request.name,
            &request.description,
            request.price,
            &request.image,
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(product, "Product created")),
    ))
}

async fn update_product_handler<R>(
    State(state): State<AppState<R>>,
    AuthUser(caller): AuthUser,
    Path(id): Path<String>,
    ApiJson(request): ApiJson<UpdateProductRequest>,
) -> Result<impl IntoResponse>
where
    R: RepositoryProvider,
{
    let product = state
        .storefront
        .update_product(&caller, &ProductId::new(&id), request.into())
        .await?;
    Ok(Json(ApiResponse::ok(product, "Product updated")))
}

async fn delete_product_handler<R>(
    State(state): State<AppState<R>>,
    AuthUser(caller): AuthUser,
    Path(id): Path<String>,
) -> Result<impl IntoResponse>
where
    R: RepositoryProvider,
{
    let id = ProductId::new(&id);
    state.storefront.delete_product(&caller, &id).await?;
    let product = state.storefront.get_product(&id).await?;
    Ok(Json(ApiResponse::ok(product, "Product deleted")))
}

// ============================================================================
// Cart
// ============================================================================

async fn get_cart_handler<R>(
    State(state): State<AppState<R>>,
    AuthUser(caller): AuthUser,
    Path(username): Path<String>,
) -> Result<impl IntoResponse>
where
    R: RepositoryProvider,
{
    let cart = state.storefront.get_cart(&caller, &username).await?;
    Ok(Json(ApiResponse::ok(cart, "Cart found")))
}

async fn replace_cart_handler<R>(
    State(state): State<AppState<R>>,
    AuthUser(caller): AuthUser,
    Path(username): Path<String>,
    ApiJson(request): ApiJson<Vec<LineRequest>>,
) -> Result<impl IntoResponse>
where
    R: RepositoryProvider,
{
    let cart = state
        .storefront
        .replace_cart(&caller, &username, &lines(request))
        .await?;
    Ok(Json(ApiResponse::ok(cart, "Cart updated")))
}

// ============================================================================
// Orders
// ============================================================================

async fn list_orders_handler<R>(
    State(state): State<AppState<R>>,
    AuthUser(caller): AuthUser,
) -> Result<impl IntoResponse>
where
    R: RepositoryProvider,
{
    let orders = non_empty(
        state.storefront.list_orders(&caller).await?,
        "No orders found",
    )?;
    Ok(Json(ApiResponse::ok(orders, "Orders found")))
}

async fn list_user_orders_handler<R>(
    State(state): State<AppState<R>>,
    AuthUser(caller): AuthUser,
    Path(username): Path<String>,
) -> Result<impl IntoResponse>
where
    R: RepositoryProvider,
{
    let orders = non_empty(
        state
            .storefront
            .list_orders_for_user(&caller, &username)
            .await?,
        "No orders found",
    )?;
    Ok(Json(ApiResponse::ok(orders, "Orders found")))
}

async fn get_order_handler<R>(
    State(state): State<AppState<R>>,
    AuthUser(caller): AuthUser,
    Path((username, id)): Path<(String, String)>,
) -> Result<impl IntoResponse>
where
    R: RepositoryProvider,
{
    let order = state
        .storefront
        .get_order(&caller, &username, &OrderId::new(&id))
        .await?;
    Ok(Json(ApiResponse::ok(order, "Order found")))
}

async fn place_order_handler<R>(
    State(state): State<AppState<R>>,
    AuthUser(caller): AuthUser,
    Path(username): Path<String>,
    ApiJson(request): ApiJson<PlaceOrderRequest>,
) -> Result<impl IntoResponse>
where
    R: RepositoryProvider,
{
    let order = state
        .storefront
        .place_order(&caller, &username, &lines(request.items))
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(order, "Order created")),
    ))
}
