use chrono::Utc;
use serde::{Deserialize, Serialize};
use storefront::{CartLine, ProductId, ProductUpdate, User};

/// Envelope of every CRUD response.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T> {
    pub success: bool,
    /// Unix milliseconds at which the response was produced
    pub date_time: i64,
    pub data: Option<T>,
    pub message: String,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T, message: impl Into<String>) -> Self {
        Self {
            success: true,
            date_time: Utc::now().timestamp_millis(),
            data: Some(data),
            message: message.into(),
        }
    }
}

impl ApiResponse<()> {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            date_time: Utc::now().timestamp_millis(),
            data: None,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub token: String,
    /// Seconds until the token expires
    pub expires_in: i64,
    pub user: User,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateUserRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub admin: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateProductRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: f64,
    pub image: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateProductRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<f64>,
    pub image: Option<String>,
}

impl From<UpdateProductRequest> for ProductUpdate {
    fn from(request: UpdateProductRequest) -> Self {
        ProductUpdate {
            name: request.name,
            description: request.description,
            price: request.price,
            image: request.image,
        }
    }
}

/// One `{product, quantity}` line of a cart or order request.
#[derive(Debug, Clone, Deserialize)]
pub struct LineRequest {
    pub product: ProductId,
    pub quantity: u32,
}

impl From<LineRequest> for CartLine {
    fn from(line: LineRequest) -> Self {
        CartLine {
            product: line.product,
            quantity: line.quantity,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlaceOrderRequest {
    pub items: Vec<LineRequest>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Where a request came from.
#[derive(Debug, Clone)]
pub struct ConnectionInfo {
    /// Peer address, or `"unknown"` when the server did not record it
    pub ip: String,
    pub user_agent: Option<String>,
}
