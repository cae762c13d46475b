//! Authentication endpoints
//!
//! # Endpoints
//!
//! - `POST /api/auth/register` - Create an account
//! - `POST /api/auth/login` - Exchange credentials for tokens
//! - `POST /api/auth/refresh` - Exchange a refresh token for an access token
//! - `GET /api/auth/profile` - Caller's account (authenticated)
//! - `GET /api/auth/users` - All accounts, for assignee pickers (authenticated)

use crate::{app::AppState, error::ApiResult, extract::ApiJson};
use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use taskboard_shared::{
    auth::middleware::AuthContext,
    models::{Role, User},
    service::{Registration, Session},
};
use validator::Validate;

/// Register request
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    /// Email address
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,

    /// Display name
    #[validate(length(min = 1, max = 255, message = "Name must be 1 to 255 characters"))]
    pub name: String,

    /// Defaults to `member`
    pub role: Option<Role>,
}

/// Login request
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    /// Email address
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    pub password: String,
}

/// Refresh token request
#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Refresh token response
#[derive(Debug, Serialize, Deserialize)]
pub struct RefreshResponse {
    /// New access token (24h)
    pub token: String,
}

/// Register a new user
///
/// ```text
/// POST /api/auth/register
///
/// { "email": "a@b.c", "password": "password123", "name": "A", "role": "manager" }
/// ```
///
/// # Errors
///
/// - `409 Conflict`: email already registered
/// - `422 Unprocessable Entity`: validation failed
pub async fn register(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<User>)> {
    req.validate()?;

    let user = state
        .accounts
        .register(Registration {
            email: req.email,
            password: req.password,
            name: req.name,
            role: req.role,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(user)))
}

/// Login
///
/// Responds with `{token, refresh_token, user}`.
///
/// # Errors
///
/// - `401 Unauthorized`: unknown email or wrong password
pub async fn login(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> ApiResult<Json<Session>> {
    req.validate()?;

    let session = state.accounts.login(&req.email, &req.password).await?;
    Ok(Json(session))
}

/// Token refresh
///
/// # Errors
///
/// - `401 Unauthorized`: invalid, expired, or non-refresh token
pub async fn refresh(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<RefreshRequest>,
) -> ApiResult<Json<RefreshResponse>> {
    let token = state.accounts.refresh(&req.refresh_token).await?;
    Ok(Json(RefreshResponse { token }))
}

/// Caller's own account
pub async fn profile(State(state): State<AppState>, auth: AuthContext) -> ApiResult<Json<User>> {
    let user = state.accounts.profile(auth.user_id).await?;
    Ok(Json(user))
}

/// Every live account
pub async fn list_users(
    State(state): State<AppState>,
    _auth: AuthContext,
) -> ApiResult<Json<Vec<User>>> {
    let users = state.accounts.list_users().await?;
    Ok(Json(users))
}
