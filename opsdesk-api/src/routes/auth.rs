/// Authentication endpoints
///
/// Accounts are created by leads through `POST /team`; there is no
/// self-registration.
///
/// # Endpoints
///
/// - `POST /auth/login` - Exchange email and password for tokens
/// - `POST /auth/refresh` - Exchange a refresh token for a new access token

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use opsdesk_shared::{
    auth::{jwt, password},
    models::user::User,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use validator::Validate;

const INVALID_CREDENTIALS: &str = "Invalid email or password";

/// Login request
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 1, message = "password is required"))]
    pub password: String,
}

/// Login response
#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub user_id: String,

    /// Access token (24h)
    pub access_token: String,

    /// Refresh token (30d)
    pub refresh_token: String,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RefreshResponse {
    /// New access token (24h)
    pub access_token: String,
}

/// Login endpoint
///
/// ```text
/// POST /auth/login
/// Content-Type: application/json
///
/// {
///   "email": "lead@example.com",
///   "password": "secret1"
/// }
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: Validation failed
/// - `401 Unauthorized`: Unknown email, wrong password, or inactive account
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<Json<LoginResponse>> {
    let Json(req) = payload?;
    req.validate()?;

    let user = User::find_by_email(&state.db, &req.email)
        .await?
        .ok_or_else(|| ApiError::Unauthorized(INVALID_CREDENTIALS.to_string()))?;

    let hash = user.password_hash.clone();
    let plain = req.password;
    let valid =
        tokio::task::spawn_blocking(move || password::verify_password(&plain, &hash)).await??;

    if !valid {
        warn!(user_id = %user.id, "Login failed: wrong password");
        return Err(ApiError::Unauthorized(INVALID_CREDENTIALS.to_string()));
    }

    if !user.status.is_active() {
        warn!(user_id = %user.id, "Login refused: account inactive");
        return Err(ApiError::Unauthorized("User account is inactive".to_string()));
    }

    User::update_last_login(&state.db, user.id).await?;

    let tokens = jwt::issue_token_pair(user.id, state.jwt_secret())?;

    info!(user_id = %user.id, "User logged in");
    Ok(Json(LoginResponse {
        user_id: user.id.to_string(),
        access_token: tokens.access_token,
        refresh_token: tokens.refresh_token,
    }))
}

/// Token refresh endpoint
///
/// The user behind the refresh token must still exist and be active.
///
/// # Errors
///
/// - `401 Unauthorized`: Invalid or expired refresh token, or the account
///   is gone or inactive
pub async fn refresh(
    State(state): State<AppState>,
    payload: Result<Json<RefreshRequest>, JsonRejection>,
) -> ApiResult<Json<RefreshResponse>> {
    let Json(req) = payload?;
    let (user_id, access_token) = jwt::refresh_access_token(&req.refresh_token, state.jwt_secret())?;

    let user = User::find_by_id(&state.db, user_id)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("User no longer exists".to_string()))?;

    if !user.status.is_active() {
        return Err(ApiError::Unauthorized("User account is inactive".to_string()));
    }

    Ok(Json(RefreshResponse { access_token }))
}
