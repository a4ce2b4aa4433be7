//! Session endpoints.
//!
//! - POST /api/v1/auth/register - Create an account and sign in
//! - POST /api/v1/auth/login - Sign in with email and password
//! - POST /api/v1/auth/refresh - Exchange a refresh token for a new pair

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};

use crate::{
    error::AppError,
    models::user::{AuthResponse, LoginRequest, RefreshRequest, RegisterRequest},
    state::AppState,
};

/// Register a new account.
///
/// # Request Body
///
/// ```json
/// { "email": "a@b.com", "password": "password123", "fullName": "A B" }
/// ```
///
/// # Response
///
/// - **Success (201 Created)**: tokens and profile
/// - **Error (400)**: validation failed
/// - **Error (409)**: email already registered
pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    let response = state.auth.register(request).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// Sign in.
///
/// # Response
///
/// - **Success (200 OK)**: tokens and profile
/// - **Error (401)**: `invalid_credentials`, whatever the cause
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    Ok(Json(state.auth.login(request).await?))
}

/// Refresh a session.
///
/// # Request Body
///
/// ```json
/// { "refreshToken": "eyJ..." }
/// ```
///
/// # Response
///
/// - **Success (200 OK)**: a new access and refresh token
/// - **Error (401)**: token invalid, expired or an access token
/// - **Error (404)**: account no longer exists
pub async fn refresh(
    State(state): State<AppState>,
    Json(request): Json<RefreshRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    Ok(Json(state.auth.refresh(&request.refresh_token).await?))
}
