//! API key management endpoints.
//!
//! - GET /api/v1/api-keys - List active keys
//! - POST /api/v1/api-keys - Issue a key
//! - GET /api/v1/api-keys/{id} - Get one key
//! - DELETE /api/v1/api-keys/{id} - Revoke a key
//! - GET /api/v1/developer/me - Identify the key presented in `X-API-Key`

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use crate::{
    error::AppError,
    middleware::auth::AuthContext,
    models::api_key::{ApiKey, ApiKeyResponse, CreateApiKeyRequest},
    state::AppState,
};

/// List the caller's active keys, newest first. Digests are never included.
pub async fn list_api_keys(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<Vec<ApiKeyResponse>>, AppError> {
    Ok(Json(state.api_keys.list(auth.user_id).await?))
}

/// Issue a new API key.
///
/// # Request Body
///
/// ```json
/// { "name": "CI pipeline", "environment": "production", "expiresInDays": 90 }
/// ```
///
/// # Response
///
/// Returns 201 Created. `key` is the plaintext and is only returned here.
///
/// ```json
/// {
///   "id": "550e8400-e29b-41d4-a716-446655440000",
///   "name": "CI pipeline",
///   "keyPrefix": "bas_1a2b3c4d",
///   "environment": "production",
///   "isActive": true,
///   "lastUsedAt": null,
///   "expiresAt": "2025-04-15T10:30:00Z",
///   "createdAt": "2025-01-15T10:30:00Z",
///   "key": "bas_1a2b3c4d..."
/// }
/// ```
///
/// - **Error (409)**: 10 active keys already exist
pub async fn create_api_key(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(request): Json<CreateApiKeyRequest>,
) -> Result<impl IntoResponse, AppError> {
    let created = state.api_keys.create(auth.user_id, request).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn get_api_key(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(key_id): Path<Uuid>,
) -> Result<Json<ApiKeyResponse>, AppError> {
    Ok(Json(state.api_keys.get(auth.user_id, key_id).await?))
}

/// Revoke a key. Returns 204 No Content, or 404 if the caller owns no such active key.
pub async fn revoke_api_key(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(key_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.api_keys.revoke(auth.user_id, key_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Describe the API key the request was authenticated with.
pub async fn current_api_key(Extension(key): Extension<ApiKey>) -> Json<ApiKeyResponse> {
    Json(key.into())
}
