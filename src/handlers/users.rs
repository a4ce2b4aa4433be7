//! Profile endpoints for the signed-in developer.

use axum::{Extension, Json, extract::State};

use crate::{
    error::AppError,
    middleware::auth::AuthContext,
    models::user::{UpdateProfileRequest, UserResponse},
    state::AppState,
};

/// `GET /api/v1/users/me`
pub async fn get_profile(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<UserResponse>, AppError> {
    Ok(Json(state.users.profile(auth.user_id).await?))
}

/// `PUT /api/v1/users/me`
///
/// Only non-empty fields are applied.
///
/// ```json
/// { "fullName": "Ada Lovelace", "company": "Analytical Engines" }
/// ```
pub async fn update_profile(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(request): Json<UpdateProfileRequest>,
) -> Result<Json<UserResponse>, AppError> {
    Ok(Json(
        state.users.update_profile(auth.user_id, request).await?,
    ))
}
