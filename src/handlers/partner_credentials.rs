//! Partner credential management endpoints.
//!
//! - GET /api/v1/partner-credentials - List active credentials
//! - POST /api/v1/partner-credentials - Issue a credential
//! - GET /api/v1/partner-credentials/{id} - Detail with masked public key
//! - PUT /api/v1/partner-credentials/{id} - Update metadata
//! - PUT /api/v1/partner-credentials/{id}/public-key - Replace public key
//! - POST /api/v1/partner-credentials/{id}/regenerate-secret - Rotate secret
//! - DELETE /api/v1/partner-credentials/{id} - Soft delete

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
    models::partner_credential::{
        CreatePartnerCredentialRequest, PartnerCredentialDetailResponse,
        PartnerCredentialResponse, PartnerCredentialSecretResponse,
        UpdatePartnerCredentialRequest, UpdatePublicKeyRequest,
    },
    state::AppState,
};

pub async fn list_partner_credentials(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<Vec<PartnerCredentialResponse>>, AppError> {
    Ok(Json(state.partner_credentials.list(auth.user_id).await?))
}

/// Issue a new partner credential.
///
/// # Request Body
///
/// ```json
/// {
///   "partnerName": "Acme Payments",
///   "environment": "sandbox",
///   "callbackUrl": "https://acme.example/snap/callback",
///   "ipWhitelist": ["203.0.113.10"],
///   "publicKey": "-----BEGIN PUBLIC KEY-----\n...\n-----END PUBLIC KEY-----"
/// }
/// ```
///
/// # Response
///
/// Returns 201 Created with the credential and its `clientSecret`.
/// The secret is only returned here and on rotation.
///
/// - **Error (400)**: invalid URL, IP address or public key
/// - **Error (409)**: 5 active credentials already exist
pub async fn create_partner_credential(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(request): Json<CreatePartnerCredentialRequest>,
) -> Result<impl IntoResponse, AppError> {
    let created = state
        .partner_credentials
        .create(auth.user_id, request)
        .await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// # Security Note
///
/// The lookup is scoped to the caller, so another account's credential ID
/// returns the same 404 as an unknown one.
pub async fn get_partner_credential(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(credential_id): Path<Uuid>,
) -> Result<Json<PartnerCredentialDetailResponse>, AppError> {
    Ok(Json(
        state
            .partner_credentials
            .get(auth.user_id, credential_id)
            .await?,
    ))
}

pub async fn update_partner_credential(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(credential_id): Path<Uuid>,
    Json(request): Json<UpdatePartnerCredentialRequest>,
) -> Result<Json<PartnerCredentialResponse>, AppError> {
    Ok(Json(
        state
            .partner_credentials
            .update(auth.user_id, credential_id, request)
            .await?,
    ))
}

/// Replace the public key. An empty `publicKey` clears it.
pub async fn update_public_key(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(credential_id): Path<Uuid>,
    Json(request): Json<UpdatePublicKeyRequest>,
) -> Result<Json<PartnerCredentialDetailResponse>, AppError> {
    Ok(Json(
        state
            .partner_credentials
            .update_public_key(auth.user_id, credential_id, request)
            .await?,
    ))
}

/// Rotate the client secret. The old secret stops working immediately.
pub async fn regenerate_secret(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(credential_id): Path<Uuid>,
) -> Result<Json<PartnerCredentialSecretResponse>, AppError> {
    Ok(Json(
        state
            .partner_credentials
            .regenerate_secret(auth.user_id, credential_id)
            .await?,
    ))
}

/// Returns 204 No Content.
pub async fn delete_partner_credential(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(credential_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state
        .partner_credentials
        .delete(auth.user_id, credential_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
