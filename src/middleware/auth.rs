//! Authentication middleware.
//!
//! Each middleware runs one gateway strategy against the request headers and, on
//! success, injects the resolved identity into the request extensions:
//!
//! | Middleware                  | Extension inserted    |
//! |-----------------------------|-----------------------|
//! | [`require_access_token`]    | [`AuthContext`]       |
//! | [`require_client_credentials`] | `PartnerCredential` |
//! | [`require_api_key`]         | `ApiKey`              |
//!
//! Rejections short-circuit with the strategy's uniform 401.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::{
    error::AppError,
    services::gateway::{self, Principal},
    state::AppState,
};

/// Identity of a developer signed in with an access token.
///
/// Route handlers extract this with `Extension<AuthContext>` and scope every
/// query to `user_id`.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub user_id: Uuid,

    /// Email claim from the token, display only
    pub email: Option<String>,
}

/// Require `Authorization: Bearer <access token>`.
///
/// # Flow
///
/// 1. Parse the header (scheme is case-insensitive)
/// 2. Verify signature, algorithm, expiry and `type = access`
/// 3. Parse the subject as a user ID
/// 4. Inject [`AuthContext`] and call the next handler
///
/// Any failure returns `401 unauthorized` without the reason.
pub async fn require_access_token(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let principal = gateway::resolve(state.bearer.as_ref(), request.headers()).await?;
    match principal {
        Principal::User { user_id, email } => {
            request
                .extensions_mut()
                .insert(AuthContext { user_id, email });
        }
        _ => return Err(AppError::Unauthorized),
    }

    Ok(next.run(request).await)
}

/// Require `X-Client-Id` and `X-Client-Secret`.
///
/// Unknown client ID, secret mismatch and expiry all return the same
/// `401 invalid_client_credentials`.
pub async fn require_client_credentials(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let principal = gateway::resolve(state.client_credentials.as_ref(), request.headers()).await?;
    match principal {
        Principal::Partner(credential) => {
            request.extensions_mut().insert(credential);
        }
        _ => return Err(AppError::InvalidClientCredentials),
    }

    Ok(next.run(request).await)
}

/// Require `X-API-Key`.
pub async fn require_api_key(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let principal = gateway::resolve(state.api_key_auth.as_ref(), request.headers()).await?;
    match principal {
        Principal::ApiKey(key) => {
            request.extensions_mut().insert(key);
        }
        _ => return Err(AppError::Unauthorized),
    }

    Ok(next.run(request).await)
}
