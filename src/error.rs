//! Error types and HTTP error response handling.
//!
//! This module defines all application errors and how they are converted
//! into HTTP responses with appropriate status codes and JSON bodies.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::{
    services::quota::CredentialKind,
    store::StoreError,
    utils::{hashing::HashError, public_key::PublicKeyError, secrets::SecretError},
};

/// Application-wide error type.
///
/// # Error Categories
///
/// - **Input Errors**: malformed request data or public keys, reported with detail
/// - **Authorization Errors**: one uniform message per credential class, never saying
///   which check failed
/// - **Quota Errors**: ceiling reached, reported distinctly
/// - **Infrastructure Errors**: storage, entropy or hashing failure, logged and masked
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Storage operation failed.
    ///
    /// Returns HTTP 500 Internal Server Error.
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    /// Secret generation or hashing failed.
    ///
    /// Returns HTTP 500 Internal Server Error.
    #[error("Generation error: {0}")]
    Generation(String),

    /// Bearer token or API key missing, invalid, expired, or of the wrong type.
    ///
    /// Returns HTTP 401 Unauthorized.
    #[error("Unauthorized")]
    Unauthorized,

    /// Email/password login failed.
    ///
    /// Returns HTTP 401 Unauthorized.
    #[error("Invalid email or password")]
    InvalidCredentials,

    /// Client ID unknown or secret mismatch. Both cases are indistinguishable.
    ///
    /// Returns HTTP 401 Unauthorized.
    #[error("Invalid client credentials")]
    InvalidClientCredentials,

    /// Returns HTTP 409 Conflict.
    #[error("Email already registered")]
    EmailExists,

    /// Token subject does not resolve to a live account.
    ///
    /// Returns HTTP 404 Not Found.
    #[error("User not found")]
    UserNotFound,

    /// Returns HTTP 404 Not Found.
    #[error("API key not found")]
    ApiKeyNotFound,

    /// Returns HTTP 404 Not Found.
    #[error("Partner credential not found")]
    CredentialNotFound,

    /// Account already holds the maximum number of active credentials of this kind.
    ///
    /// Returns HTTP 409 Conflict.
    #[error("Maximum of {ceiling} active {kind} reached")]
    QuotaExceeded { kind: CredentialKind, ceiling: i64 },

    /// Returns HTTP 400 Bad Request.
    #[error("{0}")]
    InvalidPublicKey(#[from] PublicKeyError),

    /// Request body or parameters are invalid.
    ///
    /// Returns HTTP 400 Bad Request.
    /// The String contains details about what was invalid.
    #[error("Invalid request")]
    InvalidRequest(String),
}

impl From<SecretError> for AppError {
    fn from(err: SecretError) -> Self {
        AppError::Generation(err.to_string())
    }
}

impl From<HashError> for AppError {
    fn from(err: HashError) -> Self {
        AppError::Generation(err.to_string())
    }
}

/// Convert AppError into an HTTP response.
///
/// # Response Format
///
/// All errors return JSON in this format:
/// ```json
/// {
///   "error": {
///     "code": "error_type",
///     "message": "Human-readable error message"
///   }
/// }
/// ```
///
/// Infrastructure errors are logged here and replaced by a fixed message.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Map each error variant to (HTTP status, error code, message)
        let (status, code, message) = match self {
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized", self.to_string()),
            AppError::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                "invalid_credentials",
                self.to_string(),
            ),
            AppError::InvalidClientCredentials => (
                StatusCode::UNAUTHORIZED,
                "invalid_client_credentials",
                self.to_string(),
            ),
            AppError::EmailExists => (StatusCode::CONFLICT, "email_exists", self.to_string()),
            AppError::QuotaExceeded { .. } => {
                (StatusCode::CONFLICT, "quota_exceeded", self.to_string())
            }
            AppError::UserNotFound => (StatusCode::NOT_FOUND, "user_not_found", self.to_string()),
            AppError::ApiKeyNotFound => {
                (StatusCode::NOT_FOUND, "api_key_not_found", self.to_string())
            }
            AppError::CredentialNotFound => (
                StatusCode::NOT_FOUND,
                "credential_not_found",
                self.to_string(),
            ),
            AppError::InvalidPublicKey(_) => (
                StatusCode::BAD_REQUEST,
                "invalid_public_key",
                self.to_string(),
            ),
            AppError::InvalidRequest(ref msg) => {
                (StatusCode::BAD_REQUEST, "invalid_request", msg.clone())
            }
            AppError::Store(_) | AppError::Generation(_) => {
                tracing::error!(error = %self, "Request failed with internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                )
            }
        };

        // Build JSON response body
        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn body_of(err: AppError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn internal_errors_are_masked() {
        let (status, body) =
            body_of(AppError::Generation("entropy source unavailable".into())).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"]["code"], "internal_error");
        assert_eq!(body["error"]["message"], "An internal error occurred");
    }

    #[tokio::test]
    async fn quota_error_names_kind_and_ceiling() {
        let (status, body) = body_of(AppError::QuotaExceeded {
            kind: CredentialKind::PartnerCredential,
            ceiling: 5,
        })
        .await;

        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"]["code"], "quota_exceeded");
        assert_eq!(
            body["error"]["message"],
            "Maximum of 5 active partner credentials reached"
        );
    }

    #[tokio::test]
    async fn public_key_error_is_bad_request() {
        let (status, body) = body_of(PublicKeyError::InvalidKey.into()).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "invalid_public_key");
    }
}
