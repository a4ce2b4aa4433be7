//! Credential verification gateway.
//!
//! Every way a caller can prove who they are is an [`Authenticator`] strategy that
//! inspects the request headers and either resolves a [`Principal`] or refuses with
//! an [`AuthFailure`]. Failures carry the internal reason for logs; callers only ever
//! see the strategy's uniform [`Authenticator::rejection`].
//!
//! | Strategy                        | Headers                              |
//! |---------------------------------|--------------------------------------|
//! | [`BearerTokenAuthenticator`]    | `Authorization: Bearer <token>`      |
//! | [`ClientCredentialAuthenticator`] | `X-Client-Id` + `X-Client-Secret`  |
//! | [`ApiKeyAuthenticator`]         | `X-API-Key`                          |

use std::sync::Arc;

use async_trait::async_trait;
use axum::http::{HeaderMap, header};
use uuid::Uuid;

use crate::{
    error::AppError,
    models::{api_key::ApiKey, partner_credential::PartnerCredential},
    services::{
        api_key_service::ApiKeyService,
        partner_credential_service::PartnerCredentialService,
        token_service::{TokenError, TokenService, TokenType},
    },
};

pub const CLIENT_ID_HEADER: &str = "x-client-id";
pub const CLIENT_SECRET_HEADER: &str = "x-client-secret";
pub const API_KEY_HEADER: &str = "x-api-key";

/// An authenticated caller.
#[derive(Debug, Clone)]
pub enum Principal {
    /// Developer signed in with an access token
    User { user_id: Uuid, email: Option<String> },
    /// Developer calling with an API key
    ApiKey(ApiKey),
    /// Partner integration calling with client credentials
    Partner(PartnerCredential),
}

/// Why authentication was refused. Never sent to the caller.
#[derive(Debug, thiserror::Error)]
pub enum AuthFailure {
    #[error("credentials header missing")]
    MissingCredentials,

    #[error("credentials header malformed")]
    MalformedHeader,

    #[error("{0}")]
    Token(#[from] TokenError),

    #[error("credential unknown, inactive, expired or mismatched")]
    CredentialMismatch,

    /// The check itself could not run.
    #[error("{0}")]
    Internal(#[from] AppError),
}

#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn authenticate(&self, headers: &HeaderMap) -> Result<Principal, AuthFailure>;

    /// Error reported to the caller for any refusal.
    fn rejection(&self) -> AppError;
}

/// Run a strategy and collapse refusals to its uniform rejection.
///
/// Refusal reasons are logged at debug. Internal failures propagate unchanged.
pub async fn resolve(
    authenticator: &dyn Authenticator,
    headers: &HeaderMap,
) -> Result<Principal, AppError> {
    match authenticator.authenticate(headers).await {
        Ok(principal) => Ok(principal),
        Err(AuthFailure::Internal(err)) => Err(err),
        Err(reason) => {
            tracing::debug!(reason = %reason, "Authentication rejected");
            Err(authenticator.rejection())
        }
    }
}

/// Extract the token from an `Authorization` header value.
///
/// The value must be exactly two space-separated parts, the first being `Bearer`
/// in any letter case.
pub fn parse_bearer(value: &str) -> Result<&str, AuthFailure> {
    let mut parts = value.split(' ');

    match (parts.next(), parts.next(), parts.next()) {
        (Some(scheme), Some(token), None)
            if scheme.eq_ignore_ascii_case("bearer") && !token.is_empty() =>
        {
            Ok(token)
        }
        _ => Err(AuthFailure::MalformedHeader),
    }
}

fn header_value<'a>(headers: &'a HeaderMap, name: &str) -> Result<&'a str, AuthFailure> {
    headers
        .get(name)
        .ok_or(AuthFailure::MissingCredentials)?
        .to_str()
        .map_err(|_| AuthFailure::MalformedHeader)
}

/// Access-token strategy.
pub struct BearerTokenAuthenticator {
    tokens: Arc<TokenService>,
}

impl BearerTokenAuthenticator {
    pub fn new(tokens: Arc<TokenService>) -> Self {
        Self { tokens }
    }
}

#[async_trait]
impl Authenticator for BearerTokenAuthenticator {
    async fn authenticate(&self, headers: &HeaderMap) -> Result<Principal, AuthFailure> {
        let value = header_value(headers, header::AUTHORIZATION.as_str())?;
        let token = parse_bearer(value)?;
        let verified = self.tokens.verify(token, TokenType::Access)?;

        Ok(Principal::User {
            user_id: verified.user_id,
            email: verified.email,
        })
    }

    fn rejection(&self) -> AppError {
        AppError::Unauthorized
    }
}

/// Partner client-ID/secret strategy.
pub struct ClientCredentialAuthenticator {
    credentials: PartnerCredentialService,
}

impl ClientCredentialAuthenticator {
    pub fn new(credentials: PartnerCredentialService) -> Self {
        Self { credentials }
    }
}

#[async_trait]
impl Authenticator for ClientCredentialAuthenticator {
    async fn authenticate(&self, headers: &HeaderMap) -> Result<Principal, AuthFailure> {
        let client_id = header_value(headers, CLIENT_ID_HEADER)?;
        let client_secret = header_value(headers, CLIENT_SECRET_HEADER)?;

        self.credentials
            .validate_credential(client_id, client_secret)
            .await?
            .map(Principal::Partner)
            .ok_or(AuthFailure::CredentialMismatch)
    }

    fn rejection(&self) -> AppError {
        AppError::InvalidClientCredentials
    }
}

/// Developer API key strategy.
pub struct ApiKeyAuthenticator {
    api_keys: ApiKeyService,
}

impl ApiKeyAuthenticator {
    pub fn new(api_keys: ApiKeyService) -> Self {
        Self { api_keys }
    }
}

#[async_trait]
impl Authenticator for ApiKeyAuthenticator {
    async fn authenticate(&self, headers: &HeaderMap) -> Result<Principal, AuthFailure> {
        let key = header_value(headers, API_KEY_HEADER)?;

        self.api_keys
            .validate_key(key.trim())
            .await?
            .map(Principal::ApiKey)
            .ok_or(AuthFailure::CredentialMismatch)
    }

    fn rejection(&self) -> AppError {
        AppError::Unauthorized
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    const SECRET: &[u8] = b"gateway-test-secret-with-at-least-32-bytes";

    fn headers_with_authorization(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn bearer_scheme_is_case_insensitive() {
        assert_eq!(parse_bearer("Bearer abc").unwrap(), "abc");
        assert_eq!(parse_bearer("bearer abc").unwrap(), "abc");
        assert_eq!(parse_bearer("BEARER abc").unwrap(), "abc");
    }

    #[test]
    fn bearer_requires_exactly_two_parts() {
        for value in ["Bearer", "Bearer ", "Bearer a b", "Bearer  abc", "abc", ""] {
            assert!(
                matches!(parse_bearer(value), Err(AuthFailure::MalformedHeader)),
                "accepted {value:?}"
            );
        }
    }

    #[test]
    fn bearer_rejects_other_schemes() {
        assert!(matches!(
            parse_bearer("Basic dXNlcjpwYXNz"),
            Err(AuthFailure::MalformedHeader)
        ));
    }

    #[tokio::test]
    async fn bearer_strategy_accepts_access_token_only() {
        let tokens = Arc::new(TokenService::new(SECRET, 1).unwrap());
        let authenticator = BearerTokenAuthenticator::new(Arc::clone(&tokens));
        let user_id = Uuid::new_v4();
        let pair = tokens.issue_pair(user_id, "a@b.com").unwrap();

        let principal = authenticator
            .authenticate(&headers_with_authorization(&format!(
                "Bearer {}",
                pair.access_token
            )))
            .await
            .unwrap();
        match principal {
            Principal::User { user_id: id, email } => {
                assert_eq!(id, user_id);
                assert_eq!(email.as_deref(), Some("a@b.com"));
            }
            other => panic!("unexpected principal {other:?}"),
        }

        let refused = authenticator
            .authenticate(&headers_with_authorization(&format!(
                "Bearer {}",
                pair.refresh_token
            )))
            .await
            .unwrap_err();
        assert!(matches!(
            refused,
            AuthFailure::Token(TokenError::WrongType { .. })
        ));
    }

    #[tokio::test]
    async fn every_refusal_collapses_to_unauthorized() {
        let tokens = TokenService::new(SECRET, 1).unwrap();
        let authenticator = BearerTokenAuthenticator::new(Arc::new(tokens));

        let missing = resolve(&authenticator, &HeaderMap::new()).await.unwrap_err();
        assert!(matches!(missing, AppError::Unauthorized));

        let malformed = resolve(&authenticator, &headers_with_authorization("Token abc"))
            .await
            .unwrap_err();
        assert!(matches!(malformed, AppError::Unauthorized));

        let garbage = resolve(&authenticator, &headers_with_authorization("Bearer not.a.jwt"))
            .await
            .unwrap_err();
        assert!(matches!(garbage, AppError::Unauthorized));
    }
}
