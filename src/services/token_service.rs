//! Session token issuance and verification.
//!
//! Tokens are compact JWTs signed with a shared HMAC secret. Every token carries a
//! `type` claim (`access` or `refresh`) and is only accepted by the operation that
//! expects that type.
//!
//! # Claims
//!
//! | Claim   | Access | Refresh | Meaning                          |
//! |---------|--------|---------|----------------------------------|
//! | `sub`   | yes    | yes     | user ID (UUID string)            |
//! | `email` | yes    | no      | user email, display only         |
//! | `type`  | yes    | yes     | `access` / `refresh`             |
//! | `iat`   | yes    | yes     | issued at, Unix seconds          |
//! | `exp`   | yes    | yes     | expiry, Unix seconds             |
//! | `jti`   | yes    | yes     | random token ID                  |
//!
//! There is no revocation list. A token ends only when it expires, and refresh tokens
//! are not chained: a refresh mints a new pair and the old refresh token stays valid
//! until its own expiry.

use std::fmt;

use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Refresh tokens live this many times longer than access tokens.
pub const REFRESH_LIFETIME_MULTIPLIER: i64 = 7;

/// Longest accepted access token lifetime (one year).
pub const MAX_ACCESS_EXPIRY_HOURS: i64 = 8760;

/// Algorithms accepted on verification. Anything outside the HMAC family is rejected.
const HMAC_ALGORITHMS: [Algorithm; 3] = [Algorithm::HS256, Algorithm::HS384, Algorithm::HS512];

/// Token type discriminator carried in the `type` claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

impl fmt::Display for TokenType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenType::Access => f.write_str("access"),
            TokenType::Refresh => f.write_str("refresh"),
        }
    }
}

/// Reasons a token is refused. Callers collapse these to a single unauthorized
/// outcome; the variants exist for logs.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("token has expired")]
    Expired,

    #[error("token signature is invalid")]
    InvalidSignature,

    #[error("token algorithm is not in the HMAC family")]
    InvalidAlgorithm,

    #[error("token is malformed: {0}")]
    Malformed(String),

    #[error("expected {expected} token, got {found}")]
    WrongType { expected: TokenType, found: TokenType },

    #[error("token subject is not a valid user ID")]
    InvalidSubject,

    #[error("token encoding failed: {0}")]
    Encoding(String),

    #[error("access token lifetime must be between 1 and {MAX_ACCESS_EXPIRY_HOURS} hours, got {0}")]
    InvalidLifetime(i64),
}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        match err.kind() {
            ErrorKind::ExpiredSignature => TokenError::Expired,
            ErrorKind::InvalidSignature => TokenError::InvalidSignature,
            ErrorKind::InvalidAlgorithm | ErrorKind::InvalidAlgorithmName => {
                TokenError::InvalidAlgorithm
            }
            _ => TokenError::Malformed(err.to_string()),
        }
    }
}

/// JWT claim set for both token types.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    pub sub: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    #[serde(rename = "type")]
    pub token_type: TokenType,

    pub exp: i64,

    pub iat: i64,

    pub jti: String,
}

/// A token that passed signature, expiry, type and subject checks.
#[derive(Debug, Clone)]
pub struct VerifiedToken {
    pub user_id: Uuid,
    pub email: Option<String>,
    pub claims: TokenClaims,
}

/// Access + refresh pair handed to the client after login, registration or refresh.
#[derive(Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    /// Access token lifetime in seconds
    pub expires_in: i64,
}

impl fmt::Debug for TokenPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenPair")
            .field("expires_in", &self.expires_in)
            .finish_non_exhaustive()
    }
}

/// Issues and verifies session tokens.
///
/// The signing secret is injected at construction; nothing here reads global state.
#[derive(Clone)]
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_lifetime: Duration,
    refresh_lifetime: Duration,
}

impl TokenService {
    /// Create a token service.
    ///
    /// # Arguments
    ///
    /// * `secret` - shared HMAC signing secret
    /// * `access_expiry_hours` - access token lifetime; refresh tokens get 7x this
    ///
    /// # Errors
    ///
    /// [`TokenError::InvalidLifetime`] unless `1 <= access_expiry_hours <= MAX_ACCESS_EXPIRY_HOURS`.
    pub fn new(secret: &[u8], access_expiry_hours: i64) -> Result<Self, TokenError> {
        if !(1..=MAX_ACCESS_EXPIRY_HOURS).contains(&access_expiry_hours) {
            return Err(TokenError::InvalidLifetime(access_expiry_hours));
        }

        let invalid = TokenError::InvalidLifetime(access_expiry_hours);
        let access_lifetime = Duration::try_hours(access_expiry_hours).ok_or(invalid.clone())?;
        let refresh_lifetime = access_expiry_hours
            .checked_mul(REFRESH_LIFETIME_MULTIPLIER)
            .and_then(Duration::try_hours)
            .ok_or(invalid)?;

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            access_lifetime,
            refresh_lifetime,
        })
    }

    /// Access token lifetime in seconds.
    pub fn access_lifetime_seconds(&self) -> i64 {
        self.access_lifetime.num_seconds()
    }

    /// Mint a fresh access + refresh pair for a user.
    pub fn issue_pair(&self, user_id: Uuid, email: &str) -> Result<TokenPair, TokenError> {
        let now = Utc::now();

        let access_claims = TokenClaims {
            sub: user_id.to_string(),
            email: Some(email.to_string()),
            token_type: TokenType::Access,
            exp: (now + self.access_lifetime).timestamp(),
            iat: now.timestamp(),
            jti: Uuid::new_v4().to_string(),
        };

        let refresh_claims = TokenClaims {
            sub: user_id.to_string(),
            email: None,
            token_type: TokenType::Refresh,
            exp: (now + self.refresh_lifetime).timestamp(),
            iat: now.timestamp(),
            jti: Uuid::new_v4().to_string(),
        };

        Ok(TokenPair {
            access_token: self.sign(&access_claims)?,
            refresh_token: self.sign(&refresh_claims)?,
            expires_in: self.access_lifetime_seconds(),
        })
    }

    /// Verify a token for a specific use.
    ///
    /// # Checks (in order)
    ///
    /// 1. Header algorithm is HS256/HS384/HS512
    /// 2. Signature matches the shared secret
    /// 3. `exp` is not in the past (no leeway)
    /// 4. `type` equals `expected`
    /// 5. `sub` parses as a UUID
    pub fn verify(&self, token: &str, expected: TokenType) -> Result<VerifiedToken, TokenError> {
        let data = decode::<TokenClaims>(token, &self.decoding_key, &Self::validation())?;
        let claims = data.claims;

        if claims.token_type != expected {
            return Err(TokenError::WrongType {
                expected,
                found: claims.token_type,
            });
        }

        let user_id = Uuid::parse_str(&claims.sub).map_err(|_| TokenError::InvalidSubject)?;

        Ok(VerifiedToken {
            user_id,
            email: claims.email.clone(),
            claims,
        })
    }

    fn sign(&self, claims: &TokenClaims) -> Result<String, TokenError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)
            .map_err(|e| TokenError::Encoding(e.to_string()))
    }

    fn validation() -> Validation {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.algorithms = HMAC_ALGORITHMS.to_vec();
        validation.leeway = 0;
        validation.validate_exp = true;
        validation
    }
}
