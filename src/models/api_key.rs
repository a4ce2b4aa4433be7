//! API Key model for developer authentication.
//!
//! API keys are long-lived bearer secrets scoped to one user and one environment.
//! Only a display prefix and two digests are stored:
//! - `lookup_hash`: HMAC-SHA256 of the key under a server pepper, used as the index
//! - `key_hash`: Argon2id hash of the key, used for final verification
//!
//! The plaintext key exists only in the creation response.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::status::{Environment, RecordStatus};

/// Represents an API key record from the database.
///
/// # Database Table
///
/// Maps to the `api_keys` table.
#[derive(Clone, sqlx::FromRow)]
pub struct ApiKey {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,

    /// Namespace tag + first 8 hex chars, e.g. `bas_1a2b3c4d`
    pub key_prefix: String,

    /// Argon2id PHC string of the full key
    pub key_hash: String,

    /// Keyed digest of the full key (unique)
    pub lookup_hash: String,

    pub environment: Environment,
    pub status: RecordStatus,
    pub last_used_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiKey")
            .field("id", &self.id)
            .field("user_id", &self.user_id)
            .field("name", &self.name)
            .field("key_prefix", &self.key_prefix)
            .field("key_hash", &"<redacted>")
            .field("lookup_hash", &"<redacted>")
            .field("environment", &self.environment)
            .field("status", &self.status)
            .field("last_used_at", &self.last_used_at)
            .field("expires_at", &self.expires_at)
            .field("created_at", &self.created_at)
            .field("updated_at", &self.updated_at)
            .finish()
    }
}

impl ApiKey {
    /// Whether the key has passed its expiry time.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expires_at| expires_at <= now)
    }
}

/// Fields required to create an API key.
#[derive(Clone)]
pub struct NewApiKey {
    pub user_id: Uuid,
    pub name: String,
    pub key_prefix: String,
    pub key_hash: String,
    pub lookup_hash: String,
    pub environment: Environment,
    pub expires_at: Option<DateTime<Utc>>,
}

impl fmt::Debug for NewApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NewApiKey")
            .field("user_id", &self.user_id)
            .field("name", &self.name)
            .field("key_prefix", &self.key_prefix)
            .field("environment", &self.environment)
            .field("expires_at", &self.expires_at)
            .finish_non_exhaustive()
    }
}

/// Request body for `POST /api/v1/api-keys`.
///
/// ```json
/// { "name": "CI pipeline", "environment": "sandbox", "expiresInDays": 90 }
/// ```
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateApiKeyRequest {
    pub name: String,

    #[serde(default)]
    pub environment: Environment,

    /// Optional lifetime, 1..=365 days
    #[serde(default)]
    pub expires_in_days: Option<i64>,
}

/// API key as shown in listings. Never includes either digest.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiKeyResponse {
    pub id: Uuid,
    pub name: String,
    pub key_prefix: String,
    pub environment: Environment,
    pub is_active: bool,
    pub last_used_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<ApiKey> for ApiKeyResponse {
    fn from(key: ApiKey) -> Self {
        Self {
            id: key.id,
            name: key.name,
            key_prefix: key.key_prefix,
            environment: key.environment,
            is_active: key.status.is_active(),
            last_used_at: key.last_used_at,
            expires_at: key.expires_at,
            created_at: key.created_at,
        }
    }
}

/// Creation response. `key` is the plaintext and is only ever returned here.
#[derive(Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiKeyCreatedResponse {
    #[serde(flatten)]
    pub api_key: ApiKeyResponse,
    pub key: String,
}

impl fmt::Debug for ApiKeyCreatedResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiKeyCreatedResponse")
            .field("api_key", &self.api_key)
            .finish_non_exhaustive()
    }
}
