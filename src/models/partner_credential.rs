//! Partner (SNAP) credential model.
//!
//! A partner credential is a client-ID/secret pair used for machine-to-machine
//! authentication, optionally bound to an RSA public key for request signing.
//!
//! # Secret Storage
//!
//! `client_secret` is persisted in retrievable form. This is a known weakness. A
//! hardened deployment must hash or encrypt it at rest and verify against that form.
//! Comparison is constant-time either way.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::status::{Environment, RecordStatus};
use crate::utils::public_key::{format_fingerprint, mask_public_key};

/// Represents a partner credential record from the database.
///
/// # Database Table
///
/// Maps to the `partner_credentials` table. `client_id` is unique across all users
/// and stays reserved after soft deletion.
#[derive(Clone, PartialEq, sqlx::FromRow)]
pub struct PartnerCredential {
    pub id: Uuid,
    pub user_id: Uuid,
    pub client_id: String,

    /// Plaintext secret, never serialized
    pub client_secret: String,

    /// First 8 chars of the secret + `...`
    pub client_secret_prefix: String,

    /// PEM public key, if configured
    pub public_key: Option<String>,

    /// SHA-256 of the key's DER bytes, 64 lowercase hex chars
    pub public_key_fingerprint: Option<String>,

    pub public_key_added_at: Option<DateTime<Utc>>,
    pub partner_name: String,
    pub channel_id: String,
    pub environment: Environment,
    pub callback_url: Option<String>,
    pub ip_whitelist: Vec<String>,
    pub status: RecordStatus,
    pub expires_at: Option<DateTime<Utc>>,
    pub last_used_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl fmt::Debug for PartnerCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PartnerCredential")
            .field("id", &self.id)
            .field("user_id", &self.user_id)
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("client_secret_prefix", &self.client_secret_prefix)
            .field("public_key", &self.public_key)
            .field("public_key_fingerprint", &self.public_key_fingerprint)
            .field("public_key_added_at", &self.public_key_added_at)
            .field("partner_name", &self.partner_name)
            .field("channel_id", &self.channel_id)
            .field("environment", &self.environment)
            .field("callback_url", &self.callback_url)
            .field("ip_whitelist", &self.ip_whitelist)
            .field("status", &self.status)
            .field("expires_at", &self.expires_at)
            .field("last_used_at", &self.last_used_at)
            .field("created_at", &self.created_at)
            .field("updated_at", &self.updated_at)
            .finish()
    }
}

impl PartnerCredential {
    /// Whether the credential has passed its expiry time.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expires_at| expires_at <= now)
    }
}

/// Fields required to create a partner credential.
#[derive(Clone)]
pub struct NewPartnerCredential {
    pub user_id: Uuid,
    pub client_id: String,
    pub client_secret: String,
    pub client_secret_prefix: String,
    pub public_key: Option<String>,
    pub public_key_fingerprint: Option<String>,
    pub partner_name: String,
    pub channel_id: String,
    pub environment: Environment,
    pub callback_url: Option<String>,
    pub ip_whitelist: Vec<String>,
}

impl fmt::Debug for NewPartnerCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NewPartnerCredential")
            .field("user_id", &self.user_id)
            .field("client_id", &self.client_id)
            .field("client_secret_prefix", &self.client_secret_prefix)
            .field("public_key", &self.public_key)
            .field("public_key_fingerprint", &self.public_key_fingerprint)
            .field("partner_name", &self.partner_name)
            .field("channel_id", &self.channel_id)
            .field("environment", &self.environment)
            .field("callback_url", &self.callback_url)
            .field("ip_whitelist", &self.ip_whitelist)
            .finish_non_exhaustive()
    }
}

/// Metadata fields that may be changed after creation.
#[derive(Debug, Clone)]
pub struct PartnerMetadata {
    pub partner_name: String,
    pub environment: Environment,
    pub callback_url: Option<String>,
    pub ip_whitelist: Vec<String>,
}

/// Request body for `POST /api/v1/partner-credentials`.
///
/// ```json
/// {
///   "partnerName": "Acme Payments",
///   "environment": "sandbox",
///   "callbackUrl": "https://acme.example/snap/callback",
///   "ipWhitelist": ["203.0.113.10"],
///   "publicKey": "-----BEGIN PUBLIC KEY-----\n..."
/// }
/// ```
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePartnerCredentialRequest {
    pub partner_name: String,

    #[serde(default)]
    pub environment: Environment,

    #[serde(default)]
    pub callback_url: Option<String>,

    #[serde(default)]
    pub ip_whitelist: Vec<String>,

    #[serde(default)]
    pub public_key: Option<String>,
}

/// Request body for `PUT /api/v1/partner-credentials/{id}`.
///
/// `partnerName` and `environment` keep their stored values when omitted.
/// `callbackUrl` and `ipWhitelist` are replaced as given.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePartnerCredentialRequest {
    #[serde(default)]
    pub partner_name: Option<String>,

    #[serde(default)]
    pub environment: Option<Environment>,

    #[serde(default)]
    pub callback_url: Option<String>,

    #[serde(default)]
    pub ip_whitelist: Vec<String>,
}

/// Request body for `PUT /api/v1/partner-credentials/{id}/public-key`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePublicKeyRequest {
    pub public_key: String,
}

/// Partner credential as shown in listings.
///
/// The fingerprint is rendered in its display form. The secret and the PEM are
/// never included.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PartnerCredentialResponse {
    pub id: Uuid,
    pub client_id: String,
    pub client_secret_prefix: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_key_fingerprint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_key_added_at: Option<DateTime<Utc>>,
    pub partner_name: String,
    pub channel_id: String,
    pub environment: Environment,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub callback_url: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub ip_whitelist: Vec<String>,
    pub is_active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_used_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<&PartnerCredential> for PartnerCredentialResponse {
    fn from(credential: &PartnerCredential) -> Self {
        Self {
            id: credential.id,
            client_id: credential.client_id.clone(),
            client_secret_prefix: credential.client_secret_prefix.clone(),
            public_key_fingerprint: credential
                .public_key_fingerprint
                .as_deref()
                .map(format_fingerprint),
            public_key_added_at: credential.public_key_added_at,
            partner_name: credential.partner_name.clone(),
            channel_id: credential.channel_id.clone(),
            environment: credential.environment,
            callback_url: credential.callback_url.clone(),
            ip_whitelist: credential.ip_whitelist.clone(),
            is_active: credential.status.is_active(),
            expires_at: credential.expires_at,
            last_used_at: credential.last_used_at,
            created_at: credential.created_at,
        }
    }
}

impl From<PartnerCredential> for PartnerCredentialResponse {
    fn from(credential: PartnerCredential) -> Self {
        Self::from(&credential)
    }
}

/// Creation and rotation response. `client_secret` is only ever returned here.
#[derive(Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PartnerCredentialSecretResponse {
    #[serde(flatten)]
    pub credential: PartnerCredentialResponse,
    pub client_secret: String,
}

impl fmt::Debug for PartnerCredentialSecretResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PartnerCredentialSecretResponse")
            .field("credential", &self.credential)
            .finish_non_exhaustive()
    }
}

/// Detail view with a masked public key.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PartnerCredentialDetailResponse {
    #[serde(flatten)]
    pub credential: PartnerCredentialResponse,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_key: Option<String>,
}

impl From<PartnerCredential> for PartnerCredentialDetailResponse {
    fn from(credential: PartnerCredential) -> Self {
        Self {
            public_key: credential.public_key.as_deref().map(mask_public_key),
            credential: PartnerCredentialResponse::from(&credential),
        }
    }
}
