//! API key issuance, listing, revocation and validation.
//!
//! # Storage
//!
//! Each key is stored as two digests:
//! - an HMAC-SHA256 lookup hash under the server pepper, indexed and unique
//! - an Argon2id hash, checked after the lookup hit
//!
//! Validation is therefore one indexed read plus one Argon2 verification, instead
//! of a scan over every stored hash.

use std::sync::Arc;

use chrono::{Duration, Utc};
use uuid::Uuid;

use crate::{
    error::AppError,
    models::api_key::{
        ApiKey, ApiKeyCreatedResponse, ApiKeyResponse, CreateApiKeyRequest, NewApiKey,
    },
    services::quota::{CredentialKind, QuotaPolicy},
    store::ApiKeyStore,
    utils::{
        hashing::{LookupHasher, SecretHasher},
        secrets,
    },
};

const MAX_NAME_CHARS: usize = 100;
const MAX_EXPIRY_DAYS: i64 = 365;

#[derive(Clone)]
pub struct ApiKeyService {
    keys: Arc<dyn ApiKeyStore>,
    hasher: SecretHasher,
    lookup: LookupHasher,
    quota: QuotaPolicy,
}

impl ApiKeyService {
    pub fn new(
        keys: Arc<dyn ApiKeyStore>,
        hasher: SecretHasher,
        lookup: LookupHasher,
        quota: QuotaPolicy,
    ) -> Self {
        Self {
            keys,
            hasher,
            lookup,
            quota,
        }
    }

    /// Active keys of the account, newest first.
    pub async fn list(&self, user_id: Uuid) -> Result<Vec<ApiKeyResponse>, AppError> {
        let keys = self.keys.list_active_by_user(user_id).await?;
        Ok(keys.into_iter().map(Into::into).collect())
    }

    pub async fn get(&self, user_id: Uuid, key_id: Uuid) -> Result<ApiKeyResponse, AppError> {
        let key = self
            .keys
            .find_by_id_and_user(key_id, user_id)
            .await?
            .ok_or(AppError::ApiKeyNotFound)?;

        Ok(key.into())
    }

    /// Issue a new key.
    ///
    /// # Process
    ///
    /// 1. Validate name and expiry
    /// 2. Pre-check the quota before doing any hashing work
    /// 3. Generate the key, its lookup hash and its Argon2 hash
    /// 4. Insert under the quota lock
    /// 5. Return the plaintext once
    ///
    /// # Errors
    ///
    /// - `InvalidRequest`: name empty or longer than 100 chars, expiry outside 1..=365 days
    /// - `QuotaExceeded`: 10 active keys already exist
    /// - `Generation`: entropy or hashing failure
    pub async fn create(
        &self,
        user_id: Uuid,
        request: CreateApiKeyRequest,
    ) -> Result<ApiKeyCreatedResponse, AppError> {
        let name = request.name.trim().to_string();
        if name.is_empty() || name.chars().count() > MAX_NAME_CHARS {
            return Err(AppError::InvalidRequest(format!(
                "Name must be between 1 and {MAX_NAME_CHARS} characters"
            )));
        }

        let expires_at = match request.expires_in_days {
            Some(days) if !(1..=MAX_EXPIRY_DAYS).contains(&days) => {
                return Err(AppError::InvalidRequest(format!(
                    "expiresInDays must be between 1 and {MAX_EXPIRY_DAYS}"
                )));
            }
            Some(days) => Some(Utc::now() + Duration::days(days)),
            None => None,
        };

        let active = self.keys.count_active_by_user(user_id).await?;
        self.quota.check(CredentialKind::ApiKey, active)?;

        let generated = secrets::generate_api_key()?;
        let new_key = NewApiKey {
            user_id,
            name,
            key_prefix: generated.prefix,
            key_hash: self.hasher.hash(&generated.key)?,
            lookup_hash: self.lookup.digest(&generated.key),
            environment: request.environment,
            expires_at,
        };

        let outcome = self
            .keys
            .insert_within_quota(new_key, self.quota.ceiling(CredentialKind::ApiKey))
            .await?;
        let api_key = self.quota.admit(CredentialKind::ApiKey, outcome)?;

        tracing::info!(
            user_id = %user_id,
            credential_id = %api_key.id,
            environment = %api_key.environment,
            "API key issued"
        );

        Ok(ApiKeyCreatedResponse {
            api_key: api_key.into(),
            key: generated.key,
        })
    }

    /// Deactivate a key. The row is kept.
    ///
    /// # Errors
    ///
    /// - `ApiKeyNotFound`: no active key with this ID belongs to the account
    pub async fn revoke(&self, user_id: Uuid, key_id: Uuid) -> Result<(), AppError> {
        if !self.keys.deactivate(key_id, user_id).await? {
            return Err(AppError::ApiKeyNotFound);
        }

        tracing::info!(user_id = %user_id, credential_id = %key_id, "API key revoked");
        Ok(())
    }

    /// Resolve a presented key to its record.
    ///
    /// Returns `Ok(None)` for unknown, revoked, expired or mismatching keys. On
    /// success `last_used_at` is updated in the background; a failure there is
    /// logged and does not affect the result.
    pub async fn validate_key(&self, presented: &str) -> Result<Option<ApiKey>, AppError> {
        if !secrets::is_api_key_format(presented) {
            tracing::debug!("API key rejected: malformed");
            return Ok(None);
        }

        let lookup_hash = self.lookup.digest(presented);
        let Some(key) = self.keys.find_by_lookup_hash(&lookup_hash).await? else {
            tracing::debug!("API key rejected: unknown key");
            return Ok(None);
        };

        if !key.status.is_active() {
            tracing::debug!(credential_id = %key.id, "API key rejected: not active");
            return Ok(None);
        }
        if key.is_expired(Utc::now()) {
            tracing::debug!(credential_id = %key.id, "API key rejected: expired");
            return Ok(None);
        }
        if !self.hasher.verify(presented, &key.key_hash) {
            tracing::debug!(credential_id = %key.id, "API key rejected: hash mismatch");
            return Ok(None);
        }

        let keys = Arc::clone(&self.keys);
        let key_id = key.id;
        tokio::spawn(async move {
            if let Err(e) = keys.touch_last_used(key_id).await {
                tracing::warn!(credential_id = %key_id, error = %e, "Failed to update API key last_used_at");
            }
        });

        Ok(Some(key))
    }
}
