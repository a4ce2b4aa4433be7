//! Partner (SNAP) credential lifecycle.
//!
//! This service handles:
//! - Issuance under the per-account quota
//! - Metadata and public key updates
//! - Secret rotation
//! - Soft deletion
//! - Client-ID/secret verification
//!
//! # Secret Visibility
//!
//! The client secret appears in exactly two responses: creation and rotation.
//! Everything else shows only its prefix.

use std::net::IpAddr;
use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::{
    error::AppError,
    models::partner_credential::{
        CreatePartnerCredentialRequest, NewPartnerCredential, PartnerCredential,
        PartnerCredentialDetailResponse, PartnerCredentialResponse,
        PartnerCredentialSecretResponse, PartnerMetadata, UpdatePartnerCredentialRequest,
        UpdatePublicKeyRequest,
    },
    services::quota::{CredentialKind, QuotaPolicy},
    store::{PartnerCredentialStore, StoreError},
    utils::{hashing::constant_time_eq, public_key::validate_public_key, secrets},
};

/// Stand-in secret compared on a client ID miss.
const UNKNOWN_CLIENT_SECRET: &str =
    "0000000000000000000000000000000000000000000000000000000000000000";

const MAX_PARTNER_NAME_CHARS: usize = 255;
const MAX_CALLBACK_URL_LEN: usize = 2048;

#[derive(Clone)]
pub struct PartnerCredentialService {
    credentials: Arc<dyn PartnerCredentialStore>,
    quota: QuotaPolicy,
}

impl PartnerCredentialService {
    pub fn new(credentials: Arc<dyn PartnerCredentialStore>, quota: QuotaPolicy) -> Self {
        Self { credentials, quota }
    }

    /// Active credentials of the account, newest first.
    pub async fn list(&self, user_id: Uuid) -> Result<Vec<PartnerCredentialResponse>, AppError> {
        let credentials = self.credentials.list_active_by_user(user_id).await?;
        Ok(credentials.into_iter().map(Into::into).collect())
    }

    /// One credential with its public key masked.
    pub async fn get(
        &self,
        user_id: Uuid,
        credential_id: Uuid,
    ) -> Result<PartnerCredentialDetailResponse, AppError> {
        let credential = self
            .credentials
            .find_by_id_and_user(credential_id, user_id)
            .await?
            .ok_or(AppError::CredentialNotFound)?;

        Ok(credential.into())
    }

    /// Issue a new credential.
    ///
    /// # Process
    ///
    /// 1. Validate partner name, callback URL, IP allow-list and public key
    /// 2. Pre-check the quota
    /// 3. Generate client ID, secret and channel ID
    /// 4. Insert under the quota lock
    /// 5. Return the secret once
    ///
    /// # Errors
    ///
    /// - `InvalidRequest` / `InvalidPublicKey`: input rejected
    /// - `QuotaExceeded`: 5 active credentials already exist
    /// - `Generation`: entropy failure or client ID collision
    pub async fn create(
        &self,
        user_id: Uuid,
        request: CreatePartnerCredentialRequest,
    ) -> Result<PartnerCredentialSecretResponse, AppError> {
        let partner_name = validate_partner_name(&request.partner_name)?;
        let callback_url = validate_callback_url(request.callback_url)?;
        let ip_whitelist = validate_ip_whitelist(request.ip_whitelist)?;

        let public_key = request
            .public_key
            .map(|pem| pem.trim().to_string())
            .filter(|pem| !pem.is_empty());
        let public_key_fingerprint = match &public_key {
            Some(pem) => validate_public_key(pem)?,
            None => None,
        };

        let active = self.credentials.count_active_by_user(user_id).await?;
        self.quota.check(CredentialKind::PartnerCredential, active)?;

        let secret = secrets::generate_client_secret()?;
        let new_credential = NewPartnerCredential {
            user_id,
            client_id: secrets::generate_client_id()?,
            client_secret: secret.secret.clone(),
            client_secret_prefix: secret.prefix,
            public_key,
            public_key_fingerprint,
            partner_name,
            channel_id: secrets::generate_channel_id()?,
            environment: request.environment,
            callback_url,
            ip_whitelist,
        };

        let outcome = self
            .credentials
            .insert_within_quota(
                new_credential,
                self.quota.ceiling(CredentialKind::PartnerCredential),
            )
            .await
            .map_err(|e| match e {
                StoreError::Conflict(_) => {
                    AppError::Generation("generated client ID already exists".to_string())
                }
                other => AppError::Store(other),
            })?;
        let credential = self
            .quota
            .admit(CredentialKind::PartnerCredential, outcome)?;

        tracing::info!(
            user_id = %user_id,
            credential_id = %credential.id,
            client_id = %credential.client_id,
            "Partner credential issued"
        );

        Ok(PartnerCredentialSecretResponse {
            credential: credential.into(),
            client_secret: secret.secret,
        })
    }

    /// Replace partner metadata. Omitted name and environment keep their values.
    pub async fn update(
        &self,
        user_id: Uuid,
        credential_id: Uuid,
        request: UpdatePartnerCredentialRequest,
    ) -> Result<PartnerCredentialResponse, AppError> {
        let current = self
            .credentials
            .find_by_id_and_user(credential_id, user_id)
            .await?
            .ok_or(AppError::CredentialNotFound)?;

        let partner_name = match request.partner_name {
            Some(name) => validate_partner_name(&name)?,
            None => current.partner_name,
        };

        let metadata = PartnerMetadata {
            partner_name,
            environment: request.environment.unwrap_or(current.environment),
            callback_url: validate_callback_url(request.callback_url)?,
            ip_whitelist: validate_ip_whitelist(request.ip_whitelist)?,
        };

        let credential = self
            .credentials
            .update_metadata(credential_id, user_id, metadata)
            .await?
            .ok_or(AppError::CredentialNotFound)?;

        tracing::info!(user_id = %user_id, credential_id = %credential.id, "Partner credential updated");

        Ok(credential.into())
    }

    /// Set, replace or clear (empty input) the public key. The secret is untouched.
    pub async fn update_public_key(
        &self,
        user_id: Uuid,
        credential_id: Uuid,
        request: UpdatePublicKeyRequest,
    ) -> Result<PartnerCredentialDetailResponse, AppError> {
        let pem = request.public_key.trim().to_string();
        let fingerprint = validate_public_key(&pem)?;
        let public_key = fingerprint.as_ref().map(|_| pem);

        let credential = self
            .credentials
            .replace_public_key(credential_id, user_id, public_key, fingerprint)
            .await?
            .ok_or(AppError::CredentialNotFound)?;

        tracing::info!(
            user_id = %user_id,
            credential_id = %credential.id,
            has_public_key = credential.public_key.is_some(),
            "Partner public key replaced"
        );

        Ok(credential.into())
    }

    /// Soft-delete a credential. Its client ID stays reserved.
    pub async fn delete(&self, user_id: Uuid, credential_id: Uuid) -> Result<(), AppError> {
        if !self.credentials.soft_delete(credential_id, user_id).await? {
            return Err(AppError::CredentialNotFound);
        }

        tracing::info!(user_id = %user_id, credential_id = %credential_id, "Partner credential deleted");
        Ok(())
    }

    /// Rotate the client secret.
    ///
    /// Identity, metadata, public key and quota slot are preserved. The previous
    /// secret stops verifying as soon as the single-row update commits.
    pub async fn regenerate_secret(
        &self,
        user_id: Uuid,
        credential_id: Uuid,
    ) -> Result<PartnerCredentialSecretResponse, AppError> {
        let secret = secrets::generate_client_secret()?;

        let credential = self
            .credentials
            .rotate_secret(credential_id, user_id, secret.secret.clone(), secret.prefix)
            .await?
            .ok_or(AppError::CredentialNotFound)?;

        tracing::info!(
            user_id = %user_id,
            credential_id = %credential.id,
            client_id = %credential.client_id,
            "Partner secret rotated"
        );

        Ok(PartnerCredentialSecretResponse {
            credential: credential.into(),
            client_secret: secret.secret,
        })
    }

    /// Resolve a client-ID/secret pair.
    ///
    /// Returns `Ok(None)` for an unknown client ID, an expired credential, or a secret
    /// mismatch, without telling them apart. The secret comparison is constant-time
    /// and also runs, against a stand-in, when the client ID is unknown.
    /// `last_used_at` is updated in the background on success.
    pub async fn validate_credential(
        &self,
        client_id: &str,
        client_secret: &str,
    ) -> Result<Option<PartnerCredential>, AppError> {
        let Some(credential) = self.credentials.find_active_by_client_id(client_id).await? else {
            std::hint::black_box(constant_time_eq(UNKNOWN_CLIENT_SECRET, client_secret));
            tracing::debug!("Client credential rejected: unknown client ID");
            return Ok(None);
        };

        if !constant_time_eq(&credential.client_secret, client_secret) {
            tracing::debug!(credential_id = %credential.id, "Client credential rejected: secret mismatch");
            return Ok(None);
        }
        if credential.is_expired(Utc::now()) {
            tracing::debug!(credential_id = %credential.id, "Client credential rejected: expired");
            return Ok(None);
        }

        let credentials = Arc::clone(&self.credentials);
        let credential_id = credential.id;
        tokio::spawn(async move {
            if let Err(e) = credentials.touch_last_used(credential_id).await {
                tracing::warn!(
                    credential_id = %credential_id,
                    error = %e,
                    "Failed to update partner credential last_used_at"
                );
            }
        });

        Ok(Some(credential))
    }
}

fn validate_partner_name(name: &str) -> Result<String, AppError> {
    let name = name.trim();
    if name.is_empty() || name.chars().count() > MAX_PARTNER_NAME_CHARS {
        return Err(AppError::InvalidRequest(format!(
            "partnerName must be between 1 and {MAX_PARTNER_NAME_CHARS} characters"
        )));
    }
    Ok(name.to_string())
}

/// Validate an optional callback URL.
///
/// # Rules
///
/// - Empty or missing means no callback
/// - Must be a valid absolute URL with `http` or `https` scheme
/// - Maximum 2048 characters
fn validate_callback_url(url: Option<String>) -> Result<Option<String>, AppError> {
    let Some(url) = url.map(|u| u.trim().to_string()).filter(|u| !u.is_empty()) else {
        return Ok(None);
    };

    if url.len() > MAX_CALLBACK_URL_LEN {
        return Err(AppError::InvalidRequest(format!(
            "callbackUrl exceeds {MAX_CALLBACK_URL_LEN} characters"
        )));
    }

    let parsed = url::Url::parse(&url)
        .map_err(|_| AppError::InvalidRequest("callbackUrl is not a valid URL".to_string()))?;

    match parsed.scheme() {
        "http" | "https" if parsed.host_str().is_some() => Ok(Some(url)),
        _ => Err(AppError::InvalidRequest(
            "callbackUrl must use HTTP or HTTPS".to_string(),
        )),
    }
}

/// Each entry must be a single IPv4 or IPv6 address. Entries are stored in
/// canonical form.
fn validate_ip_whitelist(entries: Vec<String>) -> Result<Vec<String>, AppError> {
    entries
        .iter()
        .map(|entry| {
            entry
                .trim()
                .parse::<IpAddr>()
                .map(|ip| ip.to_string())
                .map_err(|_| AppError::InvalidRequest(format!("Invalid IP address: {entry}")))
        })
        .collect()
}
