//! Persistence seams for users and credentials.
//!
//! Services depend only on the traits below. Two engines implement them:
//! - [`postgres::PgStore`]: sqlx over PostgreSQL, used by the server
//! - [`memory::MemoryStore`]: in-process maps, used by tests
//!
//! Records are never removed. Lookups that feed authentication or listings only see
//! `active` rows unless noted otherwise.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use uuid::Uuid;

use crate::models::{
    api_key::{ApiKey, NewApiKey},
    partner_credential::{NewPartnerCredential, PartnerCredential, PartnerMetadata},
    status::AuthProvider,
    user::{NewUser, ProfileChanges, User},
};

/// Persistence failure.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Connection, query, or decoding failure.
    #[error("Database error: {0}")]
    Database(sqlx::Error),

    /// A unique constraint rejected the write. Carries the constraint or column name.
    #[error("Unique constraint violated: {0}")]
    Conflict(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.is_unique_violation() {
                let constraint = db_err.constraint().unwrap_or("unique").to_string();
                return StoreError::Conflict(constraint);
            }
        }
        StoreError::Database(err)
    }
}

/// Result of a quota-checked insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuotaOutcome<T> {
    /// The record was written.
    Inserted(T),
    /// The owner already holds `active` live records, at or above the ceiling.
    CeilingReached { active: i64 },
}

/// Developer account records.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert a new account. A duplicate email yields [`StoreError::Conflict`].
    async fn insert(&self, user: NewUser) -> Result<User, StoreError>;

    /// Active account by ID.
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError>;

    /// Active account by email.
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    /// Active account by federated identity.
    async fn find_by_provider(
        &self,
        provider: AuthProvider,
        provider_id: &str,
    ) -> Result<Option<User>, StoreError>;

    /// Overwrite the given profile fields, returning the updated account.
    async fn update_profile(
        &self,
        id: Uuid,
        changes: ProfileChanges,
    ) -> Result<Option<User>, StoreError>;

    /// Attach a federated identity to an existing account and mark it verified.
    async fn link_provider(
        &self,
        id: Uuid,
        provider: AuthProvider,
        provider_id: &str,
    ) -> Result<Option<User>, StoreError>;

    /// Whether any account, in any state, already holds this email.
    async fn email_exists(&self, email: &str) -> Result<bool, StoreError>;
}

/// API key records.
#[async_trait]
pub trait ApiKeyStore: Send + Sync {
    /// Insert unless the owner already has `ceiling` active keys.
    ///
    /// The count and the insert are atomic with respect to other quota-checked
    /// inserts for the same owner.
    async fn insert_within_quota(
        &self,
        key: NewApiKey,
        ceiling: i64,
    ) -> Result<QuotaOutcome<ApiKey>, StoreError>;

    /// Key by its lookup digest, in any state.
    async fn find_by_lookup_hash(&self, lookup_hash: &str) -> Result<Option<ApiKey>, StoreError>;

    /// Active keys of one owner, newest first.
    async fn list_active_by_user(&self, user_id: Uuid) -> Result<Vec<ApiKey>, StoreError>;

    /// Active key by ID, scoped to its owner.
    async fn find_by_id_and_user(
        &self,
        id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<ApiKey>, StoreError>;

    /// Move an active key to `inactive`. Returns `false` if no active owned key matched.
    async fn deactivate(&self, id: Uuid, user_id: Uuid) -> Result<bool, StoreError>;

    async fn touch_last_used(&self, id: Uuid) -> Result<(), StoreError>;

    async fn count_active_by_user(&self, user_id: Uuid) -> Result<i64, StoreError>;
}

/// Partner credential records.
#[async_trait]
pub trait PartnerCredentialStore: Send + Sync {
    /// Insert unless the owner already has `ceiling` active credentials.
    ///
    /// Same atomicity as [`ApiKeyStore::insert_within_quota`]. A client ID collision
    /// yields [`StoreError::Conflict`].
    async fn insert_within_quota(
        &self,
        credential: NewPartnerCredential,
        ceiling: i64,
    ) -> Result<QuotaOutcome<PartnerCredential>, StoreError>;

    async fn find_active_by_client_id(
        &self,
        client_id: &str,
    ) -> Result<Option<PartnerCredential>, StoreError>;

    /// Active credential by ID, scoped to its owner.
    async fn find_by_id_and_user(
        &self,
        id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<PartnerCredential>, StoreError>;

    /// Active credentials of one owner, newest first.
    async fn list_active_by_user(&self, user_id: Uuid)
    -> Result<Vec<PartnerCredential>, StoreError>;

    async fn update_metadata(
        &self,
        id: Uuid,
        user_id: Uuid,
        metadata: PartnerMetadata,
    ) -> Result<Option<PartnerCredential>, StoreError>;

    /// Set or clear the public key. `public_key_added_at` follows the key.
    async fn replace_public_key(
        &self,
        id: Uuid,
        user_id: Uuid,
        public_key: Option<String>,
        fingerprint: Option<String>,
    ) -> Result<Option<PartnerCredential>, StoreError>;

    /// Replace the secret in a single write. The old secret stops matching as soon
    /// as this returns.
    async fn rotate_secret(
        &self,
        id: Uuid,
        user_id: Uuid,
        client_secret: String,
        client_secret_prefix: String,
    ) -> Result<Option<PartnerCredential>, StoreError>;

    /// Move an active credential to `deleted`. Returns `false` if nothing matched.
    async fn soft_delete(&self, id: Uuid, user_id: Uuid) -> Result<bool, StoreError>;

    async fn touch_last_used(&self, id: Uuid) -> Result<(), StoreError>;

    async fn count_active_by_user(&self, user_id: Uuid) -> Result<i64, StoreError>;
}

/// Backing store connectivity check.
#[async_trait]
pub trait HealthProbe: Send + Sync {
    async fn ping(&self) -> Result<(), StoreError>;
}
