//! In-process store with the same observable semantics as [`super::postgres::PgStore`].
//!
//! All tables sit behind one `RwLock`, so every trait operation (including the
//! quota-checked inserts) is atomic.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use uuid::Uuid;

use crate::{
    models::{
        api_key::{ApiKey, NewApiKey},
        partner_credential::{NewPartnerCredential, PartnerCredential, PartnerMetadata},
        status::{AuthProvider, RecordStatus},
        user::{NewUser, ProfileChanges, User},
    },
    store::{
        ApiKeyStore, HealthProbe, PartnerCredentialStore, QuotaOutcome, StoreError, UserStore,
    },
};

#[derive(Debug, Default)]
struct Tables {
    users: HashMap<Uuid, User>,
    api_keys: HashMap<Uuid, ApiKey>,
    partner_credentials: HashMap<Uuid, PartnerCredential>,
}

impl Tables {
    fn active_api_keys(&self, user_id: Uuid) -> i64 {
        self.api_keys
            .values()
            .filter(|k| k.user_id == user_id && k.status.is_active())
            .count() as i64
    }

    fn active_partner_credentials(&self, user_id: Uuid) -> i64 {
        self.partner_credentials
            .values()
            .filter(|c| c.user_id == user_id && c.status.is_active())
            .count() as i64
    }

    fn owned_partner_credential(
        &mut self,
        id: Uuid,
        user_id: Uuid,
    ) -> Option<&mut PartnerCredential> {
        self.partner_credentials
            .get_mut(&id)
            .filter(|c| c.user_id == user_id && c.status.is_active())
    }
}

/// Map-backed store for tests and local experiments.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
    fail_touch_last_used: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every `touch_last_used` call fail, to exercise best-effort paths.
    pub fn set_fail_touch_last_used(&self, fail: bool) {
        self.fail_touch_last_used.store(fail, Ordering::SeqCst);
    }

    /// Snapshot of an API key in any state.
    pub fn api_key(&self, id: Uuid) -> Option<ApiKey> {
        self.tables.read().api_keys.get(&id).cloned()
    }

    /// Snapshot of a partner credential in any state.
    pub fn partner_credential(&self, id: Uuid) -> Option<PartnerCredential> {
        self.tables.read().partner_credentials.get(&id).cloned()
    }

    fn touch_failure(&self) -> Result<(), StoreError> {
        if self.fail_touch_last_used.load(Ordering::SeqCst) {
            return Err(StoreError::Database(sqlx::Error::PoolTimedOut));
        }
        Ok(())
    }
}

fn newest_first<T, F>(mut rows: Vec<T>, created_at: F) -> Vec<T>
where
    F: Fn(&T) -> chrono::DateTime<Utc>,
{
    rows.sort_by(|a, b| created_at(b).cmp(&created_at(a)));
    rows
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn insert(&self, user: NewUser) -> Result<User, StoreError> {
        let mut tables = self.tables.write();
        if tables.users.values().any(|u| u.email == user.email) {
            return Err(StoreError::Conflict("users_email_key".to_string()));
        }

        let now = Utc::now();
        let record = User {
            id: Uuid::new_v4(),
            email: user.email,
            password_hash: user.password_hash,
            full_name: user.full_name,
            first_name: None,
            last_name: None,
            job_title: None,
            company: None,
            profile_picture: None,
            provider: user.provider,
            provider_id: user.provider_id,
            is_verified: user.is_verified,
            status: RecordStatus::Active,
            created_at: now,
            updated_at: now,
        };
        tables.users.insert(record.id, record.clone());

        Ok(record)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(self
            .tables
            .read()
            .users
            .get(&id)
            .filter(|u| u.status.is_active())
            .cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        Ok(self
            .tables
            .read()
            .users
            .values()
            .find(|u| u.email == email && u.status.is_active())
            .cloned())
    }

    async fn find_by_provider(
        &self,
        provider: AuthProvider,
        provider_id: &str,
    ) -> Result<Option<User>, StoreError> {
        Ok(self
            .tables
            .read()
            .users
            .values()
            .find(|u| {
                u.provider == provider
                    && u.provider_id.as_deref() == Some(provider_id)
                    && u.status.is_active()
            })
            .cloned())
    }

    async fn update_profile(
        &self,
        id: Uuid,
        changes: ProfileChanges,
    ) -> Result<Option<User>, StoreError> {
        let mut tables = self.tables.write();
        let Some(user) = tables.users.get_mut(&id).filter(|u| u.status.is_active()) else {
            return Ok(None);
        };

        if let Some(full_name) = changes.full_name {
            user.full_name = full_name;
        }
        if changes.first_name.is_some() {
            user.first_name = changes.first_name;
        }
        if changes.last_name.is_some() {
            user.last_name = changes.last_name;
        }
        if changes.job_title.is_some() {
            user.job_title = changes.job_title;
        }
        if changes.company.is_some() {
            user.company = changes.company;
        }
        if changes.profile_picture.is_some() {
            user.profile_picture = changes.profile_picture;
        }
        user.updated_at = Utc::now();

        Ok(Some(user.clone()))
    }

    async fn link_provider(
        &self,
        id: Uuid,
        provider: AuthProvider,
        provider_id: &str,
    ) -> Result<Option<User>, StoreError> {
        let mut tables = self.tables.write();
        let Some(user) = tables.users.get_mut(&id).filter(|u| u.status.is_active()) else {
            return Ok(None);
        };

        user.provider = provider;
        user.provider_id = Some(provider_id.to_string());
        user.is_verified = true;
        user.updated_at = Utc::now();

        Ok(Some(user.clone()))
    }

    async fn email_exists(&self, email: &str) -> Result<bool, StoreError> {
        Ok(self.tables.read().users.values().any(|u| u.email == email))
    }
}

#[async_trait]
impl ApiKeyStore for MemoryStore {
    async fn insert_within_quota(
        &self,
        key: NewApiKey,
        ceiling: i64,
    ) -> Result<QuotaOutcome<ApiKey>, StoreError> {
        let mut tables = self.tables.write();

        let active = tables.active_api_keys(key.user_id);
        if active >= ceiling {
            return Ok(QuotaOutcome::CeilingReached { active });
        }
        if tables
            .api_keys
            .values()
            .any(|k| k.lookup_hash == key.lookup_hash)
        {
            return Err(StoreError::Conflict("api_keys_lookup_hash_key".to_string()));
        }

        let now = Utc::now();
        let record = ApiKey {
            id: Uuid::new_v4(),
            user_id: key.user_id,
            name: key.name,
            key_prefix: key.key_prefix,
            key_hash: key.key_hash,
            lookup_hash: key.lookup_hash,
            environment: key.environment,
            status: RecordStatus::Active,
            last_used_at: None,
            expires_at: key.expires_at,
            created_at: now,
            updated_at: now,
        };
        tables.api_keys.insert(record.id, record.clone());

        Ok(QuotaOutcome::Inserted(record))
    }

    async fn find_by_lookup_hash(&self, lookup_hash: &str) -> Result<Option<ApiKey>, StoreError> {
        Ok(self
            .tables
            .read()
            .api_keys
            .values()
            .find(|k| k.lookup_hash == lookup_hash)
            .cloned())
    }

    async fn list_active_by_user(&self, user_id: Uuid) -> Result<Vec<ApiKey>, StoreError> {
        let rows: Vec<ApiKey> = self
            .tables
            .read()
            .api_keys
            .values()
            .filter(|k| k.user_id == user_id && k.status.is_active())
            .cloned()
            .collect();

        Ok(newest_first(rows, |k| k.created_at))
    }

    async fn find_by_id_and_user(
        &self,
        id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<ApiKey>, StoreError> {
        Ok(self
            .tables
            .read()
            .api_keys
            .get(&id)
            .filter(|k| k.user_id == user_id && k.status.is_active())
            .cloned())
    }

    async fn deactivate(&self, id: Uuid, user_id: Uuid) -> Result<bool, StoreError> {
        let mut tables = self.tables.write();
        match tables
            .api_keys
            .get_mut(&id)
            .filter(|k| k.user_id == user_id && k.status.is_active())
        {
            Some(key) => {
                key.status = RecordStatus::Inactive;
                key.updated_at = Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn touch_last_used(&self, id: Uuid) -> Result<(), StoreError> {
        self.touch_failure()?;
        if let Some(key) = self.tables.write().api_keys.get_mut(&id) {
            key.last_used_at = Some(Utc::now());
        }
        Ok(())
    }

    async fn count_active_by_user(&self, user_id: Uuid) -> Result<i64, StoreError> {
        Ok(self.tables.read().active_api_keys(user_id))
    }
}

#[async_trait]
impl PartnerCredentialStore for MemoryStore {
    async fn insert_within_quota(
        &self,
        credential: NewPartnerCredential,
        ceiling: i64,
    ) -> Result<QuotaOutcome<PartnerCredential>, StoreError> {
        let mut tables = self.tables.write();

        let active = tables.active_partner_credentials(credential.user_id);
        if active >= ceiling {
            return Ok(QuotaOutcome::CeilingReached { active });
        }
        // Client IDs stay reserved after soft deletion
        if tables
            .partner_credentials
            .values()
            .any(|c| c.client_id == credential.client_id)
        {
            return Err(StoreError::Conflict(
                "partner_credentials_client_id_key".to_string(),
            ));
        }

        let now = Utc::now();
        let record = PartnerCredential {
            id: Uuid::new_v4(),
            user_id: credential.user_id,
            client_id: credential.client_id,
            client_secret: credential.client_secret,
            client_secret_prefix: credential.client_secret_prefix,
            public_key_added_at: credential.public_key.as_ref().map(|_| now),
            public_key: credential.public_key,
            public_key_fingerprint: credential.public_key_fingerprint,
            partner_name: credential.partner_name,
            channel_id: credential.channel_id,
            environment: credential.environment,
            callback_url: credential.callback_url,
            ip_whitelist: credential.ip_whitelist,
            status: RecordStatus::Active,
            expires_at: None,
            last_used_at: None,
            created_at: now,
            updated_at: now,
        };
        tables.partner_credentials.insert(record.id, record.clone());

        Ok(QuotaOutcome::Inserted(record))
    }

    async fn find_active_by_client_id(
        &self,
        client_id: &str,
    ) -> Result<Option<PartnerCredential>, StoreError> {
        Ok(self
            .tables
            .read()
            .partner_credentials
            .values()
            .find(|c| c.client_id == client_id && c.status.is_active())
            .cloned())
    }

    async fn find_by_id_and_user(
        &self,
        id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<PartnerCredential>, StoreError> {
        Ok(self
            .tables
            .read()
            .partner_credentials
            .get(&id)
            .filter(|c| c.user_id == user_id && c.status.is_active())
            .cloned())
    }

    async fn list_active_by_user(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<PartnerCredential>, StoreError> {
        let rows: Vec<PartnerCredential> = self
            .tables
            .read()
            .partner_credentials
            .values()
            .filter(|c| c.user_id == user_id && c.status.is_active())
            .cloned()
            .collect();

        Ok(newest_first(rows, |c| c.created_at))
    }

    async fn update_metadata(
        &self,
        id: Uuid,
        user_id: Uuid,
        metadata: PartnerMetadata,
    ) -> Result<Option<PartnerCredential>, StoreError> {
        let mut tables = self.tables.write();
        let Some(credential) = tables.owned_partner_credential(id, user_id) else {
            return Ok(None);
        };

        credential.partner_name = metadata.partner_name;
        credential.environment = metadata.environment;
        credential.callback_url = metadata.callback_url;
        credential.ip_whitelist = metadata.ip_whitelist;
        credential.updated_at = Utc::now();

        Ok(Some(credential.clone()))
    }

    async fn replace_public_key(
        &self,
        id: Uuid,
        user_id: Uuid,
        public_key: Option<String>,
        fingerprint: Option<String>,
    ) -> Result<Option<PartnerCredential>, StoreError> {
        let mut tables = self.tables.write();
        let Some(credential) = tables.owned_partner_credential(id, user_id) else {
            return Ok(None);
        };

        let now = Utc::now();
        credential.public_key_added_at = public_key.as_ref().map(|_| now);
        credential.public_key = public_key;
        credential.public_key_fingerprint = fingerprint;
        credential.updated_at = now;

        Ok(Some(credential.clone()))
    }

    async fn rotate_secret(
        &self,
        id: Uuid,
        user_id: Uuid,
        client_secret: String,
        client_secret_prefix: String,
    ) -> Result<Option<PartnerCredential>, StoreError> {
        let mut tables = self.tables.write();
        let Some(credential) = tables.owned_partner_credential(id, user_id) else {
            return Ok(None);
        };

        credential.client_secret = client_secret;
        credential.client_secret_prefix = client_secret_prefix;
        credential.updated_at = Utc::now();

        Ok(Some(credential.clone()))
    }

    async fn soft_delete(&self, id: Uuid, user_id: Uuid) -> Result<bool, StoreError> {
        let mut tables = self.tables.write();
        let Some(credential) = tables.owned_partner_credential(id, user_id) else {
            return Ok(false);
        };

        credential.status = RecordStatus::Deleted;
        credential.updated_at = Utc::now();

        Ok(true)
    }

    async fn touch_last_used(&self, id: Uuid) -> Result<(), StoreError> {
        self.touch_failure()?;
        if let Some(credential) = self.tables.write().partner_credentials.get_mut(&id) {
            credential.last_used_at = Some(Utc::now());
        }
        Ok(())
    }

    async fn count_active_by_user(&self, user_id: Uuid) -> Result<i64, StoreError> {
        Ok(self.tables.read().active_partner_credentials(user_id))
    }
}

#[async_trait]
impl HealthProbe for MemoryStore {
    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
