//! PostgreSQL implementation of the store traits.
//!
//! # Quota Atomicity
//!
//! Quota-checked inserts run inside one transaction that first locks the owning
//! user row with `SELECT ... FOR UPDATE`. Concurrent creations for the same owner
//! queue on that lock, so the active count they observe cannot go stale before
//! their insert commits.

use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    db::DbPool,
    models::{
        api_key::{ApiKey, NewApiKey},
        partner_credential::{NewPartnerCredential, PartnerCredential, PartnerMetadata},
        status::AuthProvider,
        user::{NewUser, ProfileChanges, User},
    },
    store::{
        ApiKeyStore, HealthProbe, PartnerCredentialStore, QuotaOutcome, StoreError, UserStore,
    },
};

const USER_COLUMNS: &str = "id, email, password_hash, full_name, first_name, last_name, \
     job_title, company, profile_picture, provider, provider_id, is_verified, status, \
     created_at, updated_at";

const API_KEY_COLUMNS: &str = "id, user_id, name, key_prefix, key_hash, lookup_hash, \
     environment, status, last_used_at, expires_at, created_at, updated_at";

const PARTNER_COLUMNS: &str = "id, user_id, client_id, client_secret, client_secret_prefix, \
     public_key, public_key_fingerprint, public_key_added_at, partner_name, channel_id, \
     environment, callback_url, ip_whitelist, status, expires_at, last_used_at, \
     created_at, updated_at";

/// sqlx-backed store sharing one connection pool.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn insert(&self, user: NewUser) -> Result<User, StoreError> {
        let sql = format!(
            "INSERT INTO users (email, password_hash, full_name, provider, provider_id, is_verified)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {USER_COLUMNS}"
        );

        let user = sqlx::query_as::<_, User>(&sql)
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(&user.full_name)
            .bind(user.provider)
            .bind(&user.provider_id)
            .bind(user.is_verified)
            .fetch_one(&self.pool)
            .await?;

        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1 AND status = 'active'");

        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let sql =
            format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1 AND status = 'active'");

        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn find_by_provider(
        &self,
        provider: AuthProvider,
        provider_id: &str,
    ) -> Result<Option<User>, StoreError> {
        let sql = format!(
            "SELECT {USER_COLUMNS} FROM users
             WHERE provider = $1 AND provider_id = $2 AND status = 'active'"
        );

        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(provider)
            .bind(provider_id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn update_profile(
        &self,
        id: Uuid,
        changes: ProfileChanges,
    ) -> Result<Option<User>, StoreError> {
        // NULL parameters keep the stored value
        let sql = format!(
            "UPDATE users
             SET full_name = COALESCE($2, full_name),
                 first_name = COALESCE($3, first_name),
                 last_name = COALESCE($4, last_name),
                 job_title = COALESCE($5, job_title),
                 company = COALESCE($6, company),
                 profile_picture = COALESCE($7, profile_picture),
                 updated_at = NOW()
             WHERE id = $1 AND status = 'active'
             RETURNING {USER_COLUMNS}"
        );

        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .bind(changes.full_name)
            .bind(changes.first_name)
            .bind(changes.last_name)
            .bind(changes.job_title)
            .bind(changes.company)
            .bind(changes.profile_picture)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn link_provider(
        &self,
        id: Uuid,
        provider: AuthProvider,
        provider_id: &str,
    ) -> Result<Option<User>, StoreError> {
        let sql = format!(
            "UPDATE users
             SET provider = $2, provider_id = $3, is_verified = TRUE, updated_at = NOW()
             WHERE id = $1 AND status = 'active'
             RETURNING {USER_COLUMNS}"
        );

        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .bind(provider)
            .bind(provider_id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn email_exists(&self, email: &str) -> Result<bool, StoreError> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM users WHERE email = $1)")
                .bind(email)
                .fetch_one(&self.pool)
                .await?;

        Ok(exists)
    }
}

#[async_trait]
impl ApiKeyStore for PgStore {
    async fn insert_within_quota(
        &self,
        key: NewApiKey,
        ceiling: i64,
    ) -> Result<QuotaOutcome<ApiKey>, StoreError> {
        let mut tx = self.pool.begin().await?;

        // Serialize quota-checked inserts for this owner
        sqlx::query("SELECT id FROM users WHERE id = $1 FOR UPDATE")
            .bind(key.user_id)
            .fetch_optional(&mut *tx)
            .await?;

        let active: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM api_keys WHERE user_id = $1 AND status = 'active'",
        )
        .bind(key.user_id)
        .fetch_one(&mut *tx)
        .await?;

        if active >= ceiling {
            tx.rollback().await?;
            return Ok(QuotaOutcome::CeilingReached { active });
        }

        let sql = format!(
            "INSERT INTO api_keys (user_id, name, key_prefix, key_hash, lookup_hash, environment, expires_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING {API_KEY_COLUMNS}"
        );

        let inserted = sqlx::query_as::<_, ApiKey>(&sql)
            .bind(key.user_id)
            .bind(&key.name)
            .bind(&key.key_prefix)
            .bind(&key.key_hash)
            .bind(&key.lookup_hash)
            .bind(key.environment)
            .bind(key.expires_at)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(QuotaOutcome::Inserted(inserted))
    }

    async fn find_by_lookup_hash(&self, lookup_hash: &str) -> Result<Option<ApiKey>, StoreError> {
        let sql = format!("SELECT {API_KEY_COLUMNS} FROM api_keys WHERE lookup_hash = $1");

        Ok(sqlx::query_as::<_, ApiKey>(&sql)
            .bind(lookup_hash)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn list_active_by_user(&self, user_id: Uuid) -> Result<Vec<ApiKey>, StoreError> {
        let sql = format!(
            "SELECT {API_KEY_COLUMNS} FROM api_keys
             WHERE user_id = $1 AND status = 'active'
             ORDER BY created_at DESC"
        );

        Ok(sqlx::query_as::<_, ApiKey>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn find_by_id_and_user(
        &self,
        id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<ApiKey>, StoreError> {
        let sql = format!(
            "SELECT {API_KEY_COLUMNS} FROM api_keys
             WHERE id = $1 AND user_id = $2 AND status = 'active'"
        );

        Ok(sqlx::query_as::<_, ApiKey>(&sql)
            .bind(id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn deactivate(&self, id: Uuid, user_id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "UPDATE api_keys SET status = 'inactive', updated_at = NOW()
             WHERE id = $1 AND user_id = $2 AND status = 'active'",
        )
        .bind(id)
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn touch_last_used(&self, id: Uuid) -> Result<(), StoreError> {
        sqlx::query("UPDATE api_keys SET last_used_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn count_active_by_user(&self, user_id: Uuid) -> Result<i64, StoreError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM api_keys WHERE user_id = $1 AND status = 'active'",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }
}

#[async_trait]
impl PartnerCredentialStore for PgStore {
    async fn insert_within_quota(
        &self,
        credential: NewPartnerCredential,
        ceiling: i64,
    ) -> Result<QuotaOutcome<PartnerCredential>, StoreError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("SELECT id FROM users WHERE id = $1 FOR UPDATE")
            .bind(credential.user_id)
            .fetch_optional(&mut *tx)
            .await?;

        let active: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM partner_credentials WHERE user_id = $1 AND status = 'active'",
        )
        .bind(credential.user_id)
        .fetch_one(&mut *tx)
        .await?;

        if active >= ceiling {
            tx.rollback().await?;
            return Ok(QuotaOutcome::CeilingReached { active });
        }

        let sql = format!(
            "INSERT INTO partner_credentials (
                 user_id, client_id, client_secret, client_secret_prefix,
                 public_key, public_key_fingerprint, public_key_added_at,
                 partner_name, channel_id, environment, callback_url, ip_whitelist
             )
             VALUES ($1, $2, $3, $4, $5, $6, CASE WHEN $5::TEXT IS NULL THEN NULL ELSE NOW() END,
                     $7, $8, $9, $10, $11)
             RETURNING {PARTNER_COLUMNS}"
        );

        let inserted = sqlx::query_as::<_, PartnerCredential>(&sql)
            .bind(credential.user_id)
            .bind(&credential.client_id)
            .bind(&credential.client_secret)
            .bind(&credential.client_secret_prefix)
            .bind(&credential.public_key)
            .bind(&credential.public_key_fingerprint)
            .bind(&credential.partner_name)
            .bind(&credential.channel_id)
            .bind(credential.environment)
            .bind(&credential.callback_url)
            .bind(&credential.ip_whitelist)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(QuotaOutcome::Inserted(inserted))
    }

    async fn find_active_by_client_id(
        &self,
        client_id: &str,
    ) -> Result<Option<PartnerCredential>, StoreError> {
        let sql = format!(
            "SELECT {PARTNER_COLUMNS} FROM partner_credentials
             WHERE client_id = $1 AND status = 'active'"
        );

        Ok(sqlx::query_as::<_, PartnerCredential>(&sql)
            .bind(client_id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn find_by_id_and_user(
        &self,
        id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<PartnerCredential>, StoreError> {
        let sql = format!(
            "SELECT {PARTNER_COLUMNS} FROM partner_credentials
             WHERE id = $1 AND user_id = $2 AND status = 'active'"
        );

        Ok(sqlx::query_as::<_, PartnerCredential>(&sql)
            .bind(id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn list_active_by_user(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<PartnerCredential>, StoreError> {
        let sql = format!(
            "SELECT {PARTNER_COLUMNS} FROM partner_credentials
             WHERE user_id = $1 AND status = 'active'
             ORDER BY created_at DESC"
        );

        Ok(sqlx::query_as::<_, PartnerCredential>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn update_metadata(
        &self,
        id: Uuid,
        user_id: Uuid,
        metadata: PartnerMetadata,
    ) -> Result<Option<PartnerCredential>, StoreError> {
        let sql = format!(
            "UPDATE partner_credentials
             SET partner_name = $3, environment = $4, callback_url = $5, ip_whitelist = $6,
                 updated_at = NOW()
             WHERE id = $1 AND user_id = $2 AND status = 'active'
             RETURNING {PARTNER_COLUMNS}"
        );

        Ok(sqlx::query_as::<_, PartnerCredential>(&sql)
            .bind(id)
            .bind(user_id)
            .bind(&metadata.partner_name)
            .bind(metadata.environment)
            .bind(&metadata.callback_url)
            .bind(&metadata.ip_whitelist)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn replace_public_key(
        &self,
        id: Uuid,
        user_id: Uuid,
        public_key: Option<String>,
        fingerprint: Option<String>,
    ) -> Result<Option<PartnerCredential>, StoreError> {
        let sql = format!(
            "UPDATE partner_credentials
             SET public_key = $3,
                 public_key_fingerprint = $4,
                 public_key_added_at = CASE WHEN $3::TEXT IS NULL THEN NULL ELSE NOW() END,
                 updated_at = NOW()
             WHERE id = $1 AND user_id = $2 AND status = 'active'
             RETURNING {PARTNER_COLUMNS}"
        );

        Ok(sqlx::query_as::<_, PartnerCredential>(&sql)
            .bind(id)
            .bind(user_id)
            .bind(public_key)
            .bind(fingerprint)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn rotate_secret(
        &self,
        id: Uuid,
        user_id: Uuid,
        client_secret: String,
        client_secret_prefix: String,
    ) -> Result<Option<PartnerCredential>, StoreError> {
        let sql = format!(
            "UPDATE partner_credentials
             SET client_secret = $3, client_secret_prefix = $4, updated_at = NOW()
             WHERE id = $1 AND user_id = $2 AND status = 'active'
             RETURNING {PARTNER_COLUMNS}"
        );

        Ok(sqlx::query_as::<_, PartnerCredential>(&sql)
            .bind(id)
            .bind(user_id)
            .bind(client_secret)
            .bind(client_secret_prefix)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn soft_delete(&self, id: Uuid, user_id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "UPDATE partner_credentials SET status = 'deleted', updated_at = NOW()
             WHERE id = $1 AND user_id = $2 AND status = 'active'",
        )
        .bind(id)
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn touch_last_used(&self, id: Uuid) -> Result<(), StoreError> {
        sqlx::query("UPDATE partner_credentials SET last_used_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn count_active_by_user(&self, user_id: Uuid) -> Result<i64, StoreError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM partner_credentials WHERE user_id = $1 AND status = 'active'",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }
}

#[async_trait]
impl HealthProbe for PgStore {
    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
