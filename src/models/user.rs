//! User (principal) model and the auth/profile request and response types.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::status::{AuthProvider, RecordStatus};

/// Represents a user record from the database.
///
/// # Database Table
///
/// Maps to the `users` table. `email` is unique and assumed to arrive normalized.
/// `password_hash` is `None` for accounts that only ever signed in through a
/// federated provider.
#[derive(Clone, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,

    /// Argon2id PHC string, never serialized
    pub password_hash: Option<String>,

    pub full_name: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub job_title: Option<String>,
    pub company: Option<String>,
    pub profile_picture: Option<String>,

    pub provider: AuthProvider,

    /// Provider-assigned external ID (e.g. Google `sub`)
    pub provider_id: Option<String>,

    pub is_verified: bool,
    pub status: RecordStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl fmt::Debug for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("email", &self.email)
            .field("password_hash", &"<redacted>")
            .field("full_name", &self.full_name)
            .field("first_name", &self.first_name)
            .field("last_name", &self.last_name)
            .field("job_title", &self.job_title)
            .field("company", &self.company)
            .field("profile_picture", &self.profile_picture)
            .field("provider", &self.provider)
            .field("provider_id", &self.provider_id)
            .field("is_verified", &self.is_verified)
            .field("status", &self.status)
            .field("created_at", &self.created_at)
            .field("updated_at", &self.updated_at)
            .finish()
    }
}

/// Fields required to create a user.
#[derive(Clone)]
pub struct NewUser {
    pub email: String,
    pub password_hash: Option<String>,
    pub full_name: String,
    pub provider: AuthProvider,
    pub provider_id: Option<String>,
    pub is_verified: bool,
}

impl fmt::Debug for NewUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NewUser")
            .field("email", &self.email)
            .field("full_name", &self.full_name)
            .field("provider", &self.provider)
            .field("provider_id", &self.provider_id)
            .field("is_verified", &self.is_verified)
            .finish_non_exhaustive()
    }
}

/// Profile fields to overwrite. `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default)]
pub struct ProfileChanges {
    pub full_name: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub job_title: Option<String>,
    pub company: Option<String>,
    pub profile_picture: Option<String>,
}

impl ProfileChanges {
    pub fn is_empty(&self) -> bool {
        self.full_name.is_none()
            && self.first_name.is_none()
            && self.last_name.is_none()
            && self.job_title.is_none()
            && self.company.is_none()
            && self.profile_picture.is_none()
    }
}

/// Request body for `POST /api/v1/auth/register`.
///
/// ```json
/// { "email": "a@b.com", "password": "password123", "fullName": "A B" }
/// ```
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub full_name: String,
}

impl fmt::Debug for RegisterRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisterRequest")
            .field("email", &self.email)
            .field("full_name", &self.full_name)
            .finish_non_exhaustive()
    }
}

/// Request body for `POST /api/v1/auth/login`.
#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginRequest")
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

/// Request body for `POST /api/v1/auth/refresh`.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: String,
}

impl fmt::Debug for RefreshRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RefreshRequest")

            .finish_non_exhaustive()
    }
}

/// Request body for `PUT /api/v1/users/me`.
///
/// Empty or missing fields are ignored.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub job_title: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub profile_picture: Option<String>,
}

impl From<UpdateProfileRequest> for ProfileChanges {
    fn from(request: UpdateProfileRequest) -> Self {
        fn non_empty(value: Option<String>) -> Option<String> {
            value
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        }

        Self {
            full_name: non_empty(request.full_name),
            first_name: non_empty(request.first_name),
            last_name: non_empty(request.last_name),
            job_title: non_empty(request.job_title),
            company: non_empty(request.company),
            profile_picture: non_empty(request.profile_picture),
        }
    }
}

/// Profile returned to clients. Never carries the password hash or provider ID.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: Uuid,
    pub email: String,
    pub full_name: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub job_title: Option<String>,
    pub company: Option<String>,
    pub profile_picture: Option<String>,
    pub provider: AuthProvider,
    pub is_verified: bool,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            full_name: user.full_name,
            first_name: user.first_name,
            last_name: user.last_name,
            job_title: user.job_title,
            company: user.company,
            profile_picture: user.profile_picture,
            provider: user.provider,
            is_verified: user.is_verified,
            created_at: user.created_at,
        }
    }
}

/// Response body for register, login and refresh.
///
/// ```json
/// {
///   "accessToken": "eyJ...",
///   "refreshToken": "eyJ...",
///   "expiresIn": 86400,
///   "user": { "id": "...", "email": "a@b.com", ... }
/// }
/// ```
#[derive(Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: i64,
    pub user: UserResponse,
}

impl fmt::Debug for AuthResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthResponse")
            .field("expires_in", &self.expires_in)
            .field("user", &self.user)
            .finish_non_exhaustive()
    }
}
