//! Enumerated lifecycle and classification states shared by the record types.
//!
//! Each enum maps to a Postgres enum type created in the migrations.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Lifecycle state of a stored record.
///
/// Records are never hard-deleted. Allowed transitions:
/// - `active` → `inactive` (API key revoked)
/// - `active` → `deleted` (partner credential removed, account closed)
///
/// Only `active` records authenticate, appear in listings, or count against quotas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "record_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum RecordStatus {
    Active,
    Inactive,
    Deleted,
}

impl RecordStatus {
    pub fn is_active(self) -> bool {
        self == RecordStatus::Active
    }
}

/// Environment a credential is scoped to.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type,
)]
#[sqlx(type_name = "credential_environment", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Sandbox,
    Production,
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Environment::Sandbox => f.write_str("sandbox"),
            Environment::Production => f.write_str("production"),
        }
    }
}

/// How an account authenticates.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type,
)]
#[sqlx(type_name = "auth_provider", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum AuthProvider {
    /// Email + password
    #[default]
    Local,
    /// Google federated login
    Google,
}
