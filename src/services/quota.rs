//! Per-account ceilings on live credentials.
//!
//! [`QuotaPolicy::check`] is a cheap pre-check that runs before any secret is
//! generated or hashed. The binding decision is made by the store's
//! `insert_within_quota`, and [`QuotaPolicy::admit`] turns its outcome into a
//! record or a quota error.

use std::fmt;

use crate::{error::AppError, store::QuotaOutcome};

/// Maximum simultaneously active API keys per account.
pub const MAX_ACTIVE_API_KEYS: i64 = 10;

/// Maximum simultaneously active partner credentials per account.
pub const MAX_ACTIVE_PARTNER_CREDENTIALS: i64 = 5;

/// Kind of credential a ceiling applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialKind {
    ApiKey,
    PartnerCredential,
}

impl fmt::Display for CredentialKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CredentialKind::ApiKey => f.write_str("API keys"),
            CredentialKind::PartnerCredential => f.write_str("partner credentials"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotaPolicy {
    pub max_api_keys: i64,
    pub max_partner_credentials: i64,
}

impl Default for QuotaPolicy {
    fn default() -> Self {
        Self {
            max_api_keys: MAX_ACTIVE_API_KEYS,
            max_partner_credentials: MAX_ACTIVE_PARTNER_CREDENTIALS,
        }
    }
}

impl QuotaPolicy {
    pub fn ceiling(&self, kind: CredentialKind) -> i64 {
        match kind {
            CredentialKind::ApiKey => self.max_api_keys,
            CredentialKind::PartnerCredential => self.max_partner_credentials,
        }
    }

    /// Reject when `active` is at or above the ceiling for `kind`.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::QuotaExceeded`] naming the kind and ceiling.
    pub fn check(&self, kind: CredentialKind, active: i64) -> Result<(), AppError> {
        let ceiling = self.ceiling(kind);
        if active >= ceiling {
            return Err(AppError::QuotaExceeded { kind, ceiling });
        }
        Ok(())
    }

    /// Unwrap a quota-checked insert.
    pub fn admit<T>(&self, kind: CredentialKind, outcome: QuotaOutcome<T>) -> Result<T, AppError> {
        match outcome {
            QuotaOutcome::Inserted(record) => Ok(record),
            QuotaOutcome::CeilingReached { .. } => Err(AppError::QuotaExceeded {
                kind,
                ceiling: self.ceiling(kind),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_ceilings() {
        let policy = QuotaPolicy::default();
        assert_eq!(policy.ceiling(CredentialKind::ApiKey), 10);
        assert_eq!(policy.ceiling(CredentialKind::PartnerCredential), 5);
    }

    #[test]
    fn check_rejects_at_ceiling() {
        let policy = QuotaPolicy::default();

        assert!(policy.check(CredentialKind::PartnerCredential, 4).is_ok());
        assert!(matches!(
            policy.check(CredentialKind::PartnerCredential, 5),
            Err(AppError::QuotaExceeded { ceiling: 5, .. })
        ));
        assert!(policy.check(CredentialKind::ApiKey, 12).is_err());
    }

    #[test]
    fn admit_maps_ceiling_reached() {
        let policy = QuotaPolicy::default();

        assert_eq!(
            policy
                .admit(CredentialKind::ApiKey, QuotaOutcome::Inserted(7))
                .unwrap(),
            7
        );

        let err = policy
            .admit::<()>(
                CredentialKind::ApiKey,
                QuotaOutcome::CeilingReached { active: 10 },
            )
            .unwrap_err();
        assert_eq!(err.to_string(), "Maximum of 10 active API keys reached");
    }
}
