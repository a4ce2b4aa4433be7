//! One-way hashing for passwords and API keys.
//!
//! - [`SecretHasher`]: Argon2id with a tunable work factor. Used for account passwords
//!   and API keys at rest.
//! - [`LookupHasher`]: HMAC-SHA256 under a server-side pepper. Gives API keys a fast,
//!   non-secret index so validation does not have to scan every Argon2 hash.
//! - [`constant_time_eq`]: byte comparison whose timing does not depend on where the
//!   first mismatch occurs.

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::utils::secrets::{self, SecretError};

type HmacSha256 = Hmac<Sha256>;

/// Hashing could not be performed.
#[derive(Debug, thiserror::Error)]
pub enum HashError {
    #[error("salt generation failed: {0}")]
    Salt(#[from] SecretError),

    #[error("invalid hashing parameters: {0}")]
    Params(String),

    #[error("hashing failed: {0}")]
    Hashing(String),
}

/// Argon2id work factor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashParams {
    /// Memory cost in KiB
    pub memory_kib: u32,
    /// Number of passes
    pub iterations: u32,
    /// Degree of parallelism
    pub parallelism: u32,
}

impl Default for HashParams {
    fn default() -> Self {
        Self {
            memory_kib: Params::DEFAULT_M_COST,
            iterations: Params::DEFAULT_T_COST,
            parallelism: Params::DEFAULT_P_COST,
        }
    }
}

/// Argon2id hasher for passwords and API keys.
#[derive(Debug, Clone)]
pub struct SecretHasher {
    params: Params,
}

impl SecretHasher {
    /// Build a hasher with the given work factor.
    ///
    /// # Errors
    ///
    /// Returns [`HashError::Params`] if Argon2 rejects the parameter combination.
    pub fn new(params: HashParams) -> Result<Self, HashError> {
        let params = Params::new(
            params.memory_kib,
            params.iterations,
            params.parallelism,
            None,
        )
        .map_err(|e| HashError::Params(e.to_string()))?;

        Ok(Self { params })
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }

    /// Hash a plaintext into a PHC string (`$argon2id$v=19$...`).
    ///
    /// The 16-byte salt comes from the OS random source.
    pub fn hash(&self, plaintext: &str) -> Result<String, HashError> {
        let salt_bytes: [u8; 16] = secrets::random_bytes()?;
        let salt =
            SaltString::encode_b64(&salt_bytes).map_err(|e| HashError::Hashing(e.to_string()))?;

        let hash = self
            .argon2()
            .hash_password(plaintext.as_bytes(), &salt)
            .map_err(|e| HashError::Hashing(e.to_string()))?;

        Ok(hash.to_string())
    }

    /// Check a candidate plaintext against a stored PHC string.
    ///
    /// A mismatch is a normal `false` result. The work factor encoded in the stored
    /// hash is used, so hashes survive a change of the configured parameters.
    /// The digest comparison is constant-time.
    pub fn verify(&self, plaintext: &str, stored_hash: &str) -> bool {
        let parsed = match PasswordHash::new(stored_hash) {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!("Stored hash is not a valid PHC string: {}", e);
                return false;
            }
        };

        self.argon2()
            .verify_password(plaintext.as_bytes(), &parsed)
            .is_ok()
    }
}

/// Keyed digest used to index API keys.
#[derive(Clone)]
pub struct LookupHasher {
    pepper: Vec<u8>,
}

impl LookupHasher {
    pub fn new(pepper: impl Into<Vec<u8>>) -> Self {
        Self {
            pepper: pepper.into(),
        }
    }

    /// HMAC-SHA256(pepper, value) as 64 lowercase hex characters.
    pub fn digest(&self, value: &str) -> String {
        let mut mac = HmacSha256::new_from_slice(&self.pepper).expect("HMAC key length is valid");
        mac.update(value.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }
}

impl std::fmt::Debug for LookupHasher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LookupHasher").finish_non_exhaustive()
    }
}

/// Compare two secrets without short-circuiting on the first differing byte.
pub fn constant_time_eq(a: &str, b: &str) -> bool {
    a.as_bytes().ct_eq(b.as_bytes()).into()
}
