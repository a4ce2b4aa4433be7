//! Cryptographic building blocks shared by the credential services.

/// Argon2 secret hashing, keyed lookup digests, constant-time comparison
pub mod hashing;
/// PEM public key validation and fingerprint formatting
pub mod public_key;
/// CSPRNG-backed secret generation
pub mod secrets;
