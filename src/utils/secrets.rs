//! Random secret generation for API keys and partner credentials.
//!
//! All material is drawn from the operating system CSPRNG through [`OsRng`].
//! If the entropy source fails, the operation fails with [`SecretError`]. No weaker
//! generator is ever substituted, and no partial secret is returned.
//!
//! # Formats
//!
//! | Secret              | Entropy  | Text form                         | Display prefix        |
//! |---------------------|----------|-----------------------------------|-----------------------|
//! | API key             | 256 bits | `bas_<64 hex>`                    | `bas_` + 8 hex        |
//! | Partner client ID   | 128 bits | `BAS<29 hex>` (32 chars)          | n/a                   |
//! | Partner secret      | 256 bits | `<64 hex>`                        | 8 hex + `...`         |
//! | Channel ID          | 64 bits  | `CH<16 hex>`                      | n/a                   |

use std::fmt;

use rand::TryRngCore;
use rand::rngs::OsRng;

/// Namespace tag in front of every API key.
pub const API_KEY_NAMESPACE: &str = "bas";

/// Brand tag in front of every partner client ID.
pub const CLIENT_ID_BRAND: &str = "BAS";

/// Tag in front of every partner channel ID.
pub const CHANNEL_ID_TAG: &str = "CH";

/// Total length of a partner client ID, brand tag included.
pub const CLIENT_ID_LENGTH: usize = 32;

/// Number of hex characters shown in display prefixes.
const PREFIX_HEX_CHARS: usize = 8;

/// Hex characters after the `bas_` separator of an API key.
const API_KEY_HEX_CHARS: usize = 64;

/// The entropy source could not produce random bytes.
#[derive(Debug, thiserror::Error)]
pub enum SecretError {
    #[error("entropy source failure: {0}")]
    Entropy(String),
}

/// A freshly generated API key.
///
/// `key` is the only copy of the plaintext. It is returned to the caller once and
/// never persisted.
#[derive(Clone)]
pub struct GeneratedApiKey {
    pub key: String,
    pub prefix: String,
}

impl fmt::Debug for GeneratedApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeneratedApiKey")
            .field("prefix", &self.prefix)
            .finish_non_exhaustive()
    }
}

/// A freshly generated partner client secret with its display prefix.
#[derive(Clone)]
pub struct GeneratedClientSecret {
    pub secret: String,
    pub prefix: String,
}

impl fmt::Debug for GeneratedClientSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeneratedClientSecret")
            .field("prefix", &self.prefix)
            .finish_non_exhaustive()
    }
}

/// Fill a fixed-size buffer from the OS random source.
pub fn random_bytes<const N: usize>() -> Result<[u8; N], SecretError> {
    let mut bytes = [0u8; N];
    OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(|e| SecretError::Entropy(e.to_string()))?;
    Ok(bytes)
}

/// Generate an API key: `bas_` followed by 64 lowercase hex characters.
pub fn generate_api_key() -> Result<GeneratedApiKey, SecretError> {
    let bytes: [u8; 32] = random_bytes()?;
    let encoded = hex::encode(bytes);

    let prefix = format!("{API_KEY_NAMESPACE}_{}", &encoded[..PREFIX_HEX_CHARS]);
    let key = format!("{API_KEY_NAMESPACE}_{encoded}");

    Ok(GeneratedApiKey { key, prefix })
}

/// Whether `candidate` has the `bas_<64 lowercase hex>` shape of an issued API key.
pub fn is_api_key_format(candidate: &str) -> bool {
    candidate
        .strip_prefix(API_KEY_NAMESPACE)
        .and_then(|rest| rest.strip_prefix('_'))
        .is_some_and(|body| {
            body.len() == API_KEY_HEX_CHARS
                && body.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
        })
}

/// Generate a partner client ID: `BAS` followed by 29 lowercase hex characters.
pub fn generate_client_id() -> Result<String, SecretError> {
    let bytes: [u8; 16] = random_bytes()?;
    let encoded = hex::encode(bytes);

    let hex_len = CLIENT_ID_LENGTH - CLIENT_ID_BRAND.len();
    Ok(format!("{CLIENT_ID_BRAND}{}", &encoded[..hex_len]))
}

/// Generate a partner client secret (64 lowercase hex characters).
pub fn generate_client_secret() -> Result<GeneratedClientSecret, SecretError> {
    let bytes: [u8; 32] = random_bytes()?;
    let secret = hex::encode(bytes);
    let prefix = format!("{}...", &secret[..PREFIX_HEX_CHARS]);

    Ok(GeneratedClientSecret { secret, prefix })
}

/// Generate a partner channel ID: `CH` followed by 16 lowercase hex characters.
pub fn generate_channel_id() -> Result<String, SecretError> {
    let bytes: [u8; 8] = random_bytes()?;
    Ok(format!("{CHANNEL_ID_TAG}{}", hex::encode(bytes)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn is_lower_hex(s: &str) -> bool {
        s.chars()
            .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c))
    }

    #[test]
    fn api_key_shape_check() {
        let generated = generate_api_key().unwrap();
        assert!(is_api_key_format(&generated.key));

        let hex = "0".repeat(64);
        assert!(is_api_key_format(&format!("bas_{hex}")));
        assert!(!is_api_key_format(&format!("bas{hex}")));
        assert!(!is_api_key_format(&format!("basx{hex}")));
        assert!(!is_api_key_format(&format!("bas_{}", "0".repeat(63))));
        assert!(!is_api_key_format(&format!("bas_{}", "A".repeat(64))));
        assert!(!is_api_key_format(""));
    }

    #[test]
    fn api_key_format() {
        let generated = generate_api_key().unwrap();

        let body = generated.key.strip_prefix("bas_").unwrap();
        assert_eq!(body.len(), 64);
        assert!(is_lower_hex(body));

        assert_eq!(generated.prefix.len(), 12);
        assert!(generated.key.starts_with(&generated.prefix));
    }

    #[test]
    fn client_id_format() {
        let client_id = generate_client_id().unwrap();

        assert_eq!(client_id.len(), CLIENT_ID_LENGTH);
        let body = client_id.strip_prefix("BAS").unwrap();
        assert_eq!(body.len(), 29);
        assert!(is_lower_hex(body));
    }

    #[test]
    fn client_secret_format() {
        let generated = generate_client_secret().unwrap();

        assert_eq!(generated.secret.len(), 64);
        assert!(is_lower_hex(&generated.secret));
        assert_eq!(generated.prefix, format!("{}...", &generated.secret[..8]));
    }

    #[test]
    fn channel_id_format() {
        let channel_id = generate_channel_id().unwrap();

        let body = channel_id.strip_prefix("CH").unwrap();
        assert_eq!(body.len(), 16);
        assert!(is_lower_hex(body));
    }

    #[test]
    fn no_collisions_over_ten_thousand_draws() {
        const TRIALS: usize = 10_000;

        let mut keys = HashSet::with_capacity(TRIALS);
        let mut client_ids = HashSet::with_capacity(TRIALS);
        let mut secrets = HashSet::with_capacity(TRIALS);
        let mut channels = HashSet::with_capacity(TRIALS);

        for _ in 0..TRIALS {
            assert!(keys.insert(generate_api_key().unwrap().key));
            assert!(client_ids.insert(generate_client_id().unwrap()));
            assert!(secrets.insert(generate_client_secret().unwrap().secret));
            assert!(channels.insert(generate_channel_id().unwrap()));
        }
    }
}
