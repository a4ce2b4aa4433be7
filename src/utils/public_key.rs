//! RSA public key validation and fingerprinting for partner request signing.
//!
//! Partners may register a PEM-encoded RSA public key on a credential. The key is
//! accepted in either X.509 SubjectPublicKeyInfo form (`PUBLIC KEY`) or raw PKCS#1
//! form (`RSA PUBLIC KEY`). The stored fingerprint is the SHA-256 digest of the DER
//! body as 64 lowercase hex characters.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use rsa::pkcs1::RsaPublicKey as Pkcs1PublicKey;
use rsa::pkcs8::der::Decode;
use rsa::pkcs8::spki::{ObjectIdentifier, SubjectPublicKeyInfoRef};
use rsa::{BigUint, RsaPublicKey};
use sha2::{Digest, Sha256};

const SPKI_LABEL: &str = "PUBLIC KEY";
const PKCS1_LABEL: &str = "RSA PUBLIC KEY";

/// `rsaEncryption`, the only SPKI algorithm accepted.
const RSA_ENCRYPTION_OID: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.1");

/// Largest accepted modulus.
const MAX_MODULUS_BITS: usize = 16384;

/// Number of fingerprint bytes rendered by [`format_fingerprint`].
const DISPLAY_FINGERPRINT_BYTES: usize = 8;

/// Public key rejection reasons.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PublicKeyError {
    /// Input is not a single PEM block, or the block label is not a public key label.
    #[error("invalid PEM format: {0}")]
    InvalidFormat(&'static str),

    /// The PEM body is not a parseable RSA public key.
    #[error("invalid public key: unable to parse")]
    InvalidKey,
}

/// Validate a PEM public key and compute its fingerprint.
///
/// # Returns
///
/// - `Ok(None)` for empty input (no key configured)
/// - `Ok(Some(fingerprint))` for a valid key, where the fingerprint is 64 lowercase hex chars
///
/// # Errors
///
/// - [`PublicKeyError::InvalidFormat`] if the input is not exactly one PEM block labelled
///   `PUBLIC KEY` or `RSA PUBLIC KEY`
/// - [`PublicKeyError::InvalidKey`] if the body parses under neither SPKI nor PKCS#1
pub fn validate_public_key(input: &str) -> Result<Option<String>, PublicKeyError> {
    let input = input.trim();
    if input.is_empty() {
        return Ok(None);
    }

    let (label, der) = decode_pem(input)?;

    if label != SPKI_LABEL && label != PKCS1_LABEL {
        return Err(PublicKeyError::InvalidFormat(
            "expected PUBLIC KEY or RSA PUBLIC KEY",
        ));
    }

    if parse_rsa_public_key(&der).is_none() {
        return Err(PublicKeyError::InvalidKey);
    }

    Ok(Some(hex::encode(Sha256::digest(&der))))
}

/// Split a single PEM block into its label and decoded body.
///
/// Body lines may be wrapped at any width.
fn decode_pem(input: &str) -> Result<(&str, Vec<u8>), PublicKeyError> {
    const NO_BLOCK: PublicKeyError = PublicKeyError::InvalidFormat("no valid PEM block found");

    let mut lines = input.lines().map(str::trim).filter(|line| !line.is_empty());

    let label = lines
        .next()
        .and_then(|line| line.strip_prefix("-----BEGIN "))
        .and_then(|rest| rest.strip_suffix("-----"))
        .ok_or(NO_BLOCK)?;
    let end = format!("-----END {label}-----");

    let mut body = String::with_capacity(input.len());
    let mut closed = false;
    for line in lines.by_ref() {
        if line == end {
            closed = true;
            break;
        }
        if line.starts_with("-----") {
            return Err(NO_BLOCK);
        }
        body.extend(line.chars().filter(|c| !c.is_ascii_whitespace()));
    }

    if !closed {
        return Err(NO_BLOCK);
    }
    if lines.next().is_some() {
        return Err(PublicKeyError::InvalidFormat("expected a single PEM block"));
    }

    let der = STANDARD
        .decode(body.as_bytes())
        .map_err(|_| PublicKeyError::InvalidFormat("PEM body is not valid base64"))?;

    Ok((label, der))
}

/// Parse SPKI or PKCS#1 DER as an RSA public key of up to [`MAX_MODULUS_BITS`].
fn parse_rsa_public_key(der: &[u8]) -> Option<RsaPublicKey> {
    let (modulus, exponent) = match SubjectPublicKeyInfoRef::from_der(der) {
        Ok(spki) => {
            if spki.algorithm.oid != RSA_ENCRYPTION_OID {
                return None;
            }
            pkcs1_components(spki.subject_public_key.as_bytes()?)?
        }
        Err(_) => pkcs1_components(der)?,
    };

    RsaPublicKey::new_with_max_size(modulus, exponent, MAX_MODULUS_BITS).ok()
}

fn pkcs1_components(der: &[u8]) -> Option<(BigUint, BigUint)> {
    let key = Pkcs1PublicKey::from_der(der).ok()?;
    Some((
        BigUint::from_bytes_be(key.modulus.as_bytes()),
        BigUint::from_bytes_be(key.public_exponent.as_bytes()),
    ))
}

/// Render a stored fingerprint for display, e.g. `db:27:46:66:bb:89:83:93...`.
///
/// Cosmetic only. Anything shorter than eight bytes of hex is returned unchanged.
pub fn format_fingerprint(fingerprint: &str) -> String {
    let hex_chars = DISPLAY_FINGERPRINT_BYTES * 2;
    if fingerprint.len() < hex_chars || !fingerprint.is_ascii() {
        return fingerprint.to_string();
    }

    let pairs: Vec<&str> = (0..hex_chars)
        .step_by(2)
        .map(|i| &fingerprint[i..i + 2])
        .collect();

    format!("{}...", pairs.join(":"))
}

/// Mask a stored PEM for detail views.
///
/// The armor lines stay intact and the body collapses to its first and last eight
/// characters. Short inputs (under 100 chars) are returned as-is.
pub fn mask_public_key(pem_text: &str) -> String {
    const VISIBLE: usize = 8;

    if pem_text.len() < 100 {
        return pem_text.to_string();
    }

    let lines: Vec<&str> = pem_text.trim().lines().map(str::trim).collect();
    if lines.len() < 3 {
        return pem_text.to_string();
    }

    let body: String = lines[1..lines.len() - 1].concat();
    if body.len() <= VISIBLE * 2 || !body.is_ascii() {
        return pem_text.to_string();
    }

    format!(
        "{}\n{}...{}\n{}",
        lines[0],
        &body[..VISIBLE],
        &body[body.len() - VISIBLE..],
        lines[lines.len() - 1]
    )
}
