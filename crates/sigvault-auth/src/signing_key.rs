//! Scoped signing key derivation and the HMAC primitives built on it.
//!
//! ```text
//! DateKey              = HMAC-SHA256("AWS4" + secret_key, scope_date)
//! DateRegionKey        = HMAC-SHA256(DateKey, region)
//! DateRegionServiceKey = HMAC-SHA256(DateRegionKey, service)
//! SigningKey           = HMAC-SHA256(DateRegionServiceKey, "aws4_request")
//! ```

use hmac::{Hmac, KeyInit, Mac};
use sha2::{Digest, Sha256};

/// The fixed terminator of every credential scope.
pub const SCOPE_TERMINATOR: &str = "aws4_request";

/// Length in bytes of an HMAC-SHA256 output.
pub const SIGNING_KEY_LEN: usize = 32;

type HmacSha256 = Hmac<Sha256>;

/// Derive the scoped SigV4 signing key.
///
/// Pure and deterministic; the result depends only on the four inputs.
///
/// # Examples
///
/// ```
/// use sigvault_auth::signing_key::derive_signing_key;
///
/// let key = derive_signing_key("verySecretKey1", "us-east-1", "20160209", "s3");
/// assert_eq!(
///     hex::encode(key),
///     "5c19fe2935aa4f967549048b6daa85635fb47be2938b0899177e5906d4b17221"
/// );
/// ```
#[must_use]
pub fn derive_signing_key(
    secret_key: &str,
    region: &str,
    scope_date: &str,
    service: &str,
) -> [u8; SIGNING_KEY_LEN] {
    let date_key = hmac_sha256(format!("AWS4{secret_key}").as_bytes(), scope_date.as_bytes());
    let date_region_key = hmac_sha256(&date_key, region.as_bytes());
    let date_region_service_key = hmac_sha256(&date_region_key, service.as_bytes());
    hmac_sha256(&date_region_service_key, SCOPE_TERMINATOR.as_bytes())
}

/// Compute the hex-encoded HMAC-SHA256 of `data` under `signing_key`.
#[must_use]
pub fn compute_signature(signing_key: &[u8], data: &str) -> String {
    hex::encode(hmac_sha256(signing_key, data.as_bytes()))
}

/// Compute the SHA-256 hash of a payload as lower-case hex.
///
/// # Examples
///
/// ```
/// use sigvault_auth::signing_key::hash_payload;
///
/// assert_eq!(
///     hash_payload(b""),
///     "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
/// );
/// ```
#[must_use]
pub fn hash_payload(payload: &[u8]) -> String {
    hex::encode(Sha256::digest(payload))
}

/// Compute HMAC-SHA256 into a fixed-size buffer.
pub(crate) fn hmac_sha256(key: &[u8], data: &[u8]) -> [u8; SIGNING_KEY_LEN] {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC can accept keys of any length");
    mac.update(data);
    let mut out = [0u8; SIGNING_KEY_LEN];
    out.copy_from_slice(&mac.finalize().into_bytes());
    out
}
