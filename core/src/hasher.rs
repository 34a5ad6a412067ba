//! One-way hashing of bearer secrets.
//!
//! Session tokens and check-in tickets are only ever stored as the SHA-256
//! of the full token string. Lookups hash the presented value and compare
//! hashes, so a leaked table never yields a usable credential.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::RngCore;
use rand::rngs::OsRng;
use sha2::{Digest, Sha256};

/// Random bytes drawn for every generated secret.
pub const SECRET_BYTES: usize = 32;

/// SHA-256 of a raw secret, lowercase hex.
///
/// # Examples
///
/// ```
/// use checkin_core::hasher::hash_secret;
///
/// let hash = hash_secret("abc");
/// assert_eq!(hash.len(), 64);
/// assert_eq!(hash, hash_secret("abc"));
/// ```
#[must_use]
pub fn hash_secret(raw: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(raw.as_bytes());
    hex::encode(hasher.finalize())
}

/// Generate a cryptographically random secret (32 bytes, base64url, no padding).
#[must_use]
pub fn generate_secret() -> String {
    let mut bytes = [0u8; SECRET_BYTES];
    OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Short, log-safe prefix of a hash.
#[must_use]
pub fn hash_prefix(hash: &str) -> &str {
    hash.get(..8).unwrap_or(hash)
}
