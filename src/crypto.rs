//! Hashing primitives for ChainLedger

use sha2::{Digest, Sha256};

/// Length of a hex-encoded SHA-256 digest.
pub const HASH_HEX_LEN: usize = 64;

/// SHA-256 of `text`, lowercase hex encoded.
pub fn digest(text: &str) -> String {
    hex::encode(Sha256::digest(text.as_bytes()))
}

/// SHA-256 over `parts` fed to one hasher in order.
/// Equivalent to `digest(&parts.concat())` without building the joined string.
pub fn digest_parts(parts: &[&str]) -> String {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part.as_bytes());
    }
    hex::encode(hasher.finalize())
}

/// Returns true for a 64-character lowercase hex string.
pub fn is_hash_hex(s: &str) -> bool {
    s.len() == HASH_HEX_LEN && s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}

/// Shortens a hash for display, e.g. `a1b2c3d4...`.
pub fn short_hash(hash: &str, len: usize) -> String {
    if hash.len() > len {
        format!("{}...", &hash[..len])
    } else {
        hash.to_string()
    }
}
