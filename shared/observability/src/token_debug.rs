//! Log-safe references to bearer tokens.

use sha2::{Digest, Sha256};

const FINGERPRINT_LEN: usize = 12;

/// Short, stable fingerprint of a raw token. Two log lines naming the same
/// token share a fingerprint; the token itself cannot be recovered from it.
pub fn fingerprint(raw_token: &str) -> String {
    let digest = Sha256::digest(raw_token.as_bytes());
    let mut hexed = hex::encode(digest);
    hexed.truncate(FINGERPRINT_LEN);
    format!("sha256:{hexed}")
}
