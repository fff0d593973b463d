//! Cryptographic utilities for invitation token generation and hashing.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use rand::RngCore;
use sha2::{Digest, Sha256};

/// Number of random bytes behind an invitation token.
pub const INVITATION_TOKEN_BYTES: usize = 32;

/// Computes SHA-256 hash of the input and returns it as a hex string.
pub fn sha256_hex(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    hex::encode(hasher.finalize())
}

/// Generates a fresh opaque invitation token.
///
/// The token is URL-safe base64 without padding, so it can be embedded in a
/// query string as-is.
pub fn generate_invitation_token() -> String {
    let mut bytes = [0u8; INVITATION_TOKEN_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Returns true if the input looks like a token produced by
/// [`generate_invitation_token`].
pub fn is_well_formed_token(token: &str) -> bool {
    match URL_SAFE_NO_PAD.decode(token) {
        Ok(bytes) => bytes.len() == INVITATION_TOKEN_BYTES,
        Err(_) => false,
    }
}
