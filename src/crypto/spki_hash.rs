//! Public key hash gate
//!
//! Every token names the merchant key it was encrypted to: base64 SHA-256
//! over the certificate's SubjectPublicKeyInfo DER (not the whole
//! certificate). Checking this first rejects tokens meant for a different
//! merchant key before any elliptic-curve work happens.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use sha2::{Digest, Sha256};

use crate::error::DecryptError;

/// Base64 SHA-256 of a SubjectPublicKeyInfo DER encoding
pub fn public_key_hash(spki_der: &[u8]) -> String {
    BASE64.encode(Sha256::digest(spki_der))
}

/// Compare the certificate's public key hash against the token's claim
pub fn verify_public_key_hash(
    spki_der: &[u8],
    claimed_hash_base64: &str,
) -> Result<(), DecryptError> {
    if public_key_hash(spki_der) != claimed_hash_base64 {
        return Err(DecryptError::PublicKeyHashMismatch);
    }
    Ok(())
}
