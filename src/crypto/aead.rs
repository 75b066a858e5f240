//! AES-256-GCM decryption of the token payload
//!
//! The ciphertext blob is `ciphertext || tag` with a 16-byte tag. The IV is
//! fixed to 16 zero bytes — a protocol mandate that is only sound because
//! each symmetric key is derived fresh per token and used exactly once; it
//! is not a general AES-GCM pattern. Tag verification failure yields no
//! plaintext at all: decryption fails closed.

use aes_gcm::aead::consts::U16;
use aes_gcm::aead::generic_array::GenericArray;
use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::aes::Aes256;
use aes_gcm::AesGcm;

use super::kdf::SymmetricKey;
use crate::error::DecryptError;

/// AES-256-GCM with the protocol's 16-byte nonce
type Aes256Gcm16 = AesGcm<Aes256, U16>;

/// GCM authentication tag length
const TAG_LEN: usize = 16;

/// Protocol-fixed IV: 16 zero bytes
const IV: [u8; 16] = [0u8; 16];

/// Decrypt a ciphertext blob (ciphertext plus trailing 16-byte tag) with a
/// single-use symmetric key.
pub fn decrypt_ciphertext(key: &SymmetricKey, blob: &[u8]) -> Result<Vec<u8>, DecryptError> {
    if blob.len() < TAG_LEN {
        return Err(DecryptError::MalformedToken(format!(
            "ciphertext blob too short: {} bytes, need at least {} for the tag",
            blob.len(),
            TAG_LEN
        )));
    }

    let cipher = Aes256Gcm16::new(GenericArray::from_slice(key.as_bytes()));

    // aes-gcm expects the postfix-tag layout the blob already uses
    cipher
        .decrypt(GenericArray::from_slice(&IV), blob)
        .map_err(|_| DecryptError::AuthenticationFailed)
}
