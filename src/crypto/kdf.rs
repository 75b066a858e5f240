//! NIST SP 800-56A single-step concatenation KDF
//!
//! Derives the per-token AES-256 key as
//! `SHA256( counter || Z || algorithmID || partyUInfo || partyVInfo )`
//! where the counter is the 4-byte big-endian value 1, `Z` is the ECDH
//! shared secret, `algorithmID` is the length-prefixed ASCII literal
//! `"id-aes256-GCM"`, `partyUInfo` is the ASCII literal `"Apple"` and
//! `partyVInfo` is the merchant identifier from the certificate extension.
//! The full digest is the key; there is no truncation.

use sha2::{Digest, Sha256};
use zeroize::{Zeroize, ZeroizeOnDrop};

use super::agreement::SharedSecret;

/// Length-prefixed algorithm identifier: 0x0D followed by "id-aes256-GCM"
const KDF_ALGORITHM_ID: &[u8] = b"\x0did-aes256-GCM";

/// Fixed partyUInfo
const KDF_PARTY_U: &[u8] = b"Apple";

/// 32-byte AES-256 key derived for exactly one token.
///
/// Zeroized on drop, never printed. Reuse across tokens is a protocol
/// violation — the zero IV in the AEAD step is only safe because every key
/// is single-use.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct SymmetricKey([u8; 32]);

impl SymmetricKey {
    /// The raw key bytes
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl std::fmt::Debug for SymmetricKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SymmetricKey(..)")
    }
}

/// Derive the AES-256 key for one token. Deterministic: identical
/// `(shared_secret, merchant_id)` inputs always produce the identical key.
pub fn derive_symmetric_key(shared_secret: &SharedSecret, merchant_id: &[u8]) -> SymmetricKey {
    let mut hasher = Sha256::new();
    hasher.update([0x00, 0x00, 0x00, 0x01]); // counter, big-endian
    hasher.update(shared_secret.as_bytes());
    hasher.update(KDF_ALGORITHM_ID);
    hasher.update(KDF_PARTY_U);
    hasher.update(merchant_id);

    SymmetricKey(hasher.finalize().into())
}
