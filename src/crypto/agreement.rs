//! ECDH key agreement
//!
//! Pairs the merchant's long-term P-256 private key with the token's
//! one-time ephemeral public key. The ephemeral key arrives as SPKI DER and
//! is validated on parse — an off-curve or malformed point is rejected, not
//! assumed valid.

use p256::ecdh;
use p256::pkcs8::DecodePublicKey;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::DecryptError;

/// Raw ECDH output: the x-coordinate of the shared point.
///
/// Lives only for the duration of one decrypt call, is zeroized on drop and
/// never printed. Each token carries a fresh ephemeral key, so a shared
/// secret is 1:1 with a single token — caching one across tokens would
/// break the protocol's forward secrecy.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct SharedSecret([u8; 32]);

impl SharedSecret {
    /// Wrap raw shared-secret bytes (used by the inverse transform in
    /// tests and onboarding tooling)
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        SharedSecret(bytes)
    }

    /// The raw 32-byte secret
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl std::fmt::Debug for SharedSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SharedSecret(..)")
    }
}

/// Compute the ECDH shared secret between the merchant private key and the
/// token's ephemeral public key (SPKI DER bytes).
pub fn compute_shared_secret(
    private_key: &p256::SecretKey,
    ephemeral_spki_der: &[u8],
) -> Result<SharedSecret, DecryptError> {
    let ephemeral = p256::PublicKey::from_public_key_der(ephemeral_spki_der).map_err(|e| {
        DecryptError::KeyAgreement(format!("invalid ephemeral public key: {}", e))
    })?;

    let shared = ecdh::diffie_hellman(private_key.to_nonzero_scalar(), ephemeral.as_affine());

    // raw_secret_bytes is the affine x-coordinate, 32 bytes on P-256
    let mut secret = [0u8; 32];
    secret.copy_from_slice(shared.raw_secret_bytes().as_slice());
    Ok(SharedSecret(secret))
}
