//! Token decryption orchestrator
//!
//! Sequences the pipeline over one token, terminal on first failure:
//! hash gate → [signature verification] → ECDH → KDF → AEAD → JSON parse.
//! No retries: every failure is a deterministic function of the input.
//!
//! The orchestrator holds only immutable shared state (the certificate
//! material behind an `Arc`), so independent tokens decrypt fully in
//! parallel with no synchronization.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use crate::crypto::{
    compute_shared_secret, decrypt_ciphertext, derive_symmetric_key, verify_public_key_hash,
};
use crate::error::DecryptError;
use crate::material::CertificateMaterial;
use crate::signature::SignatureVerifier;
use crate::token::PaymentToken;

/// Per-deployment decryption policy
#[derive(Debug, Clone)]
pub struct DecryptOptions {
    /// Require a valid CMS chain-of-trust signature before decrypting.
    /// Leave enabled outside of test rigs: a token that fails trust
    /// validation must never be decrypted.
    pub require_signature: bool,
    /// Maximum accepted age of the CMS signing time
    pub freshness_window: Duration,
}

impl Default for DecryptOptions {
    fn default() -> Self {
        DecryptOptions {
            require_signature: true,
            freshness_window: Duration::minutes(5),
        }
    }
}

/// Decrypted token payload: raw plaintext plus its parsed JSON form.
///
/// `Debug` is redacted — decrypted payment data must never end up in logs.
#[derive(Clone)]
pub struct DecryptedPayload {
    raw: Vec<u8>,
    value: serde_json::Value,
}

impl DecryptedPayload {
    /// Exact plaintext bytes produced by the AEAD step
    pub fn as_bytes(&self) -> &[u8] {
        &self.raw
    }

    /// Parsed payload fields
    pub fn value(&self) -> &serde_json::Value {
        &self.value
    }

    /// Consume into the parsed payload
    pub fn into_value(self) -> serde_json::Value {
        self.value
    }
}

impl std::fmt::Debug for DecryptedPayload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("DecryptedPayload(..)")
    }
}

/// Decrypts payment tokens against one merchant identity and trust anchor
pub struct TokenDecryptor {
    material: Arc<CertificateMaterial>,
    options: DecryptOptions,
}

impl TokenDecryptor {
    pub fn new(material: Arc<CertificateMaterial>, options: DecryptOptions) -> Self {
        TokenDecryptor { material, options }
    }

    /// The active options
    pub fn options(&self) -> &DecryptOptions {
        &self.options
    }

    /// Decrypt one token to its payload, or fail with the first error the
    /// pipeline hits.
    pub fn decrypt(&self, token: &PaymentToken) -> Result<DecryptedPayload, DecryptError> {
        self.decrypt_at(token, Utc::now())
    }

    /// Decrypt against an explicit clock (deterministic freshness tests)
    pub fn decrypt_at(
        &self,
        token: &PaymentToken,
        now: DateTime<Utc>,
    ) -> Result<DecryptedPayload, DecryptError> {
        let identity = &self.material.identity;
        let transaction_id = token.header.transaction_id.as_str();

        // 1. Cheap gate: is this token even addressed to our key?
        verify_public_key_hash(identity.spki_der(), &token.header.public_key_hash)?;
        tracing::debug!(transaction_id, "public key hash verified");

        // 2. Chain of trust, unless explicitly disabled
        if self.options.require_signature {
            let verifier = SignatureVerifier::new(
                &self.material.trust_anchor,
                self.options.freshness_window,
            );
            verifier.verify_at(token, now)?;
            tracing::debug!(transaction_id, "token signature verified");
        } else {
            tracing::warn!(
                transaction_id,
                "signature verification disabled by configuration"
            );
        }

        // 3. Restore the one-time symmetric key
        let ephemeral_der = token.ephemeral_public_key_der()?;
        let shared_secret = compute_shared_secret(identity.private_key(), &ephemeral_der)?;
        let merchant_id = identity.merchant_identifier()?;
        let symmetric_key = derive_symmetric_key(&shared_secret, &merchant_id);
        tracing::debug!(transaction_id, "symmetric key restored");

        // 4. Authenticated decryption
        let blob = token.ciphertext_blob()?;
        let raw = decrypt_ciphertext(&symmetric_key, &blob)?;

        let value = serde_json::from_slice(&raw).map_err(|e| {
            DecryptError::MalformedToken(format!("decrypted payload is not valid JSON: {}", e))
        })?;
        tracing::debug!(transaction_id, "token decrypted");

        Ok(DecryptedPayload { raw, value })
    }
}
