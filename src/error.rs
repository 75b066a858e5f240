//! Error types for payment token decryption
//!
//! Every failure mode of the decryption pipeline maps to exactly one
//! variant here. All of them are terminal for the call: a token that fails
//! any step is rejected, never retried, and no partial result is returned.
//!
//! Messages deliberately carry no key material, shared secrets, or
//! plaintext payment data — they are safe to log as-is.

use thiserror::Error;

/// Errors surfaced by the token decryption pipeline
#[derive(Error, Debug)]
pub enum DecryptError {
    /// Certificate, private key, or root CA could not be read or parsed
    /// during the one-time startup load
    #[error("failed to load certificate material: {0}")]
    CertificateLoad(String),

    /// Token is structurally invalid: missing fields, bad base64/hex, or
    /// decrypted bytes that are not valid JSON
    #[error("malformed payment token: {0}")]
    MalformedToken(String),

    /// SHA-256 of the merchant certificate's SubjectPublicKeyInfo does not
    /// match the hash claimed by the token
    #[error("public key hash does not match merchant certificate")]
    PublicKeyHashMismatch,

    /// Merchant-identifier extension missing from the certificate or its
    /// value could not be parsed
    #[error("unable to extract merchant ID from certificate: {0}")]
    MerchantIdExtraction(String),

    /// Ephemeral public key is malformed or not a point on P-256
    #[error("ECDH key agreement failed: {0}")]
    KeyAgreement(String),

    /// Wrong certificate count, missing required extension OID, or a
    /// chain/signature check failed
    #[error("token signature verification failed: {0}")]
    SignatureVerification(String),

    /// CMS signing time is older than the configured freshness window
    #[error("token signature expired: signed {age_secs}s ago, window is {window_secs}s")]
    SignatureExpired { age_secs: i64, window_secs: i64 },

    /// AEAD tag verification failed: ciphertext tampered, corrupted, or
    /// decrypted with the wrong key
    #[error("ciphertext authentication failed")]
    AuthenticationFailed,
}

impl DecryptError {
    /// Stable error code for logging and metrics
    pub fn error_code(&self) -> &'static str {
        match self {
            DecryptError::CertificateLoad(_) => "CERTIFICATE_LOAD_FAILURE",
            DecryptError::MalformedToken(_) => "MALFORMED_TOKEN",
            DecryptError::PublicKeyHashMismatch => "PUBLIC_KEY_HASH_MISMATCH",
            DecryptError::MerchantIdExtraction(_) => "MERCHANT_ID_EXTRACTION_FAILURE",
            DecryptError::KeyAgreement(_) => "KEY_AGREEMENT_FAILURE",
            DecryptError::SignatureVerification(_) => "SIGNATURE_VERIFICATION_FAILURE",
            DecryptError::SignatureExpired { .. } => "SIGNATURE_EXPIRED",
            DecryptError::AuthenticationFailed => "AUTHENTICATION_FAILURE",
        }
    }
}
