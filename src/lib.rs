//! Payment token decryption
//!
//! Unwraps an encrypted payment cryptogram ("payment token") as issued by
//! the Apple Pay network:
//!
//! 1. Confirm the token names this merchant's certificate
//!    ([`crypto::spki_hash`]).
//! 2. Verify the CMS chain of trust and signing-time freshness
//!    ([`signature`], default-on).
//! 3. Compute an ECDH shared secret from the merchant private key and the
//!    token's one-time ephemeral key ([`crypto::agreement`]).
//! 4. Derive the single-use AES-256 key with the NIST SP 800-56A
//!    concatenation KDF ([`crypto::kdf`]).
//! 5. Decrypt the authenticated ciphertext ([`crypto::aead`]) and parse
//!    the payload.
//!
//! Certificate material is loaded once at startup ([`material`]) and shared
//! read-only; every other operation is pure and safe to run concurrently.
//!
//! ```no_run
//! use std::sync::Arc;
//! use payment_token_decrypt::{
//!     CertificateMaterial, CertificatePaths, DecryptOptions, PaymentToken, TokenDecryptor,
//! };
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let paths = CertificatePaths {
//!     merchant_certificate: "cert/payment_process_cert.pem".into(),
//!     merchant_private_key: "cert/payment_process_key.pem".into(),
//!     root_certificate: "cert/network_root_ca.cer".into(),
//! };
//! let material = Arc::new(CertificateMaterial::load(&paths)?);
//! let decryptor = TokenDecryptor::new(material, DecryptOptions::default());
//!
//! let token = PaymentToken::from_slice(br#"{ "...": "..." }"#)?;
//! let payload = decryptor.decrypt(&token)?;
//! println!("{}", payload.value());
//! # Ok(())
//! # }
//! ```

pub mod crypto;
pub mod decryptor;
pub mod error;
pub mod material;
pub mod signature;
pub mod token;

pub use crypto::{SharedSecret, SymmetricKey};
pub use decryptor::{DecryptOptions, DecryptedPayload, TokenDecryptor};
pub use error::DecryptError;
pub use material::{CertificateMaterial, CertificatePaths, MerchantIdentity, TrustAnchor};
pub use signature::SignatureVerifier;
pub use token::{PaymentToken, TokenHeader};
