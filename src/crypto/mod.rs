//! Cryptographic primitives for payment token decryption
//!
//! - **agreement**: ECDH between the merchant's static P-256 key and the
//!   token's one-time ephemeral key
//! - **kdf**: NIST SP 800-56A concatenation KDF producing the per-token
//!   AES-256 key
//! - **spki_hash**: the cheap public-key-hash gate run before any
//!   elliptic-curve work
//! - **aead**: AES-256-GCM decryption with the protocol's fixed zero IV
//!
//! Everything here is pure and stateless; secrets (`SharedSecret`,
//! `SymmetricKey`) are scoped to a single decrypt call, zeroized on drop
//! and redacted from `Debug` output.

pub mod aead;
pub mod agreement;
pub mod kdf;
pub mod spki_hash;

pub use aead::decrypt_ciphertext;
pub use agreement::{compute_shared_secret, SharedSecret};
pub use kdf::{derive_symmetric_key, SymmetricKey};
pub use spki_hash::verify_public_key_hash;
