//! The public-key-hash gate runs before any key agreement or trust work.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};

use crate::common::{encrypt_token, no_signature_options, TestPki};
use payment_token_decrypt::DecryptOptions;

#[test]
fn test_wrong_hash_is_rejected() {
    let pki = TestPki::new();
    let mut token = encrypt_token(&pki, b"{}");
    token.header.public_key_hash = BASE64.encode([0xAAu8; 32]);

    let err = pki
        .decryptor(DecryptOptions::default())
        .decrypt(&token)
        .unwrap_err();
    assert_eq!(err.error_code(), "PUBLIC_KEY_HASH_MISMATCH");
}

#[test]
fn test_hash_for_another_merchant_is_rejected() {
    let pki = TestPki::new();
    let other = TestPki::new();

    let mut token = encrypt_token(&pki, b"{}");
    token.header.public_key_hash = other.material.identity.public_key_hash();

    let err = pki
        .decryptor(DecryptOptions::default())
        .decrypt(&token)
        .unwrap_err();
    assert_eq!(err.error_code(), "PUBLIC_KEY_HASH_MISMATCH");
}

#[test]
fn test_gate_fires_before_any_key_work() {
    // Everything after the hash is garbage. If the pipeline attempted key
    // agreement or decryption first, the error would differ.
    let pki = TestPki::new();
    let mut token = encrypt_token(&pki, b"{}");
    token.header.public_key_hash = BASE64.encode([0x55u8; 32]);
    token.header.ephemeral_public_key = BASE64.encode(b"not an spki");
    token.data = BASE64.encode(b"short");

    let err = pki
        .decryptor(no_signature_options())
        .decrypt(&token)
        .unwrap_err();
    assert_eq!(err.error_code(), "PUBLIC_KEY_HASH_MISMATCH");
}

#[test]
fn test_matching_hash_passes_gate() {
    let pki = TestPki::new();
    let token = encrypt_token(&pki, b"{}");
    assert_eq!(
        token.header.public_key_hash,
        pki.material.identity.public_key_hash()
    );

    assert!(pki
        .decryptor(DecryptOptions::default())
        .decrypt(&token)
        .is_ok());
}
