//! CMS chain-of-trust verification and signing-time freshness.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use chrono::{Duration, Utc};
use der::Decode;
use x509_cert::Certificate;

use crate::common::{
    build_cms_signature, encrypt_token, encrypt_token_at, TestPki, TestPkiOptions,
};
use payment_token_decrypt::{DecryptOptions, SignatureVerifier};

#[test]
fn test_valid_envelope_verifies() {
    let pki = TestPki::new();
    let token = encrypt_token(&pki, b"{}");

    let verifier = SignatureVerifier::new(&pki.material.trust_anchor, Duration::minutes(5));
    verifier.verify(&token).unwrap();
}

#[test]
fn test_garbage_signature_is_rejected() {
    let pki = TestPki::new();
    let mut token = encrypt_token(&pki, b"{}");
    token.signature = BASE64.encode(b"definitely not a CMS envelope");

    let err = pki
        .decryptor(DecryptOptions::default())
        .decrypt(&token)
        .unwrap_err();
    assert_eq!(err.error_code(), "SIGNATURE_VERIFICATION_FAILURE");
}

#[test]
fn test_leaf_without_network_extension_is_rejected() {
    let pki = TestPki::with(TestPkiOptions {
        leaf_has_extension: false,
        ..TestPkiOptions::default()
    });
    let token = encrypt_token(&pki, b"{}");

    let err = pki
        .decryptor(DecryptOptions::default())
        .decrypt(&token)
        .unwrap_err();
    assert_eq!(err.error_code(), "SIGNATURE_VERIFICATION_FAILURE");
}

#[test]
fn test_envelope_must_carry_exactly_two_certificates() {
    let pki = TestPki::new();
    let mut token = encrypt_token(&pki, b"{}");

    let leaf = Certificate::from_der(&pki.leaf_cert_der).unwrap();
    token.signature = build_cms_signature(
        &pki.leaf_key_der,
        vec![leaf],
        &token.signed_content().unwrap(),
        Utc::now(),
    );

    let err = pki
        .decryptor(DecryptOptions::default())
        .decrypt(&token)
        .unwrap_err();
    assert_eq!(err.error_code(), "SIGNATURE_VERIFICATION_FAILURE");
}

#[test]
fn test_chain_to_untrusted_root_is_rejected() {
    let pki = TestPki::new();
    let foreign = TestPki::new();

    // Same content, signed by a chain anchored in a different root
    let mut token = encrypt_token(&pki, b"{}");
    let foreign_leaf = Certificate::from_der(&foreign.leaf_cert_der).unwrap();
    let foreign_inter = Certificate::from_der(&foreign.inter_cert_der).unwrap();
    token.signature = build_cms_signature(
        &foreign.leaf_key_der,
        vec![foreign_leaf, foreign_inter],
        &token.signed_content().unwrap(),
        Utc::now(),
    );

    let err = pki
        .decryptor(DecryptOptions::default())
        .decrypt(&token)
        .unwrap_err();
    assert_eq!(err.error_code(), "SIGNATURE_VERIFICATION_FAILURE");
}

#[test]
fn test_signature_over_different_content_is_rejected() {
    // Ciphertext swapped after signing. The messageDigest attribute no
    // longer matches, so trust verification fails before any decryption.
    let pki = TestPki::new();
    let signed = encrypt_token(&pki, br#"{"n":1}"#);
    let mut other = encrypt_token(&pki, br#"{"n":2}"#);
    other.signature = signed.signature;

    let err = pki
        .decryptor(DecryptOptions::default())
        .decrypt(&other)
        .unwrap_err();
    assert_eq!(err.error_code(), "SIGNATURE_VERIFICATION_FAILURE");
}

#[test]
fn test_stale_signing_time_is_rejected() {
    let pki = TestPki::new();
    let now = Utc::now();
    let token = encrypt_token_at(&pki, b"{}", now - Duration::hours(1));

    let err = pki
        .decryptor(DecryptOptions::default())
        .decrypt_at(&token, now)
        .unwrap_err();
    assert_eq!(err.error_code(), "SIGNATURE_EXPIRED");
    match err {
        payment_token_decrypt::DecryptError::SignatureExpired {
            age_secs,
            window_secs,
        } => {
            assert!(age_secs >= 3600);
            assert_eq!(window_secs, 300);
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[test]
fn test_signing_time_within_window_is_accepted() {
    let pki = TestPki::new();
    let now = Utc::now();
    let token = encrypt_token_at(&pki, b"{}", now - Duration::minutes(4));

    pki.decryptor(DecryptOptions::default())
        .decrypt_at(&token, now)
        .unwrap();
}

#[test]
fn test_future_signing_time_is_accepted() {
    // Clock skew between signer and verifier must not reject fresh tokens
    let pki = TestPki::new();
    let now = Utc::now();
    let token = encrypt_token_at(&pki, b"{}", now + Duration::minutes(10));

    pki.decryptor(DecryptOptions::default())
        .decrypt_at(&token, now)
        .unwrap();
}

#[test]
fn test_custom_freshness_window() {
    let pki = TestPki::new();
    let now = Utc::now();
    let token = encrypt_token_at(&pki, b"{}", now - Duration::minutes(30));

    let options = DecryptOptions {
        freshness_window: Duration::hours(1),
        ..DecryptOptions::default()
    };
    pki.decryptor(options).decrypt_at(&token, now).unwrap();
}
