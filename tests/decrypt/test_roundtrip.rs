//! Full-pipeline round trips: encrypt with the inverse transform, decrypt
//! through the public API, compare plaintext byte for byte.

use std::sync::Arc;

use crate::common::{encrypt_token, TestPki};
use payment_token_decrypt::DecryptOptions;

#[test]
fn test_round_trip_empty_object() {
    let pki = TestPki::new();
    let token = encrypt_token(&pki, b"{}");

    let payload = pki.decryptor(DecryptOptions::default()).decrypt(&token).unwrap();
    assert_eq!(payload.as_bytes(), b"{}");
    assert_eq!(payload.value(), &serde_json::json!({}));
}

#[test]
fn test_round_trip_nested_structure() {
    let pki = TestPki::new();
    let value = serde_json::json!({
        "applicationPrimaryAccountNumber": "4111111111111111",
        "applicationExpirationDate": "251231",
        "paymentData": {
            "onlinePaymentCryptogram": "QW5vdGhlciBvcGFxdWUgYmxvYg==",
            "eciIndicator": "7"
        }
    });
    let plaintext = serde_json::to_vec(&value).unwrap();
    let token = encrypt_token(&pki, &plaintext);

    let payload = pki.decryptor(DecryptOptions::default()).decrypt(&token).unwrap();
    assert_eq!(payload.as_bytes(), plaintext.as_slice());
    assert_eq!(payload.value(), &value);
    assert_eq!(payload.into_value()["paymentData"]["eciIndicator"], "7");
}

#[test]
fn test_round_trip_large_payload() {
    let pki = TestPki::new();
    let value = serde_json::json!({ "blob": "x".repeat(64 * 1024) });
    let plaintext = serde_json::to_vec(&value).unwrap();
    let token = encrypt_token(&pki, &plaintext);

    let payload = pki.decryptor(DecryptOptions::default()).decrypt(&token).unwrap();
    assert_eq!(payload.as_bytes(), plaintext.as_slice());
}

#[test]
fn test_decrypt_is_repeatable() {
    let pki = TestPki::new();
    let token = encrypt_token(&pki, br#"{"n":1}"#);
    let decryptor = pki.decryptor(DecryptOptions::default());

    let first = decryptor.decrypt(&token).unwrap();
    let second = decryptor.decrypt(&token).unwrap();
    assert_eq!(first.as_bytes(), second.as_bytes());
}

#[test]
fn test_concurrent_decrypts_share_material() {
    let pki = TestPki::new();
    let decryptor = Arc::new(pki.decryptor(DecryptOptions::default()));

    let handles: Vec<_> = (0..4)
        .map(|i| {
            let decryptor = decryptor.clone();
            let plaintext = serde_json::to_vec(&serde_json::json!({ "worker": i })).unwrap();
            let token = encrypt_token(&pki, &plaintext);
            std::thread::spawn(move || {
                let payload = decryptor.decrypt(&token).unwrap();
                assert_eq!(payload.as_bytes(), plaintext.as_slice());
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }
}
