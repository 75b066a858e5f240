//! Payment token wire format
//!
//! The token arrives as a JSON body at the HTTP boundary (owned by the
//! embedding service) and is handed to this crate as a parsed structure.
//! Field encodings follow the payment-network format: base64 for the
//! ephemeral key, hash, signature and ciphertext blob, hex for the
//! transaction id and optional application data.
//!
//! A `PaymentToken` is immutable input; nothing in the pipeline mutates it.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde::{Deserialize, Serialize};

use crate::error::DecryptError;

/// Encrypted payment token as received from the payment network
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentToken {
    /// Token format version (e.g. "EC_v1")
    pub version: String,
    /// Base64 CMS SignedData envelope over the token contents
    pub signature: String,
    /// Base64 ciphertext blob; the final 16 bytes are the GCM tag
    pub data: String,
    /// Key-agreement and routing metadata
    pub header: TokenHeader,
}

/// Token header: everything needed to reconstruct the symmetric key
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenHeader {
    /// Base64 SPKI (DER) encoding of the one-time ephemeral public key
    pub ephemeral_public_key: String,
    /// Base64 SHA-256 of the merchant certificate's SubjectPublicKeyInfo
    pub public_key_hash: String,
    /// Hex transaction identifier
    pub transaction_id: String,
    /// Optional hex application data
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub application_data: Option<String>,
}

impl PaymentToken {
    /// Parse a token from a JSON byte slice, as received at the HTTP
    /// boundary
    pub fn from_slice(bytes: &[u8]) -> Result<Self, DecryptError> {
        serde_json::from_slice(bytes)
            .map_err(|e| DecryptError::MalformedToken(format!("invalid token JSON: {}", e)))
    }

    /// Parse a token from an already-deserialized JSON value
    pub fn from_json(value: serde_json::Value) -> Result<Self, DecryptError> {
        serde_json::from_value(value)
            .map_err(|e| DecryptError::MalformedToken(format!("invalid token structure: {}", e)))
    }

    /// Decode the ephemeral public key into SPKI DER bytes
    pub fn ephemeral_public_key_der(&self) -> Result<Vec<u8>, DecryptError> {
        BASE64.decode(&self.header.ephemeral_public_key).map_err(|e| {
            DecryptError::MalformedToken(format!("ephemeralPublicKey is not valid base64: {}", e))
        })
    }

    /// Decode the ciphertext blob (ciphertext plus trailing 16-byte tag)
    pub fn ciphertext_blob(&self) -> Result<Vec<u8>, DecryptError> {
        BASE64
            .decode(&self.data)
            .map_err(|e| DecryptError::MalformedToken(format!("data is not valid base64: {}", e)))
    }

    /// Decode the CMS signature envelope
    pub fn signature_der(&self) -> Result<Vec<u8>, DecryptError> {
        BASE64.decode(&self.signature).map_err(|e| {
            DecryptError::MalformedToken(format!("signature is not valid base64: {}", e))
        })
    }

    /// Decode the transaction identifier
    pub fn transaction_id_bytes(&self) -> Result<Vec<u8>, DecryptError> {
        hex::decode(&self.header.transaction_id).map_err(|e| {
            DecryptError::MalformedToken(format!("transactionId is not valid hex: {}", e))
        })
    }

    /// Decode the optional application data; absent means empty bytes
    pub fn application_data_bytes(&self) -> Result<Vec<u8>, DecryptError> {
        match &self.header.application_data {
            Some(data) => hex::decode(data).map_err(|e| {
                DecryptError::MalformedToken(format!("applicationData is not valid hex: {}", e))
            }),
            None => Ok(Vec::new()),
        }
    }

    /// Reconstruct the signed content covered by the CMS signature:
    /// `ephemeralPublicKey || data || transactionId || applicationData`,
    /// each field decoded from its wire encoding, in this exact order.
    pub fn signed_content(&self) -> Result<Vec<u8>, DecryptError> {
        let ephemeral = self.ephemeral_public_key_der()?;
        let data = self.ciphertext_blob()?;
        let transaction_id = self.transaction_id_bytes()?;
        let application_data = self.application_data_bytes()?;

        let mut content =
            Vec::with_capacity(ephemeral.len() + data.len() + transaction_id.len() + application_data.len());
        content.extend_from_slice(&ephemeral);
        content.extend_from_slice(&data);
        content.extend_from_slice(&transaction_id);
        content.extend_from_slice(&application_data);
        Ok(content)
    }
}
