//! Certificate material: merchant identity and pinned trust anchor
//!
//! All certificate and key files are read exactly once, at process start.
//! The resulting [`CertificateMaterial`] is immutable and shared read-only
//! across concurrent decrypt calls (wrap it in an `Arc`). Certificate
//! rotation is an explicit operation at the call site: load a new value and
//! swap the `Arc`, never mutate in place.

use std::fs;
use std::path::PathBuf;

use der::asn1::ObjectIdentifier;
use der::{DecodePem, Encode};
use p256::elliptic_curve::sec1::ToEncodedPoint;
use p256::pkcs8::DecodePrivateKey;
use serde::{Deserialize, Serialize};
use x509_cert::Certificate;

use crate::error::DecryptError;

/// Custom certificate extension carrying the merchant identifier
pub const MERCHANT_ID_OID: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.113635.100.6.32");

/// Filesystem locations of the three PEM/DER artifacts
///
/// Deserializable so the embedding service can read it straight out of its
/// configuration file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CertificatePaths {
    /// Merchant payment-processing certificate (PEM)
    pub merchant_certificate: PathBuf,
    /// Merchant payment-processing private key (PEM, PKCS#8 or SEC1)
    pub merchant_private_key: PathBuf,
    /// Pinned payment-network root CA (PEM or raw DER)
    pub root_certificate: PathBuf,
}

/// Long-lived merchant key material: private key plus its certificate
pub struct MerchantIdentity {
    certificate: Certificate,
    private_key: p256::SecretKey,
    spki_der: Vec<u8>,
}

impl MerchantIdentity {
    /// The merchant certificate
    pub fn certificate(&self) -> &Certificate {
        &self.certificate
    }

    /// The merchant P-256 private key
    pub fn private_key(&self) -> &p256::SecretKey {
        &self.private_key
    }

    /// DER bytes of the certificate's SubjectPublicKeyInfo, cached at load
    pub fn spki_der(&self) -> &[u8] {
        &self.spki_der
    }

    /// Base64 SHA-256 of the SubjectPublicKeyInfo — the value tokens carry
    /// in their `publicKeyHash` field when addressed to this merchant
    pub fn public_key_hash(&self) -> String {
        crate::crypto::spki_hash::public_key_hash(&self.spki_der)
    }

    /// Extract the merchant identifier from the certificate's custom
    /// extension: the extension value is a 2-byte DER tag/length header
    /// followed by the identifier as ASCII hex, which decodes to the raw
    /// bytes fed into key derivation as partyVInfo.
    pub fn merchant_identifier(&self) -> Result<Vec<u8>, DecryptError> {
        let extensions = self
            .certificate
            .tbs_certificate
            .extensions
            .as_deref()
            .unwrap_or(&[]);

        let ext = extensions
            .iter()
            .find(|e| e.extn_id == MERCHANT_ID_OID)
            .ok_or_else(|| {
                DecryptError::MerchantIdExtraction(format!(
                    "certificate has no extension {}",
                    MERCHANT_ID_OID
                ))
            })?;

        decode_merchant_id(ext.extn_value.as_bytes())
    }
}

/// Pinned root certificate used only by signature verification
pub struct TrustAnchor {
    certificate: Certificate,
}

impl TrustAnchor {
    /// The pinned root CA certificate
    pub fn certificate(&self) -> &Certificate {
        &self.certificate
    }
}

/// One-time loaded certificate material
pub struct CertificateMaterial {
    pub identity: MerchantIdentity,
    pub trust_anchor: TrustAnchor,
}

// Holds the merchant private key; never printed
impl std::fmt::Debug for CertificateMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("CertificateMaterial(..)")
    }
}

impl CertificateMaterial {
    /// Load and parse all three artifacts. Performed once at startup; every
    /// failure is a [`DecryptError::CertificateLoad`].
    pub fn load(paths: &CertificatePaths) -> Result<Self, DecryptError> {
        let cert_pem = read_file(&paths.merchant_certificate)?;
        let certificate = Certificate::from_pem(cert_pem.as_bytes()).map_err(|e| {
            DecryptError::CertificateLoad(format!(
                "merchant certificate {}: {}",
                paths.merchant_certificate.display(),
                e
            ))
        })?;

        let key_pem = read_file(&paths.merchant_private_key)?;
        let private_key = parse_private_key_pem(&key_pem).map_err(|e| {
            DecryptError::CertificateLoad(format!(
                "merchant private key {}: {}",
                paths.merchant_private_key.display(),
                e
            ))
        })?;

        let spki = &certificate.tbs_certificate.subject_public_key_info;
        let spki_der = spki.to_der().map_err(|e| {
            DecryptError::CertificateLoad(format!("merchant certificate SPKI: {}", e))
        })?;

        // The certificate must belong to the loaded private key, otherwise
        // every hash-gated token would fail much later at the AEAD step.
        let expected_point = private_key.public_key().to_encoded_point(false);
        if spki.subject_public_key.raw_bytes() != expected_point.as_bytes() {
            return Err(DecryptError::CertificateLoad(
                "merchant private key does not match merchant certificate".to_string(),
            ));
        }

        let root_bytes = fs::read(&paths.root_certificate).map_err(|e| {
            DecryptError::CertificateLoad(format!(
                "{}: {}",
                paths.root_certificate.display(),
                e
            ))
        })?;
        let root = parse_certificate_pem_or_der(&root_bytes).map_err(|e| {
            DecryptError::CertificateLoad(format!(
                "root certificate {}: {}",
                paths.root_certificate.display(),
                e
            ))
        })?;

        tracing::info!(
            merchant_certificate = %paths.merchant_certificate.display(),
            root_certificate = %paths.root_certificate.display(),
            "loaded payment certificate material"
        );

        Ok(CertificateMaterial {
            identity: MerchantIdentity {
                certificate,
                private_key,
                spki_der,
            },
            trust_anchor: TrustAnchor { certificate: root },
        })
    }
}

fn read_file(path: &PathBuf) -> Result<String, DecryptError> {
    fs::read_to_string(path)
        .map_err(|e| DecryptError::CertificateLoad(format!("{}: {}", path.display(), e)))
}

/// Accept both PKCS#8 ("PRIVATE KEY") and SEC1 ("EC PRIVATE KEY") PEM
fn parse_private_key_pem(pem: &str) -> anyhow::Result<p256::SecretKey> {
    if pem.contains("EC PRIVATE KEY") {
        Ok(p256::SecretKey::from_sec1_pem(pem)?)
    } else {
        Ok(p256::SecretKey::from_pkcs8_pem(pem)?)
    }
}

/// The pinned root ships either PEM-armored or as a raw DER `.cer`
fn parse_certificate_pem_or_der(bytes: &[u8]) -> anyhow::Result<Certificate> {
    if bytes.starts_with(b"-----") {
        Ok(Certificate::from_pem(bytes)?)
    } else {
        use der::Decode;
        Ok(Certificate::from_der(bytes)?)
    }
}

/// Decode a merchant-id extension value: skip the 2-byte DER header, treat
/// the rest as ASCII hex, decode to raw bytes.
pub(crate) fn decode_merchant_id(value: &[u8]) -> Result<Vec<u8>, DecryptError> {
    if value.len() <= 2 {
        return Err(DecryptError::MerchantIdExtraction(format!(
            "extension value too short: {} bytes",
            value.len()
        )));
    }

    let hex_str = std::str::from_utf8(&value[2..]).map_err(|e| {
        DecryptError::MerchantIdExtraction(format!("extension value is not ASCII: {}", e))
    })?;

    let merchant_id = hex::decode(hex_str.trim()).map_err(|e| {
        DecryptError::MerchantIdExtraction(format!("extension value is not hex: {}", e))
    })?;

    if merchant_id.is_empty() {
        return Err(DecryptError::MerchantIdExtraction(
            "extension value decoded to zero bytes".to_string(),
        ));
    }

    Ok(merchant_id)
}
