//! CMS SignedData verification: chain of trust and freshness
//!
//! Establishes that a token was actually issued by the payment network and
//! is recent, before any key derivation or decryption work:
//!
//! 1. Parse the token's `signature` field as a CMS/PKCS#7 `SignedData`
//!    envelope.
//! 2. Require exactly two certificates: the signing leaf and the
//!    intermediate CA.
//! 3. Require the network's custom extension OIDs to be present on each
//!    (values are not inspected, presence only).
//! 4. Verify the chain: leaf signed by intermediate, intermediate signed by
//!    the pinned trust anchor.
//! 5. Verify the CMS signature over the signed attributes, whose
//!    `messageDigest` must equal SHA-256 of
//!    `ephemeralPublicKey || data || transactionId || applicationData`.
//! 6. Require the CMS signing time to be within the freshness window.
//!
//! The production chain mixes curves: leaf and intermediate keys are P-256
//! (ECDSA/SHA-256) while the pinned root is a P-384 CA signing with
//! ECDSA/SHA-384, so both combinations are supported.

use chrono::{DateTime, Duration, Utc};
use cms::cert::CertificateChoices;
use cms::content_info::ContentInfo;
use cms::signed_data::{SignedData, SignerIdentifier, SignerInfo};
use der::asn1::{GeneralizedTime, ObjectIdentifier, OctetString, UtcTime};
use der::{Any, Decode, Encode};
use p256::ecdsa::signature::Verifier;
use sha2::{Digest, Sha256};
use x509_cert::spki::SubjectPublicKeyInfoOwned;
use x509_cert::Certificate;

use crate::error::DecryptError;
use crate::material::TrustAnchor;
use crate::token::PaymentToken;

/// Custom extension required on the signing leaf certificate
pub const LEAF_CERTIFICATE_OID: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.113635.100.6.29");

/// Custom extension required on the intermediate CA certificate
pub const INTERMEDIATE_CA_OID: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.113635.100.6.2.14");

const ID_SIGNED_DATA: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.7.2");
const ID_MESSAGE_DIGEST: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.9.4");
const ID_SIGNING_TIME: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.9.5");
const ID_SHA_256: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.16.840.1.101.3.4.2.1");
const ID_EC_PUBLIC_KEY: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.10045.2.1");
const ECDSA_WITH_SHA_256: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.10045.4.3.2");
const ECDSA_WITH_SHA_384: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.10045.4.3.3");
const SECP_256_R_1: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.10045.3.1.7");
const SECP_384_R_1: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.132.0.34");

/// Verifies a token's CMS envelope against a pinned trust anchor
pub struct SignatureVerifier<'a> {
    trust_anchor: &'a TrustAnchor,
    freshness_window: Duration,
}

impl<'a> SignatureVerifier<'a> {
    pub fn new(trust_anchor: &'a TrustAnchor, freshness_window: Duration) -> Self {
        SignatureVerifier {
            trust_anchor,
            freshness_window,
        }
    }

    /// Verify the token's signature envelope against the current clock
    pub fn verify(&self, token: &PaymentToken) -> Result<(), DecryptError> {
        self.verify_at(token, Utc::now())
    }

    /// Verify against an explicit `now` (deterministic freshness tests)
    pub fn verify_at(&self, token: &PaymentToken, now: DateTime<Utc>) -> Result<(), DecryptError> {
        let signature_der = token.signature_der()?;

        let content_info = ContentInfo::from_der(&signature_der)
            .map_err(|e| sig_err(format!("signature is not a CMS envelope: {}", e)))?;
        if content_info.content_type != ID_SIGNED_DATA {
            return Err(sig_err(format!(
                "unexpected CMS content type: {}",
                content_info.content_type
            )));
        }
        let signed_data: SignedData = content_info
            .content
            .decode_as()
            .map_err(|e| sig_err(format!("invalid SignedData: {}", e)))?;

        let certs: Vec<&Certificate> = signed_data
            .certificates
            .as_ref()
            .map(|set| {
                set.0
                    .iter()
                    .filter_map(|choice| match choice {
                        CertificateChoices::Certificate(cert) => Some(cert),
                        _ => None,
                    })
                    .collect()
            })
            .unwrap_or_default();
        if certs.len() != 2 {
            return Err(sig_err(format!(
                "signature certificates number error: expected 2 but got {}",
                certs.len()
            )));
        }

        let signer_info = signed_data
            .signer_infos
            .0
            .iter()
            .next()
            .ok_or_else(|| sig_err("no signer info present"))?;

        // The transport order of the certificate SET is not guaranteed:
        // the leaf is whichever certificate the signer identifier names.
        let leaf = *certs
            .iter()
            .find(|c| matches_signer(c, &signer_info.sid))
            .ok_or_else(|| sig_err("signer certificate not present in envelope"))?;
        let intermediate = *certs
            .iter()
            .find(|c| !matches_signer(c, &signer_info.sid))
            .ok_or_else(|| sig_err("intermediate certificate not present in envelope"))?;

        if !has_extension(leaf, &LEAF_CERTIFICATE_OID) {
            return Err(sig_err(format!(
                "leaf certificate doesn't have extension {}",
                LEAF_CERTIFICATE_OID
            )));
        }
        if !has_extension(intermediate, &INTERMEDIATE_CA_OID) {
            return Err(sig_err(format!(
                "intermediate certificate doesn't have extension {}",
                INTERMEDIATE_CA_OID
            )));
        }

        verify_issued_by(leaf, intermediate)?;
        verify_issued_by(intermediate, self.trust_anchor.certificate())?;

        self.verify_cms_signature(token, signer_info, leaf)?;
        self.check_signing_time(signer_info, now)?;

        Ok(())
    }

    /// Verify the ECDSA signature over the signed attributes and check the
    /// embedded message digest against the reconstructed signed content.
    fn verify_cms_signature(
        &self,
        token: &PaymentToken,
        signer_info: &SignerInfo,
        leaf: &Certificate,
    ) -> Result<(), DecryptError> {
        if signer_info.digest_alg.oid != ID_SHA_256 {
            return Err(sig_err(format!(
                "unsupported digest algorithm: {}",
                signer_info.digest_alg.oid
            )));
        }

        let signed_attrs = signer_info
            .signed_attrs
            .as_ref()
            .ok_or_else(|| sig_err("no signed attributes present"))?;

        let content = token.signed_content()?;
        let content_digest = Sha256::digest(&content);

        let md_attr = signed_attrs
            .iter()
            .find(|attr| attr.oid == ID_MESSAGE_DIGEST)
            .ok_or_else(|| sig_err("no message digest attribute"))?;
        let md_value = md_attr
            .values
            .iter()
            .next()
            .ok_or_else(|| sig_err("empty message digest attribute"))?;
        let message_digest = md_value
            .decode_as::<OctetString>()
            .map_err(|e| sig_err(format!("malformed message digest attribute: {}", e)))?;
        if message_digest.as_bytes() != content_digest.as_slice() {
            return Err(sig_err("message digest does not match signed content"));
        }

        // RFC 5652: the signature covers the DER SET OF of the signed
        // attributes, not the implicitly tagged form on the wire
        let attrs_der = signed_attrs
            .to_der()
            .map_err(|e| sig_err(format!("cannot re-encode signed attributes: {}", e)))?;

        verify_ecdsa(
            &leaf.tbs_certificate.subject_public_key_info,
            signer_info.signature_algorithm.oid,
            &attrs_der,
            signer_info.signature.as_bytes(),
        )
    }

    /// Require `now - signingTime` within the freshness window
    fn check_signing_time(
        &self,
        signer_info: &SignerInfo,
        now: DateTime<Utc>,
    ) -> Result<(), DecryptError> {
        let signed_attrs = signer_info
            .signed_attrs
            .as_ref()
            .ok_or_else(|| sig_err("no signed attributes present"))?;

        let st_attr = signed_attrs
            .iter()
            .find(|attr| attr.oid == ID_SIGNING_TIME)
            .ok_or_else(|| sig_err("no signing time attribute"))?;
        let st_value = st_attr
            .values
            .iter()
            .next()
            .ok_or_else(|| sig_err("empty signing time attribute"))?;
        let signing_time = decode_signing_time(st_value)?;

        let age = now.signed_duration_since(signing_time);
        if age > self.freshness_window {
            return Err(DecryptError::SignatureExpired {
                age_secs: age.num_seconds(),
                window_secs: self.freshness_window.num_seconds(),
            });
        }
        Ok(())
    }
}

fn sig_err(msg: impl Into<String>) -> DecryptError {
    DecryptError::SignatureVerification(msg.into())
}

fn matches_signer(cert: &Certificate, sid: &SignerIdentifier) -> bool {
    match sid {
        SignerIdentifier::IssuerAndSerialNumber(isn) => {
            cert.tbs_certificate.issuer == isn.issuer
                && cert.tbs_certificate.serial_number == isn.serial_number
        }
        SignerIdentifier::SubjectKeyIdentifier(_) => false,
    }
}

fn has_extension(cert: &Certificate, oid: &ObjectIdentifier) -> bool {
    cert.tbs_certificate
        .extensions
        .as_deref()
        .unwrap_or(&[])
        .iter()
        .any(|ext| ext.extn_id == *oid)
}

/// Verify that `subject` was signed by `issuer`'s key
fn verify_issued_by(subject: &Certificate, issuer: &Certificate) -> Result<(), DecryptError> {
    if subject.tbs_certificate.issuer != issuer.tbs_certificate.subject {
        return Err(sig_err("certificate issuer does not chain to expected CA"));
    }

    let tbs_der = subject
        .tbs_certificate
        .to_der()
        .map_err(|e| sig_err(format!("cannot re-encode certificate: {}", e)))?;
    let signature = subject
        .signature
        .as_bytes()
        .ok_or_else(|| sig_err("certificate signature has unused bits"))?;

    verify_ecdsa(
        &issuer.tbs_certificate.subject_public_key_info,
        subject.signature_algorithm.oid,
        &tbs_der,
        signature,
    )
}

/// ECDSA verification dispatching on the issuer key's curve and the
/// signature algorithm. Supported: P-256/SHA-256 and P-384/SHA-384.
fn verify_ecdsa(
    spki: &SubjectPublicKeyInfoOwned,
    signature_algorithm: ObjectIdentifier,
    message: &[u8],
    signature_der: &[u8],
) -> Result<(), DecryptError> {
    if spki.algorithm.oid != ID_EC_PUBLIC_KEY {
        return Err(sig_err(format!(
            "unsupported public key algorithm: {}",
            spki.algorithm.oid
        )));
    }
    let curve = spki
        .algorithm
        .parameters
        .as_ref()
        .ok_or_else(|| sig_err("EC key has no curve parameters"))?
        .decode_as::<ObjectIdentifier>()
        .map_err(|e| sig_err(format!("malformed EC curve parameters: {}", e)))?;
    let key_bytes = spki
        .subject_public_key
        .as_bytes()
        .ok_or_else(|| sig_err("EC public key has unused bits"))?;

    // Some encoders label a CMS signature with the bare key algorithm
    // instead of the ecdsa-with-SHA256 pair
    let signature_algorithm = if signature_algorithm == ID_EC_PUBLIC_KEY {
        ECDSA_WITH_SHA_256
    } else {
        signature_algorithm
    };

    if curve == SECP_256_R_1 && signature_algorithm == ECDSA_WITH_SHA_256 {
        let key = p256::ecdsa::VerifyingKey::from_sec1_bytes(key_bytes)
            .map_err(|e| sig_err(format!("invalid P-256 public key: {}", e)))?;
        let signature = p256::ecdsa::Signature::from_der(signature_der)
            .map_err(|e| sig_err(format!("invalid ECDSA signature encoding: {}", e)))?;
        key.verify(message, &signature)
            .map_err(|_| sig_err("ECDSA signature verification failed"))
    } else if curve == SECP_384_R_1 && signature_algorithm == ECDSA_WITH_SHA_384 {
        let key = p384::ecdsa::VerifyingKey::from_sec1_bytes(key_bytes)
            .map_err(|e| sig_err(format!("invalid P-384 public key: {}", e)))?;
        let signature = p384::ecdsa::Signature::from_der(signature_der)
            .map_err(|e| sig_err(format!("invalid ECDSA signature encoding: {}", e)))?;
        key.verify(message, &signature)
            .map_err(|_| sig_err("ECDSA signature verification failed"))
    } else {
        Err(sig_err(format!(
            "unsupported curve/signature combination: {} / {}",
            curve, signature_algorithm
        )))
    }
}

/// Signing time is a UTCTime in practice but GeneralizedTime is legal
fn decode_signing_time(value: &Any) -> Result<DateTime<Utc>, DecryptError> {
    let unix = if let Ok(t) = value.decode_as::<UtcTime>() {
        t.to_unix_duration()
    } else if let Ok(t) = value.decode_as::<GeneralizedTime>() {
        t.to_unix_duration()
    } else {
        return Err(sig_err(
            "signing time is neither UTCTime nor GeneralizedTime",
        ));
    };

    DateTime::<Utc>::from_timestamp(unix.as_secs() as i64, 0)
        .ok_or_else(|| sig_err("signing time out of range"))
}
