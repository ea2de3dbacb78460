//! Verification keys taken from X.509 certificates.

use std::fmt;

use aws_lc_rs::signature::{
    self, UnparsedPublicKey, VerificationAlgorithm, ECDSA_P256_SHA256_FIXED,
    ECDSA_P384_SHA384_FIXED, ECDSA_P521_SHA512_FIXED,
    RSA_PKCS1_1024_8192_SHA256_FOR_LEGACY_USE_ONLY, RSA_PKCS1_1024_8192_SHA512_FOR_LEGACY_USE_ONLY,
    RSA_PKCS1_2048_8192_SHA256, RSA_PKCS1_2048_8192_SHA384, RSA_PKCS1_2048_8192_SHA512,
};
use x509_parser::prelude::*;
use x509_parser::public_key::PublicKey;

use crate::algorithm::SignatureAlgorithm;
use crate::error::{CryptoError, CryptoResult};
use crate::pem::certificate_der;

/// PKCS#1 `RSAPublicKey` encodings shorter than this hold a modulus under
/// 2048 bits.
const LEGACY_RSA_KEY_LEN: usize = 256;

/// Elliptic curves accepted for ECDSA keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Curve {
    /// NIST P-256.
    P256,
    /// NIST P-384.
    P384,
    /// NIST P-521.
    P521,
}

/// Kind of public key held by a certificate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyKind {
    /// RSA key; the key bytes are a PKCS#1 `RSAPublicKey`.
    Rsa,
    /// EC key; the key bytes are an uncompressed point.
    Ec(Curve),
}

impl fmt::Display for KeyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rsa => f.write_str("RSA"),
            Self::Ec(Curve::P256) => f.write_str("EC P-256"),
            Self::Ec(Curve::P384) => f.write_str("EC P-384"),
            Self::Ec(Curve::P521) => f.write_str("EC P-521"),
        }
    }
}

/// A public key ready for signature verification.
#[derive(Debug, Clone)]
pub struct VerificationKey {
    kind: KeyKind,
    public_key: Vec<u8>,
    subject: String,
}

impl VerificationKey {
    /// Builds a key from raw public key bytes.
    #[must_use]
    pub fn new(kind: KeyKind, public_key: Vec<u8>) -> Self {
        Self {
            kind,
            public_key,
            subject: String::new(),
        }
    }

    /// Extracts the public key from a PEM (or bare base64) certificate.
    ///
    /// # Errors
    ///
    /// Returns an error if the certificate cannot be decoded or carries an
    /// unsupported key type.
    pub fn from_certificate_pem(pem: &str) -> CryptoResult<Self> {
        let der = certificate_der(pem)?;
        Self::from_certificate_der(&der)
    }

    /// Extracts the public key from a DER certificate.
    ///
    /// # Errors
    ///
    /// Returns an error if the certificate cannot be parsed or carries an
    /// unsupported key type.
    pub fn from_certificate_der(der: &[u8]) -> CryptoResult<Self> {
        let (_, cert) = X509Certificate::from_der(der)
            .map_err(|e| CryptoError::InvalidCertificate(format!("failed to parse: {e}")))?;

        let spki = cert.public_key();
        let point = spki.subject_public_key.data.to_vec();

        let kind = match spki.parsed() {
            Ok(PublicKey::RSA(_)) => KeyKind::Rsa,
            Ok(PublicKey::EC(_)) => match point.len() {
                65 => KeyKind::Ec(Curve::P256),
                97 => KeyKind::Ec(Curve::P384),
                133 => KeyKind::Ec(Curve::P521),
                len => {
                    return Err(CryptoError::UnsupportedKey(format!(
                        "EC point of {len} bytes"
                    )))
                }
            },
            Ok(_) => {
                return Err(CryptoError::UnsupportedKey(
                    spki.algorithm.algorithm.to_id_string(),
                ))
            }
            Err(e) => {
                return Err(CryptoError::InvalidCertificate(format!(
                    "unreadable public key: {e}"
                )))
            }
        };

        Ok(Self {
            kind,
            public_key: point,
            subject: cert.subject().to_string(),
        })
    }

    /// Returns the key kind.
    #[must_use]
    pub const fn kind(&self) -> KeyKind {
        self.kind
    }

    /// Returns the certificate subject, empty for keys built from raw bytes.
    #[must_use]
    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// Verifies `sig` over `data`.
    ///
    /// Returns `Ok(false)` for a well-formed request whose signature does not
    /// match. ECDSA signatures are expected in the fixed `r || s` encoding
    /// used by XML-DSig.
    ///
    /// # Errors
    ///
    /// Returns an error if the algorithm cannot be used with this key.
    pub fn verify(
        &self,
        algorithm: SignatureAlgorithm,
        data: &[u8],
        sig: &[u8],
    ) -> CryptoResult<bool> {
        let verification_alg = self.verification_algorithm(algorithm)?;
        let public_key = UnparsedPublicKey::new(verification_alg, &self.public_key);

        match public_key.verify(data, sig) {
            Ok(()) => Ok(true),
            Err(_) => {
                tracing::debug!(%algorithm, key = %self.kind, "signature did not verify");
                Ok(false)
            }
        }
    }

    fn verification_algorithm(
        &self,
        algorithm: SignatureAlgorithm,
    ) -> CryptoResult<&'static dyn VerificationAlgorithm> {
        let mismatch = || CryptoError::KeyMismatch {
            algorithm: algorithm.uri().to_string(),
            key: self.kind.to_string(),
        };

        if self.kind == KeyKind::Rsa && self.public_key.len() < LEGACY_RSA_KEY_LEN {
            return self.legacy_rsa_algorithm(algorithm);
        }

        let alg: &'static dyn VerificationAlgorithm = match (self.kind, algorithm) {
            (KeyKind::Rsa, SignatureAlgorithm::RsaSha1) => {
                &signature::RSA_PKCS1_2048_8192_SHA1_FOR_LEGACY_USE_ONLY
            }
            (KeyKind::Rsa, SignatureAlgorithm::RsaSha256) => &RSA_PKCS1_2048_8192_SHA256,
            (KeyKind::Rsa, SignatureAlgorithm::RsaSha384) => &RSA_PKCS1_2048_8192_SHA384,
            (KeyKind::Rsa, SignatureAlgorithm::RsaSha512) => &RSA_PKCS1_2048_8192_SHA512,
            (KeyKind::Ec(Curve::P256), SignatureAlgorithm::EcdsaSha256) => {
                &ECDSA_P256_SHA256_FIXED
            }
            (KeyKind::Ec(Curve::P384), SignatureAlgorithm::EcdsaSha384) => {
                &ECDSA_P384_SHA384_FIXED
            }
            (KeyKind::Ec(Curve::P521), SignatureAlgorithm::EcdsaSha512) => {
                &ECDSA_P521_SHA512_FIXED
            }
            (KeyKind::Ec(_), alg) if alg.is_ecdsa() => {
                return Err(CryptoError::UnsupportedAlgorithm(format!(
                    "{alg} with a {} key",
                    self.kind
                )))
            }
            _ => return Err(mismatch()),
        };

        Ok(alg)
    }

    /// Small RSA keys are still issued by older Identity Providers.
    fn legacy_rsa_algorithm(
        &self,
        algorithm: SignatureAlgorithm,
    ) -> CryptoResult<&'static dyn VerificationAlgorithm> {
        tracing::warn!(%algorithm, subject = %self.subject, "RSA key is shorter than 2048 bits");

        let alg: &'static dyn VerificationAlgorithm = match algorithm {
            SignatureAlgorithm::RsaSha1 => &signature::RSA_PKCS1_1024_8192_SHA1_FOR_LEGACY_USE_ONLY,
            SignatureAlgorithm::RsaSha256 => &RSA_PKCS1_1024_8192_SHA256_FOR_LEGACY_USE_ONLY,
            SignatureAlgorithm::RsaSha512 => &RSA_PKCS1_1024_8192_SHA512_FOR_LEGACY_USE_ONLY,
            SignatureAlgorithm::RsaSha384 => {
                return Err(CryptoError::UnsupportedAlgorithm(format!(
                    "{algorithm} with an RSA key shorter than 2048 bits"
                )))
            }
            _ => {
                return Err(CryptoError::KeyMismatch {
                    algorithm: algorithm.uri().to_string(),
                    key: self.kind.to_string(),
                })
            }
        };

        Ok(alg)
    }
}
