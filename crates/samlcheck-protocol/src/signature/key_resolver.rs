//! Sources of verification keys.

use samlcheck_crypto::{normalize_certificate, CryptoResult, VerificationKey};

/// Supplies the key a signature is verified with.
///
/// The verifier only asks for the key; where it comes from (one configured
/// certificate, a rollover set, a metadata lookup) is up to the implementor.
pub trait KeyResolver {
    /// Returns the PEM certificate holding the verification key.
    ///
    /// # Errors
    ///
    /// Returns an error if no key is available.
    fn key_pem(&self) -> CryptoResult<String>;

    /// Returns the parsed verification key.
    ///
    /// # Errors
    ///
    /// Returns an error if the certificate cannot be parsed or carries an
    /// unsupported key.
    fn verification_key(&self) -> CryptoResult<VerificationKey> {
        VerificationKey::from_certificate_pem(&self.key_pem()?)
    }
}

/// Resolves to one fixed certificate.
#[derive(Debug, Clone)]
pub struct CertificateKeyResolver {
    pem: String,
}

impl CertificateKeyResolver {
    /// Creates a resolver for a PEM or bare base64 certificate.
    #[must_use]
    pub fn new(certificate: &str) -> Self {
        Self {
            pem: normalize_certificate(certificate),
        }
    }
}

impl KeyResolver for CertificateKeyResolver {
    fn key_pem(&self) -> CryptoResult<String> {
        Ok(self.pem.clone())
    }
}
