//! Identity Provider trust material.

use samlcheck_crypto::normalize_certificate;

use crate::signature::CertificateKeyResolver;

/// Certificates an Identity Provider signs with.
///
/// Certificates are stored as PEM, whatever form they were configured in.
#[derive(Debug, Clone, Default)]
pub struct TrustMaterial {
    certificates: Vec<String>,
}

impl TrustMaterial {
    /// Builds trust material from PEM or bare base64 certificates.
    pub fn new<I, S>(certificates: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            certificates: certificates
                .into_iter()
                .map(|c| normalize_certificate(c.as_ref()))
                .collect(),
        }
    }

    /// Returns the PEM certificates in configuration order.
    #[must_use]
    pub fn certificates(&self) -> &[String] {
        &self.certificates
    }

    /// Returns the number of certificates.
    #[must_use]
    pub fn len(&self) -> usize {
        self.certificates.len()
    }

    /// Returns true if no certificate is configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.certificates.is_empty()
    }

    /// Returns one key resolver per certificate.
    pub fn resolvers(&self) -> impl Iterator<Item = CertificateKeyResolver> + '_ {
        self.certificates
            .iter()
            .map(|pem| CertificateKeyResolver::new(pem))
    }
}
