//! Unit-test access to the signed fixtures of `samlcheck-integration-tests`.
//!
//! Only strings cross this boundary, so the second copy of this crate that
//! the fixture crate links against never meets the types under test.

use samlcheck_integration_tests as fixtures;

pub(crate) use fixtures::response as response_with;

/// An identity provider with a fresh P-256 key and self-signed certificate.
pub(crate) struct TestIdp {
    pub cert_pem: String,
    idp: fixtures::TestIdp,
}

impl TestIdp {
    pub fn generate() -> Self {
        let idp = fixtures::TestIdp::generate().unwrap();
        Self {
            cert_pem: idp.certificate_pem().to_string(),
            idp,
        }
    }

    /// An unsigned assertion with the given ID.
    pub fn assertion(id: &str) -> String {
        fixtures::assertion(id)
    }

    /// Signs a standalone assertion with exclusive canonicalization.
    pub fn sign_assertion(&self, assertion: &str) -> String {
        let doc = crate::xml::Document::parse(assertion).unwrap();
        let id = doc.element(doc.root()).unwrap().attribute("ID").unwrap().to_string();
        self.idp.sign_exclusive(assertion, &id).unwrap()
    }
}
