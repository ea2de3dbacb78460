//! Locating the assertion and its signature.

use thiserror::Error;

use crate::constants::{SAML_NS, XMLDSIG_NS};
use crate::error::SamlError;
use crate::xml::{Document, NodeId};

/// The signature search did not find exactly one element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum LocateError {
    /// No `ds:Signature` inside the assertion.
    #[error("no ds:Signature found in the assertion")]
    SignatureNotFound,
    /// More than one `ds:Signature` inside the assertion.
    #[error("{0} ds:Signature elements found in the assertion")]
    AmbiguousSignature(usize),
}

impl From<LocateError> for SamlError {
    fn from(err: LocateError) -> Self {
        let found = match err {
            LocateError::SignatureNotFound => 0,
            LocateError::AmbiguousSignature(count) => count,
        };
        Self::exactly_one("ds:Signature", found)
    }
}

/// Finds the single `saml:Assertion` of a document.
///
/// # Errors
///
/// Returns [`SamlError::StructuralViolation`] unless exactly one assertion
/// exists.
pub fn find_assertion(doc: &Document) -> Result<NodeId, SamlError> {
    let assertions = doc.descendants_named(doc.document_node(), SAML_NS, "Assertion");
    match assertions.as_slice() {
        [assertion] => Ok(*assertion),
        other => Err(SamlError::exactly_one("saml:Assertion", other.len())),
    }
}

/// Finds the single `ds:Signature` below an assertion.
///
/// # Errors
///
/// Returns [`LocateError`] unless exactly one signature exists.
pub fn find_signature(doc: &Document, assertion: NodeId) -> Result<NodeId, LocateError> {
    let signatures = doc.descendants_named(assertion, XMLDSIG_NS, "Signature");
    match signatures.as_slice() {
        [] => Err(LocateError::SignatureNotFound),
        [signature] => Ok(*signature),
        more => Err(LocateError::AmbiguousSignature(more.len())),
    }
}
