//! Service Provider side processing of a POST-binding SAML Response.
//!
//! [`ProtocolValidator::validate`] decides whether a Service Provider would
//! accept the response. Only the signature is judged; conditions such as
//! audience and validity window are not checked. Every rejection carries a
//! [`RejectionCategory`](crate::RejectionCategory) fixed at the point it is
//! raised.

use tracing::{debug, info, warn};

use crate::bindings::PostBinding;
use crate::constants::{status_codes, SAMLP_NS, SAML_NS, XMLDSIG_NS};
use crate::envelope::SamlResponseEnvelope;
use crate::error::{ProtocolRejection, SamlError, SamlResult};
use crate::signature::{find_assertion, SignedXml};
use crate::trust::TrustMaterial;
use crate::xml::{Document, NodeId};

/// Which element the accepted signature covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignedScope {
    /// The whole `samlp:Response`.
    Response,
    /// The `saml:Assertion` only.
    Assertion,
}

/// Summary of an accepted response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcceptedResponse {
    /// `ID` of the response.
    pub response_id: Option<String>,
    /// `ID` of the assertion.
    pub assertion_id: Option<String>,
    /// Issuer of the assertion.
    pub issuer: Option<String>,
    /// Element covered by the signature that verified.
    pub scope: SignedScope,
    /// Index of the certificate that verified it.
    pub certificate: usize,
}

/// A signature that may vouch for the assertion.
struct Candidate {
    scope: SignedScope,
    signed_node: NodeId,
    signature: SignedXml,
}

/// Validates SAML Responses the way a Service Provider receiving them over
/// the HTTP-POST binding would.
#[derive(Debug, Clone, Default)]
pub struct ProtocolValidator {
    entity_id: Option<String>,
}

impl ProtocolValidator {
    /// Creates a validator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the Service Provider entity id, used in log output only.
    #[must_use]
    pub fn with_entity_id(mut self, entity_id: impl Into<String>) -> Self {
        self.entity_id = Some(entity_id.into());
        self
    }

    /// Validates `envelope` against `trust`.
    ///
    /// # Errors
    ///
    /// - [`SamlError::MalformedInput`] if the payload is not well-formed XML
    /// - [`SamlError::StructuralViolation`] unless there is exactly one assertion
    /// - [`SamlError::ProtocolRejection`] for any other reason the response is
    ///   not accepted; signature failures carry
    ///   [`RejectionCategory::Signature`](crate::RejectionCategory::Signature)
    pub fn validate(
        &self,
        envelope: &SamlResponseEnvelope,
        trust: &TrustMaterial,
    ) -> SamlResult<AcceptedResponse> {
        let form_value = envelope.post_form_value();
        let message = PostBinding::decode(Some(&form_value), None)?;
        let doc = Document::parse(&message.xml)?;
        let root = doc.root();

        info!(
            sp = self.entity_id.as_deref().unwrap_or("-"),
            certificates = trust.len(),
            "validating SAML response"
        );

        if !doc.is_named(root, SAMLP_NS, "Response") {
            let name = doc
                .element(root)
                .map_or_else(String::new, |e| e.name.to_string());
            return Err(rejected_other(format!(
                "expected a samlp:Response document, found {name}"
            )));
        }

        check_status(&doc, root)?;

        if !doc
            .descendants_named(root, SAML_NS, "EncryptedAssertion")
            .is_empty()
        {
            return Err(rejected_other("encrypted assertions are not supported"));
        }

        let assertion = find_assertion(&doc)?;
        let candidates = candidates(&doc, root, assertion);
        debug!(candidates = candidates.len(), "signature candidates");

        for (index, resolver) in trust.resolvers().enumerate() {
            for candidate in &candidates {
                let signed_text = doc.serialize(candidate.signed_node);
                let verification = candidate.signature.check(&signed_text, &resolver);
                if verification.outcome.is_accepted() {
                    info!(certificate = index, scope = ?candidate.scope, "signature verified");
                    return Ok(AcceptedResponse {
                        response_id: attribute(&doc, root, "ID"),
                        assertion_id: attribute(&doc, assertion, "ID"),
                        issuer: doc
                            .first_child_named(assertion, SAML_NS, "Issuer")
                            .map(|issuer| doc.text_content(issuer).trim().to_string()),
                        scope: candidate.scope,
                        certificate: index,
                    });
                }
            }
        }

        let message = format!(
            "SAML assertion signature check failed (checked {} certificate(s))",
            trust.len()
        );
        warn!(%message, "response rejected");
        Err(SamlError::ProtocolRejection(ProtocolRejection::signature(message)))
    }
}

fn rejected_other(message: impl Into<String>) -> SamlError {
    let rejection = ProtocolRejection::other(message);
    warn!(message = %rejection.message, "response rejected");
    SamlError::ProtocolRejection(rejection)
}

fn check_status(doc: &Document, root: NodeId) -> SamlResult<()> {
    let code = doc
        .first_child_named(root, SAMLP_NS, "Status")
        .and_then(|status| doc.first_child_named(status, SAMLP_NS, "StatusCode"))
        .and_then(|code| attribute(doc, code, "Value"));

    match code.as_deref() {
        Some(status_codes::SUCCESS) => Ok(()),
        Some(other) => Err(rejected_other(format!("response status is {other}"))),
        None => Err(rejected_other("response has no status code")),
    }
}

/// Direct-child signatures of the response and of the assertion whose first
/// reference points at the element they sit in.
fn candidates(doc: &Document, root: NodeId, assertion: NodeId) -> Vec<Candidate> {
    [(SignedScope::Response, root), (SignedScope::Assertion, assertion)]
        .into_iter()
        .flat_map(move |(scope, signed_node)| {
            doc.children_named(signed_node, XMLDSIG_NS, "Signature")
                .filter_map(move |node| {
                    let signature = match SignedXml::load(doc, node) {
                        Ok(signature) => signature,
                        Err(e) => {
                            debug!(error = %e, ?scope, "ignoring unreadable signature");
                            return None;
                        }
                    };
                    let expected = format!("#{}", attribute(doc, signed_node, "ID")?);
                    let covers = signature
                        .references()
                        .first()
                        .is_some_and(|reference| reference.uri == expected);
                    covers.then_some(Candidate {
                        scope,
                        signed_node,
                        signature,
                    })
                })
        })
        .collect()
}

fn attribute(doc: &Document, node: NodeId, name: &str) -> Option<String> {
    doc.element(node)
        .and_then(|e| e.attribute(name))
        .map(String::from)
}
