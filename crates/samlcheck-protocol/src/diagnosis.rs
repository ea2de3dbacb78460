//! Two-phase verification with fallback diagnosis.
//!
//! The response first goes through the [`ProtocolValidator`]. Only when that
//! rejects it for a signature reason does the fallback run: the assertion and
//! its signature are extracted directly and checked with every configured
//! certificate, reporting each signed reference on its own. Findings are
//! streamed to a [`DiagnosticSink`] in a fixed order:
//!
//! 1. the primary rejection
//! 2. the serialized assertion
//! 3. the serialized signature
//! 4. the reference list
//! 5. one outcome per certificate

use std::io;

use tracing::info;

use crate::envelope::SamlResponseEnvelope;
use crate::error::{ProtocolRejection, SamlError, SamlResult};
use crate::signature::{
    find_assertion, find_signature, ReferenceRecord, RejectionReason, SignedXml,
    Verification,
};
use crate::trust::TrustMaterial;
use crate::validator::{AcceptedResponse, ProtocolValidator};
use crate::xml::Document;

/// Final verdict of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// The protocol validator accepted the response.
    Accepted,
    /// The fallback confirmed the rejection and found reasons.
    Rejected,
    /// The protocol validator rejected the signature but the direct check
    /// passed with at least one certificate.
    Unexplained,
}

impl Verdict {
    /// Returns true only for [`Verdict::Accepted`].
    #[must_use]
    pub const fn is_success(self) -> bool {
        matches!(self, Self::Accepted)
    }
}

/// Receives diagnostic artifacts as they are produced.
pub trait DiagnosticSink {
    /// The response was accepted; no fallback follows.
    fn primary_accepted(&mut self, response: &AcceptedResponse) -> io::Result<()>;

    /// The protocol validator rejected the signature.
    fn primary_rejected(&mut self, rejection: &ProtocolRejection) -> io::Result<()>;

    /// The direct check is starting.
    fn fallback_started(&mut self) -> io::Result<()>;

    /// Exact serialization of the assertion.
    fn assertion(&mut self, xml: &str) -> io::Result<()>;

    /// Exact serialization of the signature.
    fn signature(&mut self, xml: &str) -> io::Result<()>;

    /// Signed references in `SignedInfo` order.
    fn references(&mut self, references: &[ReferenceRecord]) -> io::Result<()>;

    /// Result of checking with the certificate at `certificate`.
    fn outcome(&mut self, certificate: usize, verification: &Verification) -> io::Result<()>;
}

/// Runs the protocol validator and, when it applies, the fallback diagnosis.
#[derive(Debug, Clone)]
pub struct Diagnostician {
    validator: ProtocolValidator,
    trust: TrustMaterial,
}

impl Diagnostician {
    /// Creates a diagnostician for an Identity Provider's certificates.
    #[must_use]
    pub fn new(validator: ProtocolValidator, trust: TrustMaterial) -> Self {
        Self { validator, trust }
    }

    /// Processes one response.
    ///
    /// # Errors
    ///
    /// Returns the fatal errors of the run: malformed input, structural
    /// violations, non-signature protocol rejections and sink I/O failures.
    pub fn run(
        &self,
        envelope: &SamlResponseEnvelope,
        sink: &mut dyn DiagnosticSink,
    ) -> SamlResult<Verdict> {
        let rejection = match self.validator.validate(envelope, &self.trust) {
            Ok(accepted) => {
                sink.primary_accepted(&accepted)?;
                return Ok(Verdict::Accepted);
            }
            Err(SamlError::ProtocolRejection(rejection)) if rejection.category.allows_fallback() => {
                rejection
            }
            Err(e) => return Err(e),
        };

        sink.primary_rejected(&rejection)?;
        sink.fallback_started()?;
        info!("running direct signature check");

        let doc = Document::parse_bytes(envelope.as_bytes())?;
        let assertion = find_assertion(&doc)?;
        let assertion_xml = doc.serialize(assertion);
        sink.assertion(&assertion_xml)?;

        let signature = find_signature(&doc, assertion)?;
        sink.signature(&doc.serialize(signature))?;

        let signed = match SignedXml::load(&doc, signature) {
            Ok(signed) => signed,
            Err(e) => {
                sink.references(&[])?;
                let verification =
                    Verification::aborted(RejectionReason::MalformedSignature(e.to_string()));
                for index in 0..self.trust.len() {
                    sink.outcome(index, &verification)?;
                }
                return Ok(Verdict::Rejected);
            }
        };
        sink.references(signed.references())?;

        let mut passed = false;
        for (index, resolver) in self.trust.resolvers().enumerate() {
            let verification = signed.check(&assertion_xml, &resolver);
            passed |= verification.outcome.is_accepted();
            sink.outcome(index, &verification)?;
        }

        if passed {
            info!("direct check passed where the protocol check failed");
            Ok(Verdict::Unexplained)
        } else {
            Ok(Verdict::Rejected)
        }
    }
}
