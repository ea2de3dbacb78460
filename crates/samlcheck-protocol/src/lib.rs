//! SAML Response signature validation and diagnosis.
//!
//! This crate decides whether a Service Provider would accept the signature
//! on a SAML Response and, when it would not, explains which part of the
//! XML signature failed:
//!
//! - **Protocol validation** - process the response as received over the
//!   HTTP-POST binding and check its signature against the Identity
//!   Provider's certificates
//! - **Direct verification** - recompute every reference digest and the
//!   `SignatureValue` of the assertion's `ds:Signature`, one certificate at a
//!   time, and report each failing check separately
//!
//! # Architecture
//!
//! - [`xml`] - namespace-aware XML tree and canonicalization
//! - [`signature`] - XML-DSig parsing and verification
//! - [`bindings`] - HTTP-POST binding
//! - [`validator`] - Service Provider side validation
//! - [`diagnosis`] - the two-phase run and its reporting sink
//! - [`error`] - error types and rejection categories
//!
//! # Example
//!
//! ```rust,ignore
//! use samlcheck_protocol::{Diagnostician, ProtocolValidator, SamlResponseEnvelope, TrustMaterial};
//!
//! let trust = TrustMaterial::new([idp_certificate]);
//! let diagnostician = Diagnostician::new(ProtocolValidator::new(), trust);
//! let verdict = diagnostician.run(&SamlResponseEnvelope::new(bytes), &mut sink)?;
//! ```
//!
//! # Specifications
//!
//! - [SAML 2.0 Core](https://docs.oasis-open.org/security/saml/v2.0/saml-core-2.0-os.pdf)
//! - [SAML 2.0 Bindings](https://docs.oasis-open.org/security/saml/v2.0/saml-bindings-2.0-os.pdf)
//! - [XML Signature](https://www.w3.org/TR/xmldsig-core1/)
//! - [Canonical XML 1.0](https://www.w3.org/TR/xml-c14n)
//! - [Exclusive XML Canonicalization 1.0](https://www.w3.org/TR/xml-exc-c14n/)

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod bindings;
pub mod constants;
pub mod diagnosis;
pub mod envelope;
pub mod error;
pub mod signature;
pub mod trust;
pub mod validator;
pub mod xml;

#[cfg(test)]
mod test_support;

pub use diagnosis::{DiagnosticSink, Diagnostician, Verdict};
pub use envelope::SamlResponseEnvelope;
pub use error::{ProtocolRejection, RejectionCategory, SamlError, SamlResult};
pub use signature::{
    verify, CertificateKeyResolver, KeyResolver, ReferenceRecord, RejectionReason, SignedXml,
    ValidationOutcome, Verification,
};
pub use trust::TrustMaterial;
pub use validator::{AcceptedResponse, ProtocolValidator, SignedScope};
