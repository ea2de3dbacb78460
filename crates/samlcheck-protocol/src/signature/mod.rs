//! XML Signature support for SAML.
//!
//! This module verifies XML Digital Signatures (XML-DSig) embedded in SAML
//! documents and reports failures per signed reference.
//!
//! # Algorithms
//!
//! Digests: SHA-1, SHA-256, SHA-384, SHA-512.
//!
//! Signatures:
//! - RSA-SHA1, RSA-SHA256, RSA-SHA384, RSA-SHA512
//! - ECDSA-SHA256 (P-256), ECDSA-SHA384 (P-384), ECDSA-SHA512 (P-521)
//!
//! Canonicalization: Canonical XML 1.0 and Exclusive XML Canonicalization
//! 1.0, with or without comments.

mod key_resolver;
mod locator;
mod outcome;
mod reference;
mod verifier;

pub use key_resolver::{CertificateKeyResolver, KeyResolver};
pub use locator::{find_assertion, find_signature, LocateError};
pub use outcome::{DigestStatus, ReferenceCheck, RejectionReason, ValidationOutcome, Verification};
pub use reference::{ReferenceRecord, Transform};
pub use verifier::{verify, SignatureParseError, SignedXml};
