//! # samlcheck-crypto
//!
//! Cryptographic primitives used to check XML signatures on SAML documents,
//! built on aws-lc-rs and x509-parser.
//!
//! - [`algorithm`] - XML-DSig digest and signature algorithm identifiers
//! - [`hash`] - message digests
//! - [`keys`] - verification keys extracted from X.509 certificates
//! - [`pem`] - certificate PEM normalization
//!
//! Legacy algorithms (SHA-1, RSA-SHA1) are accepted because this crate is
//! used to *diagnose* signatures produced by existing identity providers, not
//! to produce new ones.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod algorithm;
pub mod error;
pub mod hash;
pub mod keys;
pub mod pem;

pub use algorithm::{DigestAlgorithm, SignatureAlgorithm};
pub use error::{CryptoError, CryptoResult};
pub use hash::digest;
pub use keys::{KeyKind, VerificationKey};
pub use pem::{certificate_der, normalize_certificate};
