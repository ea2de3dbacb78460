//! SAML error types.
//!
//! [`SamlError`] covers the conditions that stop a verification run. Failed
//! cryptographic checks are not errors; they are reported as
//! [`RejectionReason`](crate::signature::RejectionReason)s inside a
//! [`ValidationOutcome`](crate::signature::ValidationOutcome).

use std::fmt;

use thiserror::Error;

use crate::xml::XmlError;

/// Result type for SAML operations.
pub type SamlResult<T> = Result<T, SamlError>;

/// SAML processing errors.
#[derive(Debug, Error)]
pub enum SamlError {
    /// The input is not well-formed XML.
    #[error("malformed input: {0}")]
    MalformedInput(String),

    /// An element that must occur exactly once occurs a different number of times.
    #[error("expected {expected} {element} element(s), found {found}")]
    StructuralViolation {
        /// Qualified name of the element.
        element: &'static str,
        /// Expected count, as text ("exactly one").
        expected: &'static str,
        /// Number found.
        found: usize,
    },

    /// The protocol validator rejected the response.
    #[error("{0}")]
    ProtocolRejection(ProtocolRejection),

    /// Base64 decoding error.
    #[error("base64 decode error: {0}")]
    Base64Decode(String),

    /// Reading the input failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SamlError {
    /// Builds a [`SamlError::StructuralViolation`] for an element required exactly once.
    #[must_use]
    pub const fn exactly_one(element: &'static str, found: usize) -> Self {
        Self::StructuralViolation {
            element,
            expected: "exactly one",
            found,
        }
    }

    /// Returns true if the error ends the run without any further diagnosis.
    ///
    /// Only a signature-category protocol rejection lets the fallback run.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        match self {
            Self::ProtocolRejection(rejection) => !rejection.category.allows_fallback(),
            _ => true,
        }
    }
}

impl From<XmlError> for SamlError {
    fn from(err: XmlError) -> Self {
        Self::MalformedInput(err.to_string())
    }
}

impl From<base64::DecodeError> for SamlError {
    fn from(err: base64::DecodeError) -> Self {
        Self::Base64Decode(err.to_string())
    }
}

impl From<ProtocolRejection> for SamlError {
    fn from(rejection: ProtocolRejection) -> Self {
        Self::ProtocolRejection(rejection)
    }
}

/// Category of a protocol-level rejection, fixed where the rejection is raised.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectionCategory {
    /// The signature check failed.
    Signature,
    /// Any other reason (status, unsupported content, wrong document type).
    Other,
}

impl RejectionCategory {
    /// Returns true if the direct signature diagnosis applies.
    #[must_use]
    pub const fn allows_fallback(self) -> bool {
        matches!(self, Self::Signature)
    }
}

impl fmt::Display for RejectionCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Signature => f.write_str("signature"),
            Self::Other => f.write_str("other"),
        }
    }
}

/// A rejection raised by the protocol validator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtocolRejection {
    /// Rejection category.
    pub category: RejectionCategory,
    /// Human-readable message.
    pub message: String,
}

impl ProtocolRejection {
    /// Creates a signature-category rejection.
    pub fn signature(message: impl Into<String>) -> Self {
        Self {
            category: RejectionCategory::Signature,
            message: message.into(),
        }
    }

    /// Creates a rejection of any other category.
    pub fn other(message: impl Into<String>) -> Self {
        Self {
            category: RejectionCategory::Other,
            message: message.into(),
        }
    }
}

impl fmt::Display for ProtocolRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}
