//! Results of a direct signature check.

use std::fmt;

/// Why a signature was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectionReason {
    /// A reference digest does not match the digest of its content.
    ReferenceMismatch {
        /// Position of the reference in `SignedInfo`, starting at 0.
        index: usize,
        /// Reference URI.
        uri: String,
        /// Digest stored in the signature.
        expected: String,
        /// Digest computed over the referenced content.
        computed: String,
    },
    /// A reference URI does not designate an element of the signed text.
    UnresolvableReference {
        /// Position of the reference in `SignedInfo`.
        index: usize,
        /// Reference URI.
        uri: String,
    },
    /// `SignatureValue` does not verify over the canonical `SignedInfo`.
    SignatureValueMismatch,
    /// The `Signature` element lacks required content.
    MalformedSignature(String),
    /// The verification key could not be obtained or used.
    KeyResolution(String),
    /// An algorithm or transform is not supported.
    UnsupportedAlgorithm(String),
}

impl fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReferenceMismatch {
                index,
                uri,
                expected,
                computed,
            } => write!(
                f,
                "invalid digest for reference {index} (uri: {uri}): expected {expected}, computed {computed}"
            ),
            Self::UnresolvableReference { index, uri } => {
                write!(f, "cannot resolve reference {index} (uri: {uri})")
            }
            Self::SignatureValueMismatch => {
                f.write_str("invalid signature: SignatureValue does not match SignedInfo")
            }
            Self::MalformedSignature(detail) => write!(f, "malformed signature: {detail}"),
            Self::KeyResolution(detail) => write!(f, "cannot use verification key: {detail}"),
            Self::UnsupportedAlgorithm(detail) => write!(f, "unsupported algorithm: {detail}"),
        }
    }
}

/// Accepted, or rejected with one reason per failing check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationOutcome {
    /// Every check passed.
    Accepted,
    /// At least one check failed.
    Rejected {
        /// Failures in the order they were found.
        reasons: Vec<RejectionReason>,
    },
}

impl ValidationOutcome {
    /// `Accepted` when `reasons` is empty, `Rejected` otherwise.
    #[must_use]
    pub fn from_reasons(reasons: Vec<RejectionReason>) -> Self {
        if reasons.is_empty() {
            Self::Accepted
        } else {
            Self::Rejected { reasons }
        }
    }

    /// Returns true for [`ValidationOutcome::Accepted`].
    #[must_use]
    pub const fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted)
    }

    /// Returns the rejection reasons; empty when accepted.
    #[must_use]
    pub fn reasons(&self) -> &[RejectionReason] {
        match self {
            Self::Accepted => &[],
            Self::Rejected { reasons } => reasons,
        }
    }
}

/// Digest comparison result for one reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DigestStatus {
    /// The digest matched.
    Passed,
    /// The digest did not match.
    Failed,
    /// The digest could not be computed.
    Skipped,
}

impl fmt::Display for DigestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Passed => f.write_str("pass"),
            Self::Failed => f.write_str("FAIL"),
            Self::Skipped => f.write_str("skipped"),
        }
    }
}

/// Per-reference result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceCheck {
    /// Position in `SignedInfo`.
    pub index: usize,
    /// Reference URI.
    pub uri: String,
    /// Digest comparison result.
    pub status: DigestStatus,
}

/// Everything one verification attempt found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verification {
    /// Reference results in `SignedInfo` order.
    pub references: Vec<ReferenceCheck>,
    /// Overall outcome.
    pub outcome: ValidationOutcome,
}

impl Verification {
    /// A verification that stopped before any reference was examined.
    #[must_use]
    pub fn aborted(reason: RejectionReason) -> Self {
        Self {
            references: Vec::new(),
            outcome: ValidationOutcome::Rejected {
                reasons: vec![reason],
            },
        }
    }
}
