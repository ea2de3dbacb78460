//! Namespace-aware XML document model.
//!
//! Documents are parsed with quick-xml into an arena of nodes addressed by
//! [`NodeId`]. The arena owns every node; parent links are plain ids, so the
//! tree has no reference cycles. Each element keeps the byte span it came
//! from, which lets [`Document::serialize`] hand back the exact source text of
//! any subtree.
//!
//! [`c14n`] implements Canonical XML 1.0 and Exclusive XML Canonicalization
//! 1.0 over the same arena.

pub mod c14n;
mod document;

pub use c14n::{Canonicalizer, CanonicalizationMethod};
pub use document::{Attribute, Document, Element, NamespaceDecl, NodeId, NodeKind, QName};

use thiserror::Error;

/// The reserved `xml` prefix namespace.
pub const XML_NS: &str = "http://www.w3.org/XML/1998/namespace";

/// Result type for XML operations.
pub type XmlResult<T> = Result<T, XmlError>;

/// Errors raised while parsing XML.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum XmlError {
    /// The input is not well-formed XML.
    #[error("not well-formed at byte {position}: {message}")]
    Malformed {
        /// Byte offset where the problem was detected.
        position: usize,
        /// Description of the problem.
        message: String,
    },

    /// The input is not valid UTF-8.
    #[error("input is not valid UTF-8: {0}")]
    Encoding(String),
}
