//! Error types for cryptographic operations.

use thiserror::Error;

/// Result type for cryptographic operations.
pub type CryptoResult<T> = Result<T, CryptoError>;

/// Error type for cryptographic operations.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// The certificate could not be decoded or parsed.
    #[error("invalid certificate: {0}")]
    InvalidCertificate(String),

    /// The certificate carries a key type this crate cannot verify with.
    #[error("unsupported key type: {0}")]
    UnsupportedKey(String),

    /// The algorithm identifier is unknown or not supported.
    #[error("algorithm not supported: {0}")]
    UnsupportedAlgorithm(String),

    /// The signature algorithm does not match the key type.
    #[error("algorithm {algorithm} cannot be used with a {key} key")]
    KeyMismatch {
        /// Signature algorithm URI.
        algorithm: String,
        /// Key description.
        key: String,
    },
}
