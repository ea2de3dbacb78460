//! CLI error types.

use samlcheck_protocol::SamlError;
use thiserror::Error;

/// CLI error type.
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// The tool was invoked incorrectly.
    #[error("{0}")]
    Usage(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The response could not be processed.
    #[error(transparent)]
    Saml(#[from] SamlError),
}

impl CliError {
    /// Returns a hint on how to invoke the tool correctly, if the error is
    /// one of invocation.
    #[must_use]
    pub const fn hint(&self) -> Option<&'static str> {
        match self {
            Self::Config(_) => Some("pass --config PATH or set SAMLCHECK_CONFIG"),
            Self::Usage(_) => Some("usage: samlcheck [--config PATH] [--input FILE] < response.xml"),
            _ => None,
        }
    }
}

/// CLI result type.
pub type CliResult<T> = Result<T, CliError>;
