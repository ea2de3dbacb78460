//! Acquiring the SAML response.

use std::io::{IsTerminal, Read};
use std::path::Path;

use samlcheck_protocol::SamlResponseEnvelope;

use crate::error::{CliError, CliResult};

/// Reads the response from `path`, or from standard input when `path` is
/// `None`.
///
/// Standard input attached to a terminal is refused: the tool expects a
/// redirected file or a pipe.
pub fn read_envelope(path: Option<&Path>) -> CliResult<SamlResponseEnvelope> {
    let bytes = match path {
        Some(path) => std::fs::read(path)?,
        None => {
            let stdin = std::io::stdin();
            if stdin.is_terminal() {
                return Err(CliError::Usage(
                    "standard input is a terminal, not a file".to_string(),
                ));
            }
            let mut bytes = Vec::new();
            stdin.lock().read_to_end(&mut bytes)?;
            bytes
        }
    };

    tracing::debug!(len = bytes.len(), "read SAML response");
    Ok(SamlResponseEnvelope::from_captured(bytes)?)
}
