//! The SAML Response as received.

use base64::Engine;

use crate::bindings::PostBinding;
use crate::error::SamlResult;

const UTF8_BYTE_ORDER_MARK: &[u8] = b"\xEF\xBB\xBF";

/// Raw bytes of one SAML Response.
///
/// The envelope has no identity beyond its content and is never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SamlResponseEnvelope {
    bytes: Vec<u8>,
}

impl SamlResponseEnvelope {
    /// Wraps raw XML bytes.
    #[must_use]
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    /// Builds an envelope from captured input that is either raw XML or the
    /// base64 `SAMLResponse` form value.
    ///
    /// Input whose first non-whitespace byte is `<` is taken as XML, with or
    /// without a leading UTF-8 byte order mark; anything else is
    /// base64-decoded first.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::Base64Decode`](crate::SamlError::Base64Decode) if
    /// non-XML input is not valid base64.
    pub fn from_captured(input: Vec<u8>) -> SamlResult<Self> {
        let body = input.strip_prefix(UTF8_BYTE_ORDER_MARK).unwrap_or(&input[..]);
        let first = body.iter().copied().find(|b| !b.is_ascii_whitespace());
        if first == Some(b'<') || first.is_none() {
            return Ok(Self::new(input));
        }

        let compact: Vec<u8> = input
            .into_iter()
            .filter(|b| !b.is_ascii_whitespace())
            .collect();
        let bytes = base64::engine::general_purpose::STANDARD.decode(compact)?;
        tracing::debug!(len = bytes.len(), "decoded base64 input");
        Ok(Self::new(bytes))
    }

    /// Returns the XML bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Returns the POST-binding form value for this response.
    #[must_use]
    pub fn post_form_value(&self) -> String {
        PostBinding::encode_response(&self.bytes)
    }
}
