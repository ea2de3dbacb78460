//! HTTP-POST binding.

use base64::Engine;

use crate::error::{SamlError, SamlResult};

use super::{DecodedMessage, SAML_RESPONSE_PARAM};

/// HTTP-POST binding encoder/decoder.
pub struct PostBinding;

impl PostBinding {
    /// Encodes a SAML response as the value of the `SAMLResponse` form field.
    #[must_use]
    pub fn encode_response(xml: &[u8]) -> String {
        base64::engine::general_purpose::STANDARD.encode(xml)
    }

    /// Decodes a SAML response from HTTP-POST form data.
    ///
    /// Line breaks and other whitespace inside the base64 value are ignored,
    /// as browsers and capture tools often wrap long form values.
    ///
    /// # Errors
    ///
    /// Fails if the parameter is missing, is not base64, or does not decode
    /// to UTF-8 text.
    pub fn decode(
        saml_response: Option<&str>,
        relay_state: Option<&str>,
    ) -> SamlResult<DecodedMessage> {
        let encoded = saml_response.ok_or_else(|| {
            SamlError::MalformedInput(format!("no {SAML_RESPONSE_PARAM} parameter"))
        })?;

        let compact: String = encoded.chars().filter(|c| !c.is_ascii_whitespace()).collect();
        let decoded = base64::engine::general_purpose::STANDARD.decode(compact)?;

        let xml = String::from_utf8(decoded)
            .map_err(|e| SamlError::MalformedInput(format!("invalid UTF-8 in message: {e}")))?;

        Ok(DecodedMessage {
            xml,
            relay_state: relay_state.map(String::from),
        })
    }
}
