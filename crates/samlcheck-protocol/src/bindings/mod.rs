//! SAML bindings.
//!
//! Only the HTTP-POST binding is needed: a Service Provider receives the
//! `SAMLResponse` form parameter as base64 text and decodes it before
//! looking at the XML.

mod post;

pub use post::*;

/// Form parameter carrying a SAML response.
pub const SAML_RESPONSE_PARAM: &str = "SAMLResponse";

/// Decoded SAML binding message.
#[derive(Debug, Clone)]
pub struct DecodedMessage {
    /// The decoded XML message.
    pub xml: String,
    /// The RelayState if present.
    pub relay_state: Option<String>,
}
