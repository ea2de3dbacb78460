//! Certificate PEM handling.
//!
//! Identity provider configuration usually carries the signing certificate
//! as a bare base64 blob copied out of metadata. [`normalize_certificate`]
//! turns such a blob into a PEM block; already wrapped input is returned
//! unchanged.

use x509_parser::pem::parse_x509_pem;

use crate::error::{CryptoError, CryptoResult};

const PEM_HEADER: &str = "-----BEGIN CERTIFICATE-----";
const PEM_FOOTER: &str = "-----END CERTIFICATE-----";
const PEM_LINE_WIDTH: usize = 64;

/// Wraps a raw base64 certificate body in a PEM envelope.
///
/// Input starting with `-----BEGIN` is returned as is. Otherwise whitespace
/// is dropped and the body is re-wrapped at 64 characters per line between
/// the certificate header and footer. The body is not validated.
#[must_use]
pub fn normalize_certificate(certificate: &str) -> String {
    if certificate.starts_with("-----BEGIN") {
        return certificate.to_string();
    }

    let body: Vec<char> = certificate.chars().filter(|c| !c.is_whitespace()).collect();

    let mut lines = Vec::with_capacity(body.len() / PEM_LINE_WIDTH + 2);
    lines.push(PEM_HEADER.to_string());
    lines.extend(
        body.chunks(PEM_LINE_WIDTH)
            .map(|chunk| chunk.iter().collect::<String>()),
    );
    lines.push(PEM_FOOTER.to_string());
    lines.join("\n")
}

/// Decodes a certificate given as PEM or raw base64 into DER bytes.
///
/// # Errors
///
/// Returns [`CryptoError::InvalidCertificate`] if no certificate block can be
/// decoded.
pub fn certificate_der(certificate: &str) -> CryptoResult<Vec<u8>> {
    let pem = normalize_certificate(certificate.trim_start());
    let (_, block) = parse_x509_pem(pem.as_bytes())
        .map_err(|e| CryptoError::InvalidCertificate(format!("malformed PEM: {e}")))?;

    if block.label != "CERTIFICATE" {
        return Err(CryptoError::InvalidCertificate(format!(
            "expected a CERTIFICATE block, found {}",
            block.label
        )));
    }

    Ok(block.contents)
}
