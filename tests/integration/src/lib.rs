//! Signed SAML fixtures for the end-to-end tests.
//!
//! [`TestIdp`] plays the Identity Provider: it owns a fresh P-256 key with a
//! self-signed certificate and can sign any element of a response that
//! carries an `ID` and a `saml:Issuer` child.

use anyhow::{anyhow, Context};
use aws_lc_rs::rand::SystemRandom;
use aws_lc_rs::signature::{EcdsaKeyPair, ECDSA_P256_SHA256_FIXED_SIGNING};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use samlcheck_crypto::algorithm::{digest_uris, signature_uris};
use samlcheck_crypto::{digest, DigestAlgorithm};
use samlcheck_protocol::constants::{
    status_codes, transform_algorithms, EXC_C14N_NS, SAMLP_NS, SAML_NS, XMLDSIG_NS,
};
use samlcheck_protocol::xml::{CanonicalizationMethod, Canonicalizer, Document, NodeId};

const PENDING_SIGNATURE_VALUE: &str = "PENDING";

/// Subject of every fixture assertion.
pub const SUBJECT: &str = "alice@example.com";

/// Issuer of every fixture response and assertion.
pub const ISSUER: &str = "https://idp.example.com";

/// An Identity Provider signing key and its certificate.
pub struct TestIdp {
    certificate_pem: String,
    certificate_der: Vec<u8>,
    key: EcdsaKeyPair,
}

impl TestIdp {
    /// Generates a new key pair and self-signed certificate.
    pub fn generate() -> anyhow::Result<Self> {
        let key_pair = rcgen::KeyPair::generate()?;
        let params = rcgen::CertificateParams::new(vec!["idp.example.com".to_string()])?;
        let certificate = params.self_signed(&key_pair)?;
        let key = EcdsaKeyPair::from_pkcs8(
            &ECDSA_P256_SHA256_FIXED_SIGNING,
            &key_pair.serialize_der(),
        )
        .map_err(|e| anyhow!("rejected PKCS#8 key: {e}"))?;

        Ok(Self {
            certificate_pem: certificate.pem(),
            certificate_der: certificate.der().to_vec(),
            key,
        })
    }

    /// PEM encoded certificate.
    pub fn certificate_pem(&self) -> &str {
        &self.certificate_pem
    }

    /// Bare base64 certificate body, as Identity Provider metadata carries it.
    pub fn certificate_base64(&self) -> String {
        STANDARD.encode(&self.certificate_der)
    }

    /// Signs the element whose `ID` is `id` with an enveloped signature,
    /// placed right after that element's `saml:Issuer`.
    pub fn sign(&self, xml: &str, id: &str, method: &CanonicalizationMethod) -> anyhow::Result<String> {
        self.sign_with_reference_uri(xml, id, method, &format!("#{id}"))
    }

    /// Like [`sign`](Self::sign), but the single reference carries `uri`
    /// instead of `#id`. With `""` the reference covers the whole signed
    /// document, which is the element `id` once it is cut out on its own.
    pub fn sign_with_reference_uri(
        &self,
        xml: &str,
        id: &str,
        method: &CanonicalizationMethod,
        uri: &str,
    ) -> anyhow::Result<String> {
        let doc = Document::parse(xml)?;
        let target = doc
            .element_by_id(id)
            .with_context(|| format!("no element with ID {id}"))?;
        let canonical = Canonicalizer::new(&doc, method.clone()).canonicalize(target);
        let digest_value = STANDARD.encode(digest(DigestAlgorithm::Sha256, canonical.as_bytes()));

        let signature = format!(
            r#"<ds:Signature xmlns:ds="{XMLDSIG_NS}">{}<ds:SignatureValue>{PENDING_SIGNATURE_VALUE}</ds:SignatureValue><ds:KeyInfo><ds:X509Data><ds:X509Certificate>{}</ds:X509Certificate></ds:X509Data></ds:KeyInfo></ds:Signature>"#,
            signed_info(uri, method, &digest_value),
            self.certificate_base64(),
        );
        let placed = insert_after_issuer(xml, id, &signature)?;

        // SignedInfo is canonicalized where it sits, with every namespace in scope.
        let doc = Document::parse(&placed)?;
        let signed_info = pending_signed_info(&doc)?;
        let signed_info_method = CanonicalizationMethod {
            inclusive_prefixes: Vec::new(),
            ..method.clone()
        };
        let canonical = Canonicalizer::new(&doc, signed_info_method).canonicalize(signed_info);
        let value = self
            .key
            .sign(&SystemRandom::new(), canonical.as_bytes())
            .map_err(|_| anyhow!("ECDSA signing failed"))?;

        Ok(placed.replacen(
            &format!(">{PENDING_SIGNATURE_VALUE}<"),
            &format!(">{}<", STANDARD.encode(value.as_ref())),
            1,
        ))
    }

    /// Signs `id` with exclusive canonicalization.
    pub fn sign_exclusive(&self, xml: &str, id: &str) -> anyhow::Result<String> {
        self.sign(xml, id, &CanonicalizationMethod::exclusive())
    }
}

fn signed_info(uri: &str, method: &CanonicalizationMethod, digest_value: &str) -> String {
    let c14n = method.uri();
    let enveloped = transform_algorithms::ENVELOPED_SIGNATURE;
    let prefix_list = if method.inclusive_prefixes.is_empty() {
        String::new()
    } else {
        format!(
            r#"<ec:InclusiveNamespaces xmlns:ec="{EXC_C14N_NS}" PrefixList="{}"/>"#,
            method.inclusive_prefixes.join(" ")
        )
    };
    format!(
        r#"<ds:SignedInfo><ds:CanonicalizationMethod Algorithm="{c14n}"/><ds:SignatureMethod Algorithm="{}"/><ds:Reference URI="{uri}"><ds:Transforms><ds:Transform Algorithm="{enveloped}"/><ds:Transform Algorithm="{c14n}">{prefix_list}</ds:Transform></ds:Transforms><ds:DigestMethod Algorithm="{}"/><ds:DigestValue>{digest_value}</ds:DigestValue></ds:Reference></ds:SignedInfo>"#,
        signature_uris::ECDSA_SHA256,
        digest_uris::SHA256,
    )
}

fn insert_after_issuer(xml: &str, id: &str, signature: &str) -> anyhow::Result<String> {
    let start = xml
        .find(&format!("ID=\"{id}\""))
        .with_context(|| format!("no ID=\"{id}\" attribute"))?;
    let issuer_end = xml[start..]
        .find("</saml:Issuer>")
        .map(|offset| start + offset + "</saml:Issuer>".len())
        .with_context(|| format!("element {id} has no saml:Issuer"))?;

    let mut signed = String::with_capacity(xml.len() + signature.len());
    signed.push_str(&xml[..issuer_end]);
    signed.push_str(signature);
    signed.push_str(&xml[issuer_end..]);
    Ok(signed)
}

fn pending_signed_info(doc: &Document) -> anyhow::Result<NodeId> {
    doc.descendants_named(doc.document_node(), XMLDSIG_NS, "Signature")
        .into_iter()
        .find(|&signature| {
            doc.first_child_named(signature, XMLDSIG_NS, "SignatureValue")
                .is_some_and(|value| doc.text_content(value) == PENDING_SIGNATURE_VALUE)
        })
        .and_then(|signature| doc.first_child_named(signature, XMLDSIG_NS, "SignedInfo"))
        .context("inserted signature not found")
}

/// An unsigned assertion about [`SUBJECT`].
pub fn assertion(id: &str) -> String {
    format!(
        r#"<saml:Assertion xmlns:saml="{SAML_NS}" ID="{id}" Version="2.0" IssueInstant="2024-01-01T00:00:00Z"><saml:Issuer>{ISSUER}</saml:Issuer>
    <saml:Subject><saml:NameID Format="urn:oasis:names:tc:SAML:1.1:nameid-format:emailAddress">{SUBJECT}</saml:NameID></saml:Subject>
    <saml:AttributeStatement><saml:Attribute Name="role"><saml:AttributeValue>admin</saml:AttributeValue></saml:Attribute></saml:AttributeStatement>
  </saml:Assertion>"#
    )
}

/// A `samlp:Response` with ID `_r1` and a success status around `body`.
pub fn response(body: &str) -> String {
    response_with_status(status_codes::SUCCESS, body)
}

/// A `samlp:Response` with ID `_r1`, the given status code and `body`.
pub fn response_with_status(status: &str, body: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<samlp:Response xmlns:samlp="{SAMLP_NS}" xmlns:saml="{SAML_NS}" ID="_r1" Version="2.0" IssueInstant="2024-01-01T00:00:00Z" Destination="https://sp.example.com/acs">
  <saml:Issuer>{ISSUER}</saml:Issuer>
  <samlp:Status><samlp:StatusCode Value="{status}"/></samlp:Status>
  {body}
</samlp:Response>"#
    )
}

/// A response carrying one assertion `_a1` signed by `idp`.
pub fn signed_response(idp: &TestIdp) -> anyhow::Result<String> {
    idp.sign_exclusive(&response(&assertion("_a1")), "_a1")
}
