//! Direct XML-DSig verification.
//!
//! [`SignedXml::load`] reads a `ds:Signature` element into its parts and
//! [`SignedXml::check`] verifies it against the text of the signed element.
//! The two steps are separate so a caller can report the reference list
//! before knowing the outcome. Every failed check becomes a
//! [`RejectionReason`]; nothing short of an unreadable signature stops the
//! remaining checks from running.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use samlcheck_crypto::{digest, CryptoError, DigestAlgorithm, SignatureAlgorithm, VerificationKey};
use thiserror::Error;
use tracing::{debug, warn};

use crate::constants::{transform_algorithms, EXC_C14N_NS, XMLDSIG_NS};
use crate::xml::{CanonicalizationMethod, Canonicalizer, Document, NodeId};

use super::key_resolver::KeyResolver;
use super::outcome::{DigestStatus, ReferenceCheck, RejectionReason, ValidationOutcome, Verification};
use super::reference::{ReferenceRecord, Transform};

/// A `ds:Signature` element lacks required content.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct SignatureParseError(String);

/// A parsed `ds:Signature`.
#[derive(Debug, Clone)]
pub struct SignedXml {
    canonicalization: String,
    signature_method: String,
    references: Vec<ReferenceRecord>,
    signature_value: String,
    canonical_signed_info: Option<String>,
}

impl SignedXml {
    /// Reads the signature rooted at `signature` in `doc`.
    ///
    /// `SignedInfo` is canonicalized here, in the context of `doc`, so the
    /// namespaces it inherits are the ones of the document the signature was
    /// found in.
    ///
    /// # Errors
    ///
    /// Returns [`SignatureParseError`] if a required element, attribute or
    /// value is missing.
    pub fn load(doc: &Document, signature: NodeId) -> Result<Self, SignatureParseError> {
        if !doc.is_named(signature, XMLDSIG_NS, "Signature") {
            return Err(SignatureParseError("node is not a ds:Signature".to_string()));
        }

        let signed_info = required_child(doc, signature, "SignedInfo")?;
        let c14n_node = required_child(doc, signed_info, "CanonicalizationMethod")?;
        let canonicalization = algorithm(doc, c14n_node)?;
        let signature_method = algorithm(doc, required_child(doc, signed_info, "SignatureMethod")?)?;

        let references = doc
            .children_named(signed_info, XMLDSIG_NS, "Reference")
            .map(|reference| load_reference(doc, reference))
            .collect::<Result<Vec<_>, _>>()?;
        if references.is_empty() {
            return Err(SignatureParseError("SignedInfo has no Reference".to_string()));
        }

        let signature_value = compact(&doc.text_content(required_child(
            doc,
            signature,
            "SignatureValue",
        )?));
        if signature_value.is_empty() {
            return Err(SignatureParseError("SignatureValue is empty".to_string()));
        }

        let canonical_signed_info = CanonicalizationMethod::from_uri(&canonicalization)
            .map(|method| with_prefixes(method, inclusive_prefixes(doc, c14n_node).as_deref()))
            .map(|method| Canonicalizer::new(doc, method).canonicalize(signed_info));

        Ok(Self {
            canonicalization,
            signature_method,
            references,
            signature_value,
            canonical_signed_info,
        })
    }

    /// Returns the signed references in `SignedInfo` order.
    #[must_use]
    pub fn references(&self) -> &[ReferenceRecord] {
        &self.references
    }

    /// Returns the `SignedInfo` canonicalization URI.
    #[must_use]
    pub fn canonicalization(&self) -> &str {
        &self.canonicalization
    }

    /// Returns the signature algorithm URI.
    #[must_use]
    pub fn signature_method(&self) -> &str {
        &self.signature_method
    }

    /// Returns the base64 `SignatureValue` with whitespace removed.
    #[must_use]
    pub fn signature_value(&self) -> &str {
        &self.signature_value
    }

    /// Verifies the signature against `signed_text`, the serialized element
    /// the signature is embedded in.
    ///
    /// References are resolved in `signed_text` parsed on its own. The result
    /// depends only on the inputs.
    pub fn check(&self, signed_text: &str, resolver: &dyn KeyResolver) -> Verification {
        let mut reasons = Vec::new();

        let key = match resolver.verification_key() {
            Ok(key) => Some(key),
            Err(e) => {
                reasons.push(RejectionReason::KeyResolution(e.to_string()));
                None
            }
        };

        let signed = match Document::parse(signed_text) {
            Ok(doc) => doc,
            Err(e) => {
                reasons.push(RejectionReason::MalformedSignature(format!(
                    "signed content does not parse: {e}"
                )));
                return Verification {
                    references: Vec::new(),
                    outcome: ValidationOutcome::from_reasons(reasons),
                };
            }
        };

        let mut references = Vec::with_capacity(self.references.len());
        for (index, reference) in self.references.iter().enumerate() {
            let status = match self.check_reference(&signed, index, reference) {
                Ok(()) => DigestStatus::Passed,
                Err(reason) => {
                    let status = match reason {
                        RejectionReason::ReferenceMismatch { .. }
                        | RejectionReason::UnresolvableReference { .. } => DigestStatus::Failed,
                        _ => DigestStatus::Skipped,
                    };
                    reasons.push(reason);
                    status
                }
            };
            references.push(ReferenceCheck {
                index,
                uri: reference.uri.clone(),
                status,
            });
        }

        if let Some(key) = key {
            if let Err(reason) = self.check_signature_value(&key) {
                reasons.push(reason);
            }
        }

        let outcome = ValidationOutcome::from_reasons(reasons);
        if !outcome.is_accepted() {
            warn!(failures = outcome.reasons().len(), "signature rejected");
        }
        Verification {
            references,
            outcome,
        }
    }

    fn check_reference(
        &self,
        signed: &Document,
        index: usize,
        reference: &ReferenceRecord,
    ) -> Result<(), RejectionReason> {
        let target =
            resolve_uri(signed, &reference.uri).ok_or_else(|| RejectionReason::UnresolvableReference {
                index,
                uri: reference.uri.clone(),
            })?;

        let mut method = None;
        let mut enveloped = false;
        for transform in &reference.transforms {
            if transform.algorithm == transform_algorithms::ENVELOPED_SIGNATURE {
                enveloped = true;
                continue;
            }
            let parsed = CanonicalizationMethod::from_uri(&transform.algorithm).ok_or_else(|| {
                RejectionReason::UnsupportedAlgorithm(format!("transform {}", transform.algorithm))
            })?;
            method = Some(with_prefixes(parsed, transform.inclusive_prefixes.as_deref()));
        }

        let algorithm = DigestAlgorithm::from_uri(&reference.digest_method)
            .map_err(|e| RejectionReason::UnsupportedAlgorithm(e.to_string()))?;

        let excluded = if enveloped {
            self.enveloped_signature(signed)
        } else {
            None
        };
        let canonical = Canonicalizer::new(signed, method.unwrap_or_default())
            .excluding(excluded)
            .canonicalize(target);
        let computed = digest(algorithm, canonical.as_bytes());
        let computed_b64 = STANDARD.encode(&computed);

        debug!(index, uri = %reference.uri, %algorithm, %canonical, digest = %computed_b64, "reference digest");

        let matches = STANDARD
            .decode(&reference.digest_value)
            .is_ok_and(|expected| expected == computed);
        if matches {
            Ok(())
        } else {
            Err(RejectionReason::ReferenceMismatch {
                index,
                uri: reference.uri.clone(),
                expected: reference.digest_value.clone(),
                computed: computed_b64,
            })
        }
    }

    fn check_signature_value(&self, key: &VerificationKey) -> Result<(), RejectionReason> {
        let canonical = self.canonical_signed_info.as_deref().ok_or_else(|| {
            RejectionReason::UnsupportedAlgorithm(format!("canonicalization {}", self.canonicalization))
        })?;
        let algorithm = SignatureAlgorithm::from_uri(&self.signature_method)
            .map_err(|e| RejectionReason::UnsupportedAlgorithm(e.to_string()))?;
        if algorithm.is_deprecated() {
            warn!(%algorithm, "signature uses a deprecated algorithm");
        }

        let signature = STANDARD.decode(&self.signature_value).map_err(|e| {
            RejectionReason::MalformedSignature(format!("SignatureValue is not base64: {e}"))
        })?;

        debug!(%algorithm, signed_info = %canonical, "checking SignatureValue");
        match key.verify(algorithm, canonical.as_bytes(), &signature) {
            Ok(true) => Ok(()),
            Ok(false) => Err(RejectionReason::SignatureValueMismatch),
            Err(CryptoError::UnsupportedAlgorithm(detail)) => {
                Err(RejectionReason::UnsupportedAlgorithm(detail))
            }
            Err(e) => Err(RejectionReason::KeyResolution(e.to_string())),
        }
    }

    /// The `ds:Signature` of `signed` carrying this signature's value.
    fn enveloped_signature(&self, signed: &Document) -> Option<NodeId> {
        signed
            .descendants_named(signed.document_node(), XMLDSIG_NS, "Signature")
            .into_iter()
            .find(|&candidate| {
                signed
                    .first_child_named(candidate, XMLDSIG_NS, "SignatureValue")
                    .is_some_and(|value| compact(&signed.text_content(value)) == self.signature_value)
            })
    }
}

/// Loads and checks the signature in one step.
///
/// A signature that cannot be read is reported as
/// [`RejectionReason::MalformedSignature`].
pub fn verify(
    doc: &Document,
    signature: NodeId,
    signed_text: &str,
    resolver: &dyn KeyResolver,
) -> ValidationOutcome {
    match SignedXml::load(doc, signature) {
        Ok(signed) => signed.check(signed_text, resolver).outcome,
        Err(e) => ValidationOutcome::from_reasons(vec![RejectionReason::MalformedSignature(
            e.to_string(),
        )]),
    }
}

fn load_reference(doc: &Document, reference: NodeId) -> Result<ReferenceRecord, SignatureParseError> {
    let uri = doc
        .element(reference)
        .and_then(|e| e.attribute("URI"))
        .unwrap_or_default()
        .to_string();

    let mut transforms = Vec::new();
    if let Some(list) = doc.first_child_named(reference, XMLDSIG_NS, "Transforms") {
        for transform in doc.children_named(list, XMLDSIG_NS, "Transform") {
            transforms.push(Transform {
                algorithm: algorithm(doc, transform)?,
                inclusive_prefixes: inclusive_prefixes(doc, transform),
            });
        }
    }

    let digest_method = algorithm(doc, required_child(doc, reference, "DigestMethod")?)?;
    let digest_value = compact(&doc.text_content(required_child(doc, reference, "DigestValue")?));
    if digest_value.is_empty() {
        return Err(SignatureParseError(format!(
            "Reference {uri:?} has an empty DigestValue"
        )));
    }

    Ok(ReferenceRecord {
        uri,
        transforms,
        digest_method,
        digest_value,
    })
}

fn required_child(doc: &Document, parent: NodeId, local: &str) -> Result<NodeId, SignatureParseError> {
    doc.first_child_named(parent, XMLDSIG_NS, local).ok_or_else(|| {
        let parent_name = doc
            .element(parent)
            .map_or_else(String::new, |e| e.name.local.clone());
        SignatureParseError(format!("{parent_name} has no {local} element"))
    })
}

fn algorithm(doc: &Document, node: NodeId) -> Result<String, SignatureParseError> {
    let element = doc
        .element(node)
        .ok_or_else(|| SignatureParseError("expected an element".to_string()))?;
    element
        .attribute("Algorithm")
        .map(String::from)
        .ok_or_else(|| SignatureParseError(format!("{} has no Algorithm attribute", element.name.local)))
}

fn inclusive_prefixes(doc: &Document, node: NodeId) -> Option<String> {
    doc.first_child_named(node, EXC_C14N_NS, "InclusiveNamespaces")
        .and_then(|n| doc.element(n))
        .and_then(|e| e.attribute("PrefixList"))
        .map(String::from)
}

fn with_prefixes(method: CanonicalizationMethod, prefixes: Option<&str>) -> CanonicalizationMethod {
    match prefixes {
        Some(list) if method.exclusive => method.with_prefix_list(list),
        _ => method,
    }
}

fn resolve_uri(doc: &Document, uri: &str) -> Option<NodeId> {
    match uri {
        "" | "#xpointer(/)" => Some(doc.root()),
        _ => uri.strip_prefix('#').and_then(|id| doc.element_by_id(id)),
    }
}

fn compact(text: &str) -> String {
    text.chars().filter(|c| !c.is_whitespace()).collect()
}
