use std::fmt;

use samlcheck_crypto::DigestAlgorithm;

use crate::constants::{canonicalization_algorithms, transform_algorithms};

/// One `ds:Transform` of a reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transform {
    /// Algorithm URI.
    pub algorithm: String,
    /// `InclusiveNamespaces PrefixList`, for exclusive canonicalization.
    pub inclusive_prefixes: Option<String>,
}

impl Transform {
    /// Short display name of the algorithm.
    #[must_use]
    pub fn short_name(&self) -> &str {
        match self.algorithm.as_str() {
            transform_algorithms::ENVELOPED_SIGNATURE => "enveloped-signature",
            canonicalization_algorithms::C14N => "c14n",
            canonicalization_algorithms::C14N_WITH_COMMENTS => "c14n#WithComments",
            canonicalization_algorithms::EXCLUSIVE_C14N => "exc-c14n",
            canonicalization_algorithms::EXCLUSIVE_C14N_WITH_COMMENTS => "exc-c14n#WithComments",
            other => other,
        }
    }
}

/// A signed reference as declared in `ds:SignedInfo`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceRecord {
    /// Reference URI; empty means the whole signed document.
    pub uri: String,
    /// Transforms in declaration order.
    pub transforms: Vec<Transform>,
    /// Digest algorithm URI.
    pub digest_method: String,
    /// Base64 digest value with whitespace removed.
    pub digest_value: String,
}

impl ReferenceRecord {
    /// Returns the digest algorithm name, or the raw URI if unknown.
    #[must_use]
    pub fn digest_name(&self) -> String {
        DigestAlgorithm::from_uri(&self.digest_method)
            .map_or_else(|_| self.digest_method.clone(), |alg| alg.to_string())
    }

    /// Returns the transform names joined with `, `.
    #[must_use]
    pub fn transform_names(&self) -> String {
        self.transforms
            .iter()
            .map(Transform::short_name)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for ReferenceRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let uri = if self.uri.is_empty() { "\"\"" } else { &self.uri };
        write!(
            f,
            "{uri} [{}] {} {}",
            self.transform_names(),
            self.digest_name(),
            self.digest_value
        )
    }
}
