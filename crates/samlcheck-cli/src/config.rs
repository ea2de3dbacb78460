//! CLI configuration.
//!
//! One file describes both sides of the trust relationship:
//!
//! ```toml
//! [service_provider]
//! entity_id = "https://sp.example.com/metadata"
//!
//! [identity_provider]
//! login_url = "https://idp.example.com/sso"
//! certificates = ["MIIC..."]
//! certificate_files = ["idp.pem"]
//! ```

use std::path::{Path, PathBuf};

use samlcheck_protocol::TrustMaterial;
use serde::{Deserialize, Serialize};

use crate::error::{CliError, CliResult};

/// File read when neither `--config` nor `SAMLCHECK_CONFIG` is given.
pub const DEFAULT_CONFIG_FILE: &str = "samlcheck.toml";

/// CLI configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Service Provider settings.
    #[serde(default)]
    pub service_provider: ServiceProviderConfig,

    /// Identity Provider settings.
    pub identity_provider: IdentityProviderConfig,
}

/// Service Provider settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServiceProviderConfig {
    /// Entity id of the Service Provider.
    pub entity_id: Option<String>,
}

/// Identity Provider settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IdentityProviderConfig {
    /// Single sign-on URL.
    #[serde(default)]
    pub login_url: String,

    /// Signing certificates, PEM or bare base64.
    #[serde(default, deserialize_with = "one_or_many")]
    pub certificates: Vec<String>,

    /// Files holding signing certificates, relative to the configuration file.
    #[serde(default)]
    pub certificate_files: Vec<PathBuf>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(certificate) => vec![certificate],
        OneOrMany::Many(certificates) => certificates,
    })
}

impl Config {
    /// Gets the configuration file path: the flag (or `SAMLCHECK_CONFIG`,
    /// which clap folds into it), else [`DEFAULT_CONFIG_FILE`].
    #[must_use]
    pub fn resolve_path(flag: Option<&Path>) -> PathBuf {
        flag.map_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE), Path::to_path_buf)
    }

    /// Loads, resolves and validates the configuration at `path`.
    ///
    /// Certificate files are read and appended to the inline certificates.
    pub fn load(path: &Path) -> CliResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            CliError::Config(format!("failed to read {}: {e}", path.display()))
        })?;

        let mut config = Self::parse(&content, is_json(path))?;

        let base = path.parent().unwrap_or_else(|| Path::new(""));
        for file in &config.identity_provider.certificate_files {
            let cert_path = base.join(file);
            let pem = std::fs::read_to_string(&cert_path).map_err(|e| {
                CliError::Config(format!(
                    "failed to read certificate {}: {e}",
                    cert_path.display()
                ))
            })?;
            config.identity_provider.certificates.push(pem);
        }

        config.validate()?;
        tracing::debug!(
            path = %path.display(),
            certificates = config.identity_provider.certificates.len(),
            "configuration loaded"
        );
        Ok(config)
    }

    /// Parses configuration text without resolving certificate files.
    pub fn parse(content: &str, json: bool) -> CliResult<Self> {
        if json {
            serde_json::from_str(content)
                .map_err(|e| CliError::Config(format!("failed to parse config: {e}")))
        } else {
            toml::from_str(content)
                .map_err(|e| CliError::Config(format!("failed to parse config: {e}")))
        }
    }

    /// Checks the settings the tool cannot run without.
    pub fn validate(&self) -> CliResult<()> {
        if self.identity_provider.login_url.trim().is_empty() {
            return Err(CliError::Config(
                "identity_provider.login_url is required".to_string(),
            ));
        }
        if self
            .identity_provider
            .certificates
            .iter()
            .all(|c| c.trim().is_empty())
        {
            return Err(CliError::Config(
                "identity_provider needs at least one certificate".to_string(),
            ));
        }
        Ok(())
    }

    /// Returns the Identity Provider certificates as trust material.
    #[must_use]
    pub fn trust_material(&self) -> TrustMaterial {
        TrustMaterial::new(
            self.identity_provider
                .certificates
                .iter()
                .map(|c| c.trim())
                .filter(|c| !c.is_empty()),
        )
    }
}

fn is_json(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
}
