//! # samlcheck-cli
//!
//! The `samlcheck` command: reads a SAML Response, checks its signature
//! against the configured Identity Provider certificates, and when the check
//! fails prints the assertion, its signature, the signed references and every
//! failing check.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod cli;
pub mod config;
pub mod error;
pub mod input;
pub mod output;

use samlcheck_protocol::{Diagnostician, ProtocolValidator, Verdict};

pub use cli::Cli;
pub use config::Config;
pub use error::{CliError, CliResult};
pub use output::TextReporter;

/// Runs one check as described by `cli`.
pub fn run(cli: &Cli) -> CliResult<Verdict> {
    let config_path = Config::resolve_path(cli.config.as_deref());
    let config = Config::load(&config_path)?;
    let envelope = input::read_envelope(cli.input.as_deref())?;

    let mut validator = ProtocolValidator::new();
    if let Some(entity_id) = &config.service_provider.entity_id {
        validator = validator.with_entity_id(entity_id.as_str());
    }
    let diagnostician = Diagnostician::new(validator, config.trust_material());

    let stdout = std::io::stdout();
    let stderr = std::io::stderr();
    let mut reporter = TextReporter::new(stdout.lock(), stderr.lock());
    let verdict = diagnostician.run(&envelope, &mut reporter)?;
    reporter.verdict(verdict)?;

    tracing::info!(?verdict, "done");
    Ok(verdict)
}

/// Process exit status for the result of [`run`]: `0` only for an accepted
/// response, `1` for every other verdict and for errors.
#[must_use]
pub fn exit_status(result: &CliResult<Verdict>) -> u8 {
    match result {
        Ok(verdict) if verdict.is_success() => 0,
        _ => 1,
    }
}
