//! CLI argument parsing.

use std::path::PathBuf;

use clap::Parser;

/// samlcheck - verify the signature of a SAML Response and explain failures.
///
/// Reads one SAML Response (raw XML or the base64 `SAMLResponse` form value)
/// from standard input or `--input`, checks it as a Service Provider would,
/// and on a signature failure checks the assertion signature directly,
/// reporting every signed reference.
#[derive(Debug, Parser)]
#[command(name = "samlcheck")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file (TOML, or JSON when the name ends in .json).
    #[arg(short, long, env = "SAMLCHECK_CONFIG")]
    pub config: Option<PathBuf>,

    /// Read the response from a file instead of standard input.
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// Enable debug logging on standard error.
    #[arg(short, long)]
    pub verbose: bool,

    /// Disable coloured output.
    #[arg(long)]
    pub no_color: bool,
}
