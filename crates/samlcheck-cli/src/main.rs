//! # samlcheck
//!
//! Verifies the signature on a SAML Response and explains failures.

#![forbid(unsafe_code)]

use std::process::ExitCode;

use clap::Parser;
use samlcheck_cli::{output::error, Cli};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> ExitCode {
    let cli = Cli::parse();

    if cli.no_color {
        colored::control::set_override(false);
    }

    let default_filter = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| default_filter.into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let result = samlcheck_cli::run(&cli);
    if let Err(e) = &result {
        error(&e.to_string());
        if let Some(hint) = e.hint() {
            eprintln!("{hint}");
        }
    }
    ExitCode::from(samlcheck_cli::exit_status(&result))
}
