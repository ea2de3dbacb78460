//! Output formatting utilities.
//!
//! [`TextReporter`] renders a diagnosis run for a terminal: artifacts go to
//! the output stream in the order they are produced, the primary rejection
//! and the final verdict go to the error stream.

use std::io::{self, Write};

use colored::Colorize;
use samlcheck_protocol::signature::{DigestStatus, ReferenceCheck};
use samlcheck_protocol::{
    AcceptedResponse, DiagnosticSink, ProtocolRejection, ReferenceRecord, SignedScope,
    Verdict, Verification,
};
use tabled::{settings::Style, Table, Tabled};

/// Prints an error message.
pub fn error(message: &str) {
    eprintln!("{} {}", "✗".red().bold(), message);
}

const SEPARATOR: &str = "------------------------------------------------------------";

/// Reference row for display.
#[derive(Debug, Clone, Tabled)]
struct ReferenceRow {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "URI")]
    uri: String,
    #[tabled(rename = "Transforms")]
    transforms: String,
    #[tabled(rename = "Digest")]
    digest: String,
    #[tabled(rename = "Digest value")]
    digest_value: String,
}

impl ReferenceRow {
    fn new(index: usize, reference: &ReferenceRecord) -> Self {
        Self {
            index,
            uri: display_uri(&reference.uri),
            transforms: reference.transform_names(),
            digest: reference.digest_name(),
            digest_value: reference.digest_value.clone(),
        }
    }
}

fn display_uri(uri: &str) -> String {
    if uri.is_empty() {
        "\"\" (document)".to_string()
    } else {
        uri.to_string()
    }
}

/// Terminal [`DiagnosticSink`].
pub struct TextReporter<O, E> {
    out: O,
    err: E,
}

impl<O: Write, E: Write> TextReporter<O, E> {
    /// Creates a reporter writing artifacts to `out` and rejections to `err`.
    pub fn new(out: O, err: E) -> Self {
        Self { out, err }
    }

    /// Writes the closing line for `verdict`.
    pub fn verdict(&mut self, verdict: Verdict) -> io::Result<()> {
        match verdict {
            Verdict::Accepted => Ok(()),
            Verdict::Rejected => writeln!(
                self.err,
                "{} signature rejected, see the reasons above",
                "✗".red().bold()
            ),
            Verdict::Unexplained => writeln!(
                self.err,
                "{} the direct signature check passed but the response was rejected; cause unknown",
                "⚠".yellow().bold()
            ),
        }
    }

    /// Consumes the reporter and returns its streams.
    pub fn into_inner(self) -> (O, E) {
        (self.out, self.err)
    }

    fn section(&mut self, title: &str) -> io::Result<()> {
        writeln!(self.out, "{SEPARATOR}")?;
        writeln!(self.out, "{}", title.bold())?;
        writeln!(self.out, "{SEPARATOR}")
    }

    fn reference_line(&mut self, check: &ReferenceCheck) -> io::Result<()> {
        let status = check.status.to_string();
        let status = match check.status {
            DigestStatus::Passed => status.green(),
            DigestStatus::Failed => status.red().bold(),
            DigestStatus::Skipped => status.yellow(),
        };
        writeln!(
            self.out,
            "  reference {} ({}): {status}",
            check.index,
            display_uri(&check.uri)
        )
    }
}

impl<O: Write, E: Write> DiagnosticSink for TextReporter<O, E> {
    fn primary_accepted(&mut self, response: &AcceptedResponse) -> io::Result<()> {
        let scope = match response.scope {
            SignedScope::Response => "response",
            SignedScope::Assertion => "assertion",
        };
        writeln!(
            self.out,
            "{} SAML response accepted: {scope} signature verified with certificate #{}{}",
            "✓".green().bold(),
            response.certificate + 1,
            response
                .issuer
                .as_deref()
                .map(|issuer| format!(" (issuer {issuer})"))
                .unwrap_or_default()
        )
    }

    fn primary_rejected(&mut self, rejection: &ProtocolRejection) -> io::Result<()> {
        writeln!(self.err, "{} {}", "✗".red().bold(), rejection.message)
    }

    fn fallback_started(&mut self) -> io::Result<()> {
        writeln!(
            self.err,
            "{} checking the assertion signature directly",
            "ℹ".blue().bold()
        )
    }

    fn assertion(&mut self, xml: &str) -> io::Result<()> {
        self.section("Assertion")?;
        writeln!(self.out, "{xml}")
    }

    fn signature(&mut self, xml: &str) -> io::Result<()> {
        self.section("Signature")?;
        writeln!(self.out, "{xml}")
    }

    fn references(&mut self, references: &[ReferenceRecord]) -> io::Result<()> {
        self.section("References")?;
        if references.is_empty() {
            return writeln!(self.out, "(none)");
        }
        let rows: Vec<ReferenceRow> = references
            .iter()
            .enumerate()
            .map(|(index, reference)| ReferenceRow::new(index, reference))
            .collect();
        let table = Table::new(rows).with(Style::rounded()).to_string();
        writeln!(self.out, "{table}")
    }

    fn outcome(&mut self, certificate: usize, verification: &Verification) -> io::Result<()> {
        self.section(&format!("Result with certificate #{}", certificate + 1))?;
        for check in &verification.references {
            self.reference_line(check)?;
        }
        if verification.outcome.is_accepted() {
            return writeln!(self.out, "{} signature valid", "✓".green().bold());
        }
        for reason in verification.outcome.reasons() {
            writeln!(self.out, "{} {reason}", "✗".red().bold())?;
        }
        Ok(())
    }
}
