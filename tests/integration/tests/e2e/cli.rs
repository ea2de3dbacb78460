//! The `samlcheck` command over files on disk.

use std::path::{Path, PathBuf};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use samlcheck_cli::{Cli, CliError, Config, TextReporter};
use samlcheck_integration_tests::{assertion, response, signed_response, TestIdp};
use samlcheck_protocol::xml::CanonicalizationMethod;
use samlcheck_protocol::{Diagnostician, ProtocolValidator, SamlResponseEnvelope, Verdict};
use tempfile::TempDir;

fn write_config(dir: &Path, certificate: &str) -> anyhow::Result<PathBuf> {
    std::fs::write(dir.join("idp.pem"), certificate)?;
    let path = dir.join("samlcheck.toml");
    std::fs::write(
        &path,
        r#"[service_provider]
entity_id = "https://sp.example.com/metadata"

[identity_provider]
login_url = "https://idp.example.com/sso"
certificate_files = ["idp.pem"]
"#,
    )?;
    Ok(path)
}

fn cli(config: PathBuf, input: PathBuf) -> Cli {
    Cli {
        config: Some(config),
        input: Some(input),
        verbose: false,
        no_color: true,
    }
}

#[test]
fn accepted_response_exits_successfully() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let idp = TestIdp::generate()?;
    let config = write_config(dir.path(), idp.certificate_pem())?;
    let input = dir.path().join("response.xml");
    std::fs::write(&input, signed_response(&idp)?)?;

    let result = samlcheck_cli::run(&cli(config, input));
    assert_eq!(samlcheck_cli::exit_status(&result), 0);
    assert_eq!(result?, Verdict::Accepted);
    Ok(())
}

#[test]
fn captured_form_value_is_decoded() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let idp = TestIdp::generate()?;
    let config = write_config(dir.path(), idp.certificate_pem())?;
    let input = dir.path().join("response.b64");
    std::fs::write(&input, STANDARD.encode(signed_response(&idp)?))?;

    let verdict = samlcheck_cli::run(&cli(config, input))?;
    assert_eq!(verdict, Verdict::Accepted);
    Ok(())
}

#[test]
fn rejected_response_does_not_exit_successfully() -> anyhow::Result<()> {
    colored::control::set_override(false);
    let dir = TempDir::new()?;
    let idp = TestIdp::generate()?;
    let other = TestIdp::generate()?;
    let config = write_config(dir.path(), other.certificate_pem())?;
    let input = dir.path().join("response.xml");
    std::fs::write(&input, signed_response(&idp)?)?;

    let result = samlcheck_cli::run(&cli(config, input));
    assert_eq!(samlcheck_cli::exit_status(&result), 1);
    assert_eq!(result?, Verdict::Rejected);
    Ok(())
}

#[test]
fn unexplained_response_does_not_exit_successfully() -> anyhow::Result<()> {
    colored::control::set_override(false);
    let dir = TempDir::new()?;
    let idp = TestIdp::generate()?;
    let config = write_config(dir.path(), idp.certificate_pem())?;
    let input = dir.path().join("response.xml");
    let xml = idp.sign_with_reference_uri(
        &response(&assertion("_a1")),
        "_a1",
        &CanonicalizationMethod::exclusive(),
        "",
    )?;
    std::fs::write(&input, xml)?;

    let result = samlcheck_cli::run(&cli(config, input));
    assert_eq!(samlcheck_cli::exit_status(&result), 1);
    assert_eq!(result?, Verdict::Unexplained);
    Ok(())
}

#[test]
fn malformed_input_is_an_error() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let idp = TestIdp::generate()?;
    let config = write_config(dir.path(), idp.certificate_pem())?;
    let input = dir.path().join("response.xml");
    std::fs::write(&input, "<samlp:Response")?;

    let result = samlcheck_cli::run(&cli(config, input));
    assert_eq!(samlcheck_cli::exit_status(&result), 1);
    assert!(matches!(result.unwrap_err(), CliError::Saml(_)));
    Ok(())
}

#[test]
fn missing_config_is_reported_with_a_hint() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let input = dir.path().join("response.xml");
    std::fs::write(&input, "<samlp:Response/>")?;

    let err = samlcheck_cli::run(&cli(dir.path().join("absent.toml"), input)).unwrap_err();
    assert!(matches!(err, CliError::Config(_)));
    assert!(err.hint().is_some());
    Ok(())
}

#[test]
fn report_lists_artifacts_in_order() -> anyhow::Result<()> {
    colored::control::set_override(false);
    let dir = TempDir::new()?;
    let idp = TestIdp::generate()?;
    let other = TestIdp::generate()?;
    let config = Config::load(&write_config(dir.path(), other.certificate_pem())?)?;
    let envelope = SamlResponseEnvelope::new(signed_response(&idp)?.into_bytes());

    let diagnostician = Diagnostician::new(ProtocolValidator::new(), config.trust_material());
    let mut reporter = TextReporter::new(Vec::new(), Vec::new());
    let verdict = diagnostician.run(&envelope, &mut reporter)?;
    reporter.verdict(verdict)?;

    let (out, err) = reporter.into_inner();
    let out = String::from_utf8(out)?;
    let err = String::from_utf8(err)?;

    let assertion = out.find("<saml:Assertion").expect("assertion printed");
    let signature = out.find("<ds:Signature").expect("signature printed");
    let references = out.find("References").expect("reference table printed");
    let result = out
        .find("reference 0 (#_a1): pass")
        .expect("reference result printed");
    let reason = out
        .find("invalid signature: SignatureValue does not match SignedInfo")
        .expect("reason printed");
    assert!(assertion < signature && signature < references);
    assert!(references < result && result < reason);

    assert!(err.contains("SAML assertion signature check failed (checked 1 certificate(s))"));
    assert!(err.contains("signature rejected"));
    Ok(())
}
