//! Accept, reject and fatal paths of a full run.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use samlcheck_integration_tests::{
    assertion, response, response_with_status, signed_response, TestIdp, ISSUER,
};
use samlcheck_protocol::constants::status_codes;
use samlcheck_protocol::xml::CanonicalizationMethod;
use samlcheck_protocol::signature::DigestStatus;
use samlcheck_protocol::{
    RejectionCategory, RejectionReason, SamlError, SamlResponseEnvelope, SignedScope,
    ValidationOutcome, Verdict,
};

use crate::common::{diagnose, diagnose_envelope, Event};

#[test]
fn valid_response_is_accepted_without_fallback() -> anyhow::Result<()> {
    let idp = TestIdp::generate()?;
    let xml = signed_response(&idp)?;

    let (verdict, recorder) = diagnose(&xml, &[idp.certificate_pem()]);
    let verdict = verdict?;
    assert_eq!(verdict, Verdict::Accepted);
    assert!(verdict.is_success());
    assert!(!recorder.fallback_ran());

    match recorder.events.as_slice() {
        [Event::Accepted(accepted)] => {
            assert_eq!(accepted.scope, SignedScope::Assertion);
            assert_eq!(accepted.assertion_id.as_deref(), Some("_a1"));
            assert_eq!(accepted.issuer.as_deref(), Some(ISSUER));
        }
        other => panic!("unexpected events: {other:?}"),
    }
    Ok(())
}

#[test]
fn byte_order_mark_is_accepted() -> anyhow::Result<()> {
    let idp = TestIdp::generate()?;
    let xml = format!("\u{FEFF}{}", signed_response(&idp)?);

    let (verdict, recorder) = diagnose(&xml, &[idp.certificate_pem()]);
    assert_eq!(verdict?, Verdict::Accepted);
    assert!(!recorder.fallback_ran());

    let envelope = SamlResponseEnvelope::from_captured(xml.clone().into_bytes())?;
    assert_eq!(envelope.as_bytes(), xml.as_bytes());
    let (verdict, _) = diagnose_envelope(&envelope, &[idp.certificate_pem()]);
    assert_eq!(verdict?, Verdict::Accepted);
    Ok(())
}

#[test]
fn byte_order_mark_keeps_fallback_artifacts_intact() -> anyhow::Result<()> {
    let idp = TestIdp::generate()?;
    let other = TestIdp::generate()?;
    let xml = format!("\u{FEFF}{}", signed_response(&idp)?);

    let (verdict, recorder) = diagnose(&xml, &[other.certificate_pem()]);
    assert_eq!(verdict?, Verdict::Rejected);
    match &recorder.events[2] {
        Event::Assertion(text) => {
            assert!(text.starts_with("<saml:Assertion"));
            assert!(text.ends_with("</saml:Assertion>"));
        }
        other => panic!("expected the assertion, got {other:?}"),
    }
    let outcomes = recorder.outcomes();
    assert_eq!(outcomes[0].1, &[DigestStatus::Passed]);
    assert_eq!(outcomes[0].2.reasons(), &[RejectionReason::SignatureValueMismatch]);
    Ok(())
}

#[test]
fn whole_document_reference_is_unexplained() -> anyhow::Result<()> {
    let idp = TestIdp::generate()?;
    let other = TestIdp::generate()?;
    let xml = idp.sign_with_reference_uri(
        &response(&assertion("_a1")),
        "_a1",
        &CanonicalizationMethod::exclusive(),
        "",
    )?;

    let (verdict, recorder) = diagnose(&xml, &[other.certificate_pem(), idp.certificate_pem()]);
    let verdict = verdict?;
    assert_eq!(verdict, Verdict::Unexplained);
    assert!(!verdict.is_success());

    match &recorder.events[0] {
        Event::Rejected(rejection) => assert_eq!(rejection.category, RejectionCategory::Signature),
        other => panic!("expected the primary rejection first, got {other:?}"),
    }
    match &recorder.events[4] {
        Event::References(references) => assert_eq!(references[0].uri, ""),
        other => panic!("expected the references, got {other:?}"),
    }

    let outcomes = recorder.outcomes();
    assert_eq!(outcomes.len(), 2);
    assert_eq!(outcomes[0].2.reasons(), &[RejectionReason::SignatureValueMismatch]);
    assert_eq!(outcomes[1].0, 1);
    assert_eq!(outcomes[1].1, &[DigestStatus::Passed]);
    assert_eq!(*outcomes[1].2, ValidationOutcome::Accepted);
    let accepted = outcomes.iter().filter(|(_, _, o)| o.is_accepted()).count();
    assert_eq!(accepted, 1);
    Ok(())
}

#[test]
fn bare_base64_certificate_is_accepted() -> anyhow::Result<()> {
    let idp = TestIdp::generate()?;
    let xml = signed_response(&idp)?;
    let body = idp.certificate_base64();

    let (verdict, _) = diagnose(&xml, &[body.as_str()]);
    assert_eq!(verdict?, Verdict::Accepted);
    Ok(())
}

#[test]
fn wrong_certificate_is_diagnosed_as_signature_mismatch() -> anyhow::Result<()> {
    let idp = TestIdp::generate()?;
    let other = TestIdp::generate()?;
    let xml = signed_response(&idp)?;

    let (verdict, recorder) = diagnose(&xml, &[other.certificate_pem()]);
    let verdict = verdict?;
    assert_eq!(verdict, Verdict::Rejected);
    assert!(!verdict.is_success());

    match &recorder.events[0] {
        Event::Rejected(rejection) => assert_eq!(rejection.category, RejectionCategory::Signature),
        other => panic!("expected the primary rejection first, got {other:?}"),
    }
    assert_eq!(recorder.events[1], Event::FallbackStarted);

    match &recorder.events[2] {
        Event::Assertion(text) => {
            assert!(text.starts_with("<saml:Assertion"));
            assert!(text.contains("ID=\"_a1\""));
        }
        other => panic!("expected the assertion, got {other:?}"),
    }
    match &recorder.events[3] {
        Event::Signature(text) => assert!(text.starts_with("<ds:Signature")),
        other => panic!("expected the signature, got {other:?}"),
    }
    match &recorder.events[4] {
        Event::References(references) => {
            assert_eq!(references.len(), 1);
            assert_eq!(references[0].uri, "#_a1");
            assert_eq!(references[0].digest_name(), "SHA-256");
        }
        other => panic!("expected the references, got {other:?}"),
    }

    let outcomes = recorder.outcomes();
    assert_eq!(outcomes.len(), 1);
    let (certificate, references, outcome) = outcomes[0];
    assert_eq!(certificate, 0);
    assert_eq!(references, &[DigestStatus::Passed]);
    assert_eq!(outcome.reasons(), &[RejectionReason::SignatureValueMismatch]);
    Ok(())
}

#[test]
fn every_certificate_gets_an_outcome() -> anyhow::Result<()> {
    let idp = TestIdp::generate()?;
    let first = TestIdp::generate()?;
    let second = TestIdp::generate()?;
    let xml = signed_response(&idp)?;

    let (verdict, recorder) = diagnose(&xml, &[first.certificate_pem(), second.certificate_pem()]);
    assert_eq!(verdict?, Verdict::Rejected);

    let certificates: Vec<usize> = recorder.outcomes().iter().map(|(c, _, _)| *c).collect();
    assert_eq!(certificates, vec![0, 1]);
    Ok(())
}

#[test]
fn two_assertions_are_a_structural_violation() -> anyhow::Result<()> {
    let idp = TestIdp::generate()?;
    let xml = response(&format!("{}{}", assertion("_a1"), assertion("_a2")));
    let xml = idp.sign_exclusive(&xml, "_a1")?;

    let (verdict, recorder) = diagnose(&xml, &[idp.certificate_pem()]);
    match verdict {
        Err(SamlError::StructuralViolation { element, found, .. }) => {
            assert_eq!(element, "saml:Assertion");
            assert_eq!(found, 2);
        }
        other => panic!("expected a structural violation, got {other:?}"),
    }
    assert!(recorder.outcomes().is_empty());
    Ok(())
}

#[test]
fn malformed_xml_is_fatal() {
    let (verdict, recorder) = diagnose("<samlp:Response", &[]);
    let err = verdict.unwrap_err();
    assert!(matches!(err, SamlError::MalformedInput(_)));
    assert!(err.is_fatal());
    assert!(recorder.events.is_empty());
}

#[test]
fn failed_status_does_not_run_fallback() -> anyhow::Result<()> {
    let idp = TestIdp::generate()?;
    let xml = idp.sign_exclusive(
        &response_with_status(status_codes::REQUESTER, &assertion("_a1")),
        "_a1",
    )?;

    let (verdict, recorder) = diagnose(&xml, &[idp.certificate_pem()]);
    match verdict {
        Err(SamlError::ProtocolRejection(rejection)) => {
            assert_eq!(rejection.category, RejectionCategory::Other);
        }
        other => panic!("expected a protocol rejection, got {other:?}"),
    }
    assert!(!recorder.fallback_ran());
    Ok(())
}

#[test]
fn base64_form_value_is_accepted() -> anyhow::Result<()> {
    let idp = TestIdp::generate()?;
    let encoded = STANDARD.encode(signed_response(&idp)?);
    let wrapped: String = encoded
        .as_bytes()
        .chunks(76)
        .map(|line| format!("{}\n", String::from_utf8_lossy(line)))
        .collect();

    let envelope = SamlResponseEnvelope::from_captured(wrapped.into_bytes())?;
    let (verdict, _) = diagnose_envelope(&envelope, &[idp.certificate_pem()]);
    assert_eq!(verdict?, Verdict::Accepted);
    Ok(())
}

#[test]
fn repeated_runs_report_the_same() -> anyhow::Result<()> {
    let idp = TestIdp::generate()?;
    let other = TestIdp::generate()?;
    let xml = signed_response(&idp)?;

    let (first_verdict, first) = diagnose(&xml, &[other.certificate_pem()]);
    let (second_verdict, second) = diagnose(&xml, &[other.certificate_pem()]);
    assert_eq!(first_verdict?, second_verdict?);
    assert_eq!(first.events, second.events);
    Ok(())
}
