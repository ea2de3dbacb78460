//! Responses altered after signing.

use samlcheck_integration_tests::{signed_response, TestIdp};
use samlcheck_protocol::signature::DigestStatus;
use samlcheck_protocol::{RejectionReason, Verdict};

use crate::common::diagnose;

/// Replaces the first character of the text content of `element`.
fn flip_first_char(xml: &str, element: &str) -> String {
    let open = format!("<{element}>");
    let start = xml.find(&open).map(|i| i + open.len()).expect("element present");
    let replacement = if xml[start..].starts_with('A') { "B" } else { "A" };
    format!("{}{replacement}{}", &xml[..start], &xml[start + 1..])
}

#[test]
fn altered_content_fails_the_reference_digest() -> anyhow::Result<()> {
    let idp = TestIdp::generate()?;
    let xml = signed_response(&idp)?.replace(">admin<", ">admln<");

    let (verdict, recorder) = diagnose(&xml, &[idp.certificate_pem()]);
    assert_eq!(verdict?, Verdict::Rejected);

    let outcomes = recorder.outcomes();
    let (_, references, outcome) = outcomes[0];
    assert_eq!(references, &[DigestStatus::Failed]);
    match outcome.reasons() {
        [RejectionReason::ReferenceMismatch {
            index,
            uri,
            expected,
            computed,
        }] => {
            assert_eq!(*index, 0);
            assert_eq!(uri, "#_a1");
            assert_ne!(expected, computed);
        }
        other => panic!("unexpected reasons: {other:?}"),
    }
    Ok(())
}

#[test]
fn altered_signature_value_fails_only_the_signature() -> anyhow::Result<()> {
    let idp = TestIdp::generate()?;
    let xml = flip_first_char(&signed_response(&idp)?, "ds:SignatureValue");

    let (verdict, recorder) = diagnose(&xml, &[idp.certificate_pem()]);
    assert_eq!(verdict?, Verdict::Rejected);

    let outcomes = recorder.outcomes();
    let (_, references, outcome) = outcomes[0];
    assert_eq!(references, &[DigestStatus::Passed]);
    assert_eq!(outcome.reasons(), &[RejectionReason::SignatureValueMismatch]);
    Ok(())
}

#[test]
fn altered_digest_value_fails_both_checks() -> anyhow::Result<()> {
    let idp = TestIdp::generate()?;
    let xml = flip_first_char(&signed_response(&idp)?, "ds:DigestValue");

    let (verdict, recorder) = diagnose(&xml, &[idp.certificate_pem()]);
    assert_eq!(verdict?, Verdict::Rejected);

    let outcomes = recorder.outcomes();
    let reasons = outcomes[0].2.reasons();
    assert_eq!(reasons.len(), 2);
    assert!(matches!(reasons[0], RejectionReason::ReferenceMismatch { index: 0, .. }));
    assert_eq!(reasons[1], RejectionReason::SignatureValueMismatch);
    Ok(())
}

#[test]
fn retargeted_reference_is_unresolvable() -> anyhow::Result<()> {
    let idp = TestIdp::generate()?;
    let xml = signed_response(&idp)?.replace("URI=\"#_a1\"", "URI=\"#_gone\"");

    let (verdict, recorder) = diagnose(&xml, &[idp.certificate_pem()]);
    assert_eq!(verdict?, Verdict::Rejected);

    let outcomes = recorder.outcomes();
    let reasons = outcomes[0].2.reasons();
    assert!(reasons.contains(&RejectionReason::UnresolvableReference {
        index: 0,
        uri: "#_gone".to_string(),
    }));
    Ok(())
}
