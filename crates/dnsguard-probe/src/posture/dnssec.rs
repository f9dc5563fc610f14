//! DNSSEC signal: DS and DNSKEY presence. No validation is attempted.

use dnsguard_core::{
    CheckName, DnsGuardError, DomainName, Failure, PostureFinding, RecordType, Verdict,
};

use super::{answer_data, Evaluator};

pub(super) async fn check(evaluator: &Evaluator, domain: &DomainName) -> PostureFinding {
    let name = domain.fqdn();
    let (ds, dnskey) = tokio::join!(
        evaluator.fetch(&name, RecordType::DS, true),
        evaluator.fetch(&name, RecordType::DNSKEY, true),
    );
    evaluate(
        &name,
        ds.map(|r| answer_data(&r, RecordType::DS)),
        dnskey.map(|r| answer_data(&r, RecordType::DNSKEY)),
    )
}

/// Derive the DNSSEC signal from the DS and DNSKEY answers (or the errors
/// that prevented collecting them).
#[must_use]
pub fn evaluate(
    name: &str,
    ds: Result<Vec<String>, DnsGuardError>,
    dnskey: Result<Vec<String>, DnsGuardError>,
) -> PostureFinding {
    let has = |set: &Result<Vec<String>, DnsGuardError>| set.as_ref().is_ok_and(|v| !v.is_empty());

    if has(&ds) || has(&dnskey) {
        let explanation = match (has(&ds), has(&dnskey)) {
            (true, true) => "DS at the parent and DNSKEY at the apex",
            (true, false) => "DS at the parent; DNSKEY not observed",
            _ => "DNSKEY at the apex; no DS at the parent, so the chain is broken",
        };
        let evidence = ds
            .unwrap_or_default()
            .into_iter()
            .map(|d| format!("DS {d}"))
            .chain(dnskey.unwrap_or_default().into_iter().map(|k| format!("DNSKEY {k}")))
            .collect();
        return PostureFinding::new(CheckName::Dnssec, name, evidence, Verdict::Present, explanation);
    }

    match (ds, dnskey) {
        (Ok(_), Ok(_)) => PostureFinding::new(
            CheckName::Dnssec,
            name,
            Vec::new(),
            Verdict::Absent,
            "no DS or DNSKEY records: zone is unsigned",
        ),
        (Err(e), _) | (_, Err(e)) => PostureFinding::unknown(CheckName::Dnssec, name, &Failure::from(e)),
    }
}
