//! DMARC policy at `_dmarc.<domain>`.

use dnsguard_core::{CheckName, DomainName, Failure, PostureFinding, RecordType, Verdict};

use super::{answer_data, tags, Evaluator};

pub(super) async fn check(evaluator: &Evaluator, domain: &DomainName) -> PostureFinding {
    let name = format!("_dmarc.{}", domain.fqdn());
    match evaluator.fetch(&name, RecordType::TXT, false).await {
        Ok(response) => evaluate(&name, &answer_data(&response, RecordType::TXT)),
        Err(e) => PostureFinding::unknown(CheckName::Dmarc, name, &Failure::from(e)),
    }
}

/// Derive the DMARC verdict from the TXT strings at `name`.
#[must_use]
pub fn evaluate(name: &str, txts: &[String]) -> PostureFinding {
    let records: Vec<String> = txts
        .iter()
        .filter(|t| {
            tags(t)
                .first()
                .is_some_and(|(k, v)| k.eq_ignore_ascii_case("v") && v.eq_ignore_ascii_case("DMARC1"))
        })
        .cloned()
        .collect();

    let (verdict, explanation) = match records.as_slice() {
        [] => (Verdict::Absent, "no DMARC record published".to_string()),
        [record] => judge(record),
        _ => (
            Verdict::Weak,
            format!("{} DMARC records published; receivers ignore them all", records.len()),
        ),
    };

    PostureFinding::new(CheckName::Dmarc, name, records, verdict, explanation)
}

fn judge(record: &str) -> (Verdict, String) {
    let tags = tags(record);
    let tag = |key: &str| {
        tags.iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.to_ascii_lowercase())
    };

    let (verdict, mut explanation) = match tag("p").as_deref() {
        Some("reject") => (Verdict::Strict, "p=reject: failing mail is rejected".to_string()),
        Some("quarantine") => (
            Verdict::Strict,
            "p=quarantine: failing mail is quarantined".to_string(),
        ),
        Some("none") => (
            Verdict::Weak,
            "p=none: monitoring only, failing mail is delivered".to_string(),
        ),
        Some(other) => (Verdict::Weak, format!("unrecognized policy p={other}")),
        None => (Verdict::Weak, "no p= policy tag".to_string()),
    };

    if let Some(pct) = tag("pct").and_then(|p| p.parse::<u8>().ok()) {
        if pct < 100 {
            explanation.push_str(&format!("; policy applies to {pct}% of mail"));
        }
    }

    (verdict, explanation)
}
