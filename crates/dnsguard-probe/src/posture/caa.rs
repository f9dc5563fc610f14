//! CAA records, found by climbing from the domain towards its registrable
//! parent.

use dnsguard_core::{CheckName, DomainName, Failure, PostureFinding, RecordType, Verdict};
use tracing::debug;

use super::{answer_data, Evaluator};

pub(super) async fn check(evaluator: &Evaluator, domain: &DomainName) -> PostureFinding {
    let mut current = domain.clone();
    loop {
        let name = current.fqdn();
        let records = match evaluator.fetch(&name, RecordType::CAA, false).await {
            Ok(response) => answer_data(&response, RecordType::CAA),
            Err(e) => return PostureFinding::unknown(CheckName::Caa, name, &Failure::from(e)),
        };
        if !records.is_empty() {
            return evaluate(&domain.fqdn(), Some((&name, records.as_slice())));
        }

        match current.parent() {
            Some(parent) if parent.label_count() >= evaluator.caa_min_labels => {
                debug!(from = %current, to = %parent, "no CAA, climbing");
                current = parent;
            }
            _ => return evaluate(&domain.fqdn(), None),
        }
    }
}

/// Derive the CAA verdict. `found` is the name the records were published
/// at, with the records, or `None` when the walk found nothing.
#[must_use]
pub fn evaluate(queried: &str, found: Option<(&str, &[String])>) -> PostureFinding {
    let Some((source, records)) = found else {
        return PostureFinding::new(
            CheckName::Caa,
            queried,
            Vec::new(),
            Verdict::Absent,
            "no CAA records: any certificate authority may issue",
        );
    };

    let issuers: Vec<String> = records.iter().filter_map(|r| issuer(r.as_str())).collect();
    let explanation = if issuers.is_empty() {
        "CAA published without issue or issuewild properties".to_string()
    } else {
        format!("issuance restricted to {}", issuers.join(", "))
    };

    PostureFinding::new(
        CheckName::Caa,
        source,
        records.to_vec(),
        Verdict::Present,
        explanation,
    )
}

/// The issuer named by an `issue`/`issuewild` record, in presentation form
/// (`0 issue "letsencrypt.org"`). An empty value forbids issuance.
fn issuer(record: &str) -> Option<String> {
    let mut parts = record.splitn(3, char::is_whitespace);
    let _flags = parts.next()?;
    let tag = parts.next()?;
    if !tag.eq_ignore_ascii_case("issue") && !tag.eq_ignore_ascii_case("issuewild") {
        return None;
    }
    let value = parts.next().unwrap_or_default().trim().trim_matches('"');
    let domain = value.split(';').next().unwrap_or_default().trim();
    if domain.is_empty() {
        Some(format!("none ({tag} forbidden)"))
    } else {
        Some(domain.to_ascii_lowercase())
    }
}
