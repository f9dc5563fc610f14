//! Mail exchangers, including the null MX of RFC 7505.

use dnsguard_core::{CheckName, DomainName, Failure, PostureFinding, RecordType, Verdict};

use super::{answer_data, Evaluator};

pub(super) async fn check(evaluator: &Evaluator, domain: &DomainName) -> PostureFinding {
    let name = domain.fqdn();
    match evaluator.fetch(&name, RecordType::MX, false).await {
        Ok(response) => evaluate(&name, &answer_data(&response, RecordType::MX)),
        Err(e) => PostureFinding::unknown(CheckName::Mx, name, &Failure::from(e)),
    }
}

/// Derive the MX verdict from `preference exchange` strings.
#[must_use]
pub fn evaluate(name: &str, records: &[String]) -> PostureFinding {
    if records.is_empty() {
        return PostureFinding::new(
            CheckName::Mx,
            name,
            Vec::new(),
            Verdict::Absent,
            "no MX records",
        );
    }

    let exchanges: Vec<&str> = records
        .iter()
        .filter_map(|r| r.split_ascii_whitespace().nth(1))
        .collect();

    if exchanges.iter().any(|e| *e == ".") {
        return PostureFinding::new(
            CheckName::Mx,
            name,
            records.to_vec(),
            Verdict::Strict,
            "null MX: the domain accepts no mail",
        );
    }

    PostureFinding::new(
        CheckName::Mx,
        name,
        records.to_vec(),
        Verdict::Present,
        format!("mail accepted by {}", exchanges.join(", ")),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mx_verdicts() {
        assert_eq!(evaluate("example.com.", &[]).verdict, Verdict::Absent);

        let null = evaluate("example.com.", &["0 .".to_string()]);
        assert_eq!(null.verdict, Verdict::Strict);

        let mail = evaluate(
            "example.com.",
            &["10 mx1.example.com.".to_string(), "20 mx2.example.com.".to_string()],
        );
        assert_eq!(mail.verdict, Verdict::Present);
        assert!(mail.explanation.contains("mx1.example.com., mx2.example.com."));
    }
}
