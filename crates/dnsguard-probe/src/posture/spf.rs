//! SPF (RFC 7208) policy at the domain apex.

use dnsguard_core::{CheckName, DomainName, Failure, PostureFinding, RecordType, Verdict};

use super::{answer_data, Evaluator};

/// Mechanisms and modifiers that cost a DNS lookup when evaluated.
const LOOKUP_TERMS: [&str; 6] = ["include", "a", "mx", "ptr", "exists", "redirect"];

/// RFC 7208 section 4.6.4.
const MAX_LOOKUPS: usize = 10;

pub(super) async fn check(evaluator: &Evaluator, domain: &DomainName) -> PostureFinding {
    let name = domain.fqdn();
    match evaluator.fetch(&name, RecordType::TXT, false).await {
        Ok(response) => evaluate(&name, &answer_data(&response, RecordType::TXT)),
        Err(e) => PostureFinding::unknown(CheckName::Spf, name, &Failure::from(e)),
    }
}

/// True if a TXT string is an SPF record.
#[must_use]
pub fn is_spf(txt: &str) -> bool {
    let txt = txt.trim_start();
    txt.get(..6).is_some_and(|v| v.eq_ignore_ascii_case("v=spf1"))
        && txt[6..].chars().next().map_or(true, char::is_whitespace)
}

/// Derive the SPF verdict from the TXT strings published at `name`.
#[must_use]
pub fn evaluate(name: &str, txts: &[String]) -> PostureFinding {
    let records: Vec<String> = txts.iter().filter(|t| is_spf(t)).cloned().collect();

    let (verdict, explanation) = match records.as_slice() {
        [] => (Verdict::Absent, "no SPF record published".to_string()),
        [record] => judge(record),
        _ => (
            Verdict::Weak,
            format!(
                "{} SPF records published; receivers treat this as a permanent error",
                records.len()
            ),
        ),
    };

    PostureFinding::new(CheckName::Spf, name, records, verdict, explanation)
}

fn judge(record: &str) -> (Verdict, String) {
    let terms: Vec<&str> = record.split_ascii_whitespace().skip(1).collect();

    let all = terms.iter().rev().find_map(|term| {
        let (qualifier, mechanism) = split_qualifier(term);
        mechanism.eq_ignore_ascii_case("all").then_some(qualifier)
    });

    let (mut verdict, mut explanation) = match all {
        Some('-') => (Verdict::Strict, "hard fail (-all) for unlisted senders".to_string()),
        Some('~') => (
            Verdict::Weak,
            "soft fail (~all): unlisted senders are only marked".to_string(),
        ),
        Some('?') => (
            Verdict::Weak,
            "neutral (?all): no statement about unlisted senders".to_string(),
        ),
        Some(_) => (
            Verdict::Weak,
            "pass-all (+all): anyone may send as this domain".to_string(),
        ),
        None => {
            let redirect = terms
                .iter()
                .find_map(|t| t.strip_prefix("redirect="))
                .map(|target| format!("; policy delegated via redirect={target}"))
                .unwrap_or_default();
            (
                Verdict::Weak,
                format!("no terminal all mechanism{redirect}"),
            )
        }
    };

    let lookups = terms.iter().filter(|t| costs_lookup(t)).count();
    if lookups > MAX_LOOKUPS {
        if verdict == Verdict::Strict {
            verdict = Verdict::Weak;
        }
        explanation.push_str(&format!(
            "; {lookups} DNS-lookup terms exceed the limit of {MAX_LOOKUPS}"
        ));
    }

    (verdict, explanation)
}

fn split_qualifier(term: &str) -> (char, &str) {
    match term.chars().next() {
        Some(q @ ('+' | '-' | '~' | '?')) => (q, &term[1..]),
        _ => ('+', term),
    }
}

fn costs_lookup(term: &str) -> bool {
    let (_, mechanism) = split_qualifier(term);
    let name = mechanism
        .split(|c| c == ':' || c == '/' || c == '=')
        .next()
        .unwrap_or_default();
    LOOKUP_TERMS.iter().any(|t| name.eq_ignore_ascii_case(t))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spf(txts: &[&str]) -> PostureFinding {
        let txts: Vec<String> = txts.iter().map(ToString::to_string).collect();
        evaluate("example.com.", &txts)
    }

    #[test]
    fn test_verdict_table() {
        assert_eq!(spf(&["v=spf1 -all"]).verdict, Verdict::Strict);
        assert_eq!(spf(&["v=spf1 ~all"]).verdict, Verdict::Weak);
        assert_eq!(spf(&["v=spf1 ?all"]).verdict, Verdict::Weak);
        assert_eq!(spf(&["v=spf1 +all"]).verdict, Verdict::Weak);
        assert_eq!(spf(&["v=spf1 a mx all"]).verdict, Verdict::Weak);
        assert_eq!(spf(&[]).verdict, Verdict::Absent);
    }

    #[test]
    fn test_ignores_other_txt_records() {
        let finding = spf(&["google-site-verification=abc", "V=SPF1 ip4:192.0.2.0/24 -all"]);
        assert_eq!(finding.verdict, Verdict::Strict);
        assert_eq!(finding.evidence, vec!["V=SPF1 ip4:192.0.2.0/24 -all"]);
        assert_eq!(spf(&["v=spf10 -all"]).verdict, Verdict::Absent);
    }

    #[test]
    fn test_multiple_records_are_weak() {
        let finding = spf(&["v=spf1 -all", "v=spf1 include:_spf.example.net -all"]);
        assert_eq!(finding.verdict, Verdict::Weak);
        assert!(finding.explanation.contains("2 SPF records"));
    }

    #[test]
    fn test_redirect_is_explained() {
        let finding = spf(&["v=spf1 redirect=_spf.example.net"]);
        assert_eq!(finding.verdict, Verdict::Weak);
        assert!(finding.explanation.contains("redirect=_spf.example.net"));
    }

    #[test]
    fn test_lookup_limit_caps_verdict() {
        let includes: Vec<String> = (0..11).map(|i| format!("include:s{i}.example.net")).collect();
        let record = format!("v=spf1 {} -all", includes.join(" "));
        let finding = spf(&[&record]);
        assert_eq!(finding.verdict, Verdict::Weak);
        assert!(finding.explanation.contains("11 DNS-lookup terms"));

        let finding = spf(&["v=spf1 a mx include:_spf.example.net ip4:192.0.2.1 -all"]);
        assert_eq!(finding.verdict, Verdict::Strict);
    }
}
