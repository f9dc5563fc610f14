//! Resolver comparison, divergence and the posture score.

use chrono::Utc;
use dnsguard_core::{
    CheckName, DomainName, PostureFinding, RecordType, ResolverComparison, ResolverEndpoint,
    ResolverResult, ScanReport, Trace, Verdict,
};
use serde::Serialize;

/// Compare one question's results across resolvers.
///
/// Only resolvers that produced a response take part; transport failures
/// are neither divergent nor counted in the TTL spread.
#[must_use]
pub fn compare(
    name: &str,
    record_type: RecordType,
    results: Vec<ResolverResult>,
) -> ResolverComparison {
    let answered: Vec<&ResolverResult> = results.iter().filter(|r| r.responded()).collect();

    let mut sets = answered.iter().filter_map(|r| r.normalized_answers());
    let divergent = sets
        .next()
        .is_some_and(|first| sets.any(|other| other != first));

    let ttls: Vec<u32> = answered.iter().filter_map(|r| r.ttl).collect();
    let ttl_spread = match (ttls.iter().min(), ttls.iter().max()) {
        (Some(min), Some(max)) => Some(max - min),
        _ => None,
    };

    // Ties go to the earlier resolver in configured order.
    let fastest = answered
        .iter()
        .reduce(|best, r| if r.elapsed < best.elapsed { r } else { best })
        .map(|r| r.resolver.label.clone());

    ResolverComparison {
        name: dnsguard_core::normalize_name(name),
        record_type,
        results,
        divergent,
        ttl_spread,
        fastest,
    }
}

/// True if any comparison diverged.
#[must_use]
pub fn divergence(comparisons: &[ResolverComparison]) -> bool {
    comparisons.iter().any(|c| c.divergent)
}

/// Merge everything a scan collected into the final report.
#[must_use]
pub fn report(
    domain: &DomainName,
    resolvers: Vec<ResolverEndpoint>,
    comparisons: Vec<ResolverComparison>,
    traces: Vec<Trace>,
    findings: Vec<PostureFinding>,
) -> ScanReport {
    ScanReport {
        domain: domain.to_string(),
        generated_at: Utc::now(),
        resolvers,
        divergence: divergence(&comparisons),
        score: score(&findings),
        comparisons,
        traces,
        findings,
    }
}

/// One line of the score breakdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Deduction {
    /// Check the deduction came from
    pub check: CheckName,
    /// Points subtracted
    pub points: u8,
    /// Why
    pub reason: &'static str,
}

/// Every deduction that applies to `findings`, in check order.
#[must_use]
pub fn deductions(findings: &[PostureFinding]) -> Vec<Deduction> {
    let mut out = Vec::new();
    let mut push = |check, points, reason| {
        out.push(Deduction {
            check,
            points,
            reason,
        });
    };

    let verdict_of = |check: CheckName| {
        findings
            .iter()
            .find(|f| f.check == check)
            .map(|f| f.verdict)
    };

    for finding in findings {
        match (finding.check, finding.verdict) {
            (CheckName::Spf, Verdict::Absent) => push(CheckName::Spf, 15, "no SPF record"),
            (CheckName::Spf, Verdict::Weak) if is_pass_all(finding) => {
                push(CheckName::Spf, 25, "SPF allows any sender (+all)");
            }
            (CheckName::Spf, Verdict::Weak) => {
                push(CheckName::Spf, 8, "SPF policy is not enforcing");
            }
            (CheckName::Dmarc, Verdict::Absent) => push(CheckName::Dmarc, 15, "no DMARC record"),
            (CheckName::Dmarc, Verdict::Weak) => {
                push(CheckName::Dmarc, 8, "DMARC policy is not enforcing");
            }
            (CheckName::Dkim, Verdict::Absent) => push(CheckName::Dkim, 10, "DKIM selector missing"),
            (CheckName::Dnssec, Verdict::Absent) => push(CheckName::Dnssec, 5, "zone is not signed"),
            (CheckName::Caa, Verdict::Absent) => push(CheckName::Caa, 5, "no CAA records"),
            (CheckName::DanglingCname, Verdict::Weak) => {
                push(CheckName::DanglingCname, 25, "CNAME target does not resolve");
            }
            _ => {}
        }
    }

    let receives_mail = matches!(verdict_of(CheckName::Mx), Some(Verdict::Present));
    let dmarc_missing = matches!(verdict_of(CheckName::Dmarc), Some(Verdict::Absent) | None);
    if receives_mail && dmarc_missing {
        push(CheckName::Mx, 10, "domain accepts mail without DMARC");
    }

    out
}

/// Posture score: 100 minus every deduction, floored at 0.
#[must_use]
pub fn score(findings: &[PostureFinding]) -> u8 {
    let total: u32 = deductions(findings).iter().map(|d| u32::from(d.points)).sum();
    u8::try_from(100_u32.saturating_sub(total)).unwrap_or(0)
}

fn is_pass_all(finding: &PostureFinding) -> bool {
    finding.evidence.iter().any(|record| {
        record
            .split_ascii_whitespace()
            .any(|term| term.eq_ignore_ascii_case("+all") || term.eq_ignore_ascii_case("all"))
    })
}
