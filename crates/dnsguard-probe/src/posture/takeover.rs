//! Dangling CNAME detection. Read-only: the target is only resolved, never
//! claimed or probed beyond DNS.

use dnsguard_core::{
    normalize_name, CheckName, DnsGuardError, DnsRecord, DomainName, Failure, PostureFinding,
    RecordType, Verdict,
};

use super::Evaluator;

/// What resolving the CNAME target showed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetStatus {
    /// Target answered NXDOMAIN
    Missing,
    /// Target's zone apex does not exist or has no nameservers
    ApexMissing {
        /// Apex that was checked
        apex: String,
    },
    /// Target and its apex look alive
    Resolves,
}

pub(super) async fn check(evaluator: &Evaluator, domain: &DomainName) -> PostureFinding {
    let name = domain.fqdn();
    let unknown = |name: &str, e: DnsGuardError| {
        PostureFinding::unknown(CheckName::DanglingCname, name, &Failure::from(e))
    };

    let target = match evaluator.fetch(&name, RecordType::CNAME, false).await {
        Ok(response) => response
            .answers_of(RecordType::CNAME)
            .find(|r| r.is_owned_by(&name))
            .and_then(DnsRecord::target_name),
        Err(e) => return unknown(&name, e),
    };
    let Some(target) = target else {
        return evaluate(&name, None);
    };

    let status = match evaluator.fetch(&target, RecordType::A, false).await {
        Ok(response) if response.is_nxdomain() => TargetStatus::Missing,
        Ok(_) => {
            let apex = apex_of(&target, evaluator.caa_min_labels);
            match evaluator.fetch(&apex, RecordType::NS, false).await {
                Ok(ns) if ns.is_nxdomain() || ns.answers_of(RecordType::NS).next().is_none() => {
                    TargetStatus::ApexMissing { apex }
                }
                Ok(_) => TargetStatus::Resolves,
                Err(e) => return unknown(&name, e),
            }
        }
        Err(e) => return unknown(&name, e),
    };

    evaluate(&name, Some((&target, status)))
}

/// Derive the verdict from the CNAME target (if any) and what resolving it
/// showed.
#[must_use]
pub fn evaluate(name: &str, cname: Option<(&str, TargetStatus)>) -> PostureFinding {
    let Some((target, status)) = cname else {
        return PostureFinding::new(
            CheckName::DanglingCname,
            name,
            Vec::new(),
            Verdict::Absent,
            "no CNAME at this name",
        );
    };

    let evidence = vec![format!("{name} CNAME {target}")];
    let (verdict, explanation) = match status {
        TargetStatus::Missing => (
            Verdict::Weak,
            format!("CNAME target {target} does not exist (NXDOMAIN); possible subdomain takeover"),
        ),
        TargetStatus::ApexMissing { apex } => (
            Verdict::Weak,
            format!(
                "zone {apex} of CNAME target has no nameservers; possible subdomain takeover"
            ),
        ),
        TargetStatus::Resolves => (Verdict::Present, format!("CNAME target {target} resolves")),
    };

    PostureFinding::new(CheckName::DanglingCname, name, evidence, verdict, explanation)
}

/// The last `labels` labels of `name`, dot-terminated.
fn apex_of(name: &str, labels: usize) -> String {
    let name = normalize_name(name);
    let parts: Vec<&str> = name.trim_end_matches('.').split('.').collect();
    let start = parts.len().saturating_sub(labels.max(1));
    normalize_name(&parts[start..].join("."))
}
