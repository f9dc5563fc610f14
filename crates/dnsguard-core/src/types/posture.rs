use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{ErrorKind, Failure};

/// Name of a posture check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CheckName {
    /// Sender Policy Framework
    Spf,
    /// Domain-based Message Authentication, Reporting and Conformance
    Dmarc,
    /// DomainKeys Identified Mail selector
    Dkim,
    /// DS / DNSKEY presence
    Dnssec,
    /// Certification Authority Authorization
    Caa,
    /// CNAME pointing at something that no longer resolves
    DanglingCname,
    /// Mail exchangers, including null MX
    Mx,
}

impl fmt::Display for CheckName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Spf => "SPF",
            Self::Dmarc => "DMARC",
            Self::Dkim => "DKIM",
            Self::Dnssec => "DNSSEC",
            Self::Caa => "CAA",
            Self::DanglingCname => "DANGLING_CNAME",
            Self::Mx => "MX",
        };
        f.write_str(s)
    }
}

/// Verdict of a posture check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    /// Signal exists
    Present,
    /// Signal missing
    Absent,
    /// Signal exists but is permissive or broken
    Weak,
    /// Signal exists and enforces
    Strict,
    /// Evidence could not be collected
    Unknown,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Present => "present",
            Self::Absent => "absent",
            Self::Weak => "weak",
            Self::Strict => "strict",
            Self::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// A security verdict derived from raw DNS evidence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostureFinding {
    /// Which check
    pub check: CheckName,

    /// Name the evidence was read from (dot-terminated)
    pub name: String,

    /// Raw evidence records in presentation form
    pub evidence: Vec<String>,

    /// Verdict
    pub verdict: Verdict,

    /// Human-readable explanation
    pub explanation: String,

    /// Error category when the verdict is `unknown`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorKind>,
}

impl PostureFinding {
    /// Build a finding from evidence.
    pub fn new(
        check: CheckName,
        name: impl Into<String>,
        evidence: Vec<String>,
        verdict: Verdict,
        explanation: impl Into<String>,
    ) -> Self {
        Self {
            check,
            name: name.into(),
            evidence,
            verdict,
            explanation: explanation.into(),
            error: None,
        }
    }

    /// A finding whose evidence could not be collected.
    pub fn unknown(check: CheckName, name: impl Into<String>, failure: &Failure) -> Self {
        Self {
            check,
            name: name.into(),
            evidence: Vec::new(),
            verdict: Verdict::Unknown,
            explanation: format!("check could not complete ({}): {}", failure.kind, failure.message),
            error: Some(failure.kind),
        }
    }
}
