use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{CheckName, PostureFinding, ResolverComparison, ResolverEndpoint, Trace, Verdict};

/// Everything one scan learned about one domain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanReport {
    /// Scanned domain, without trailing dot
    pub domain: String,

    /// When the report was generated
    pub generated_at: DateTime<Utc>,

    /// Resolvers compared, in configured order
    pub resolvers: Vec<ResolverEndpoint>,

    /// Per-question resolver comparisons
    pub comparisons: Vec<ResolverComparison>,

    /// Iterative traces (empty unless tracing was requested)
    #[serde(default)]
    pub traces: Vec<Trace>,

    /// Posture findings in check order
    pub findings: Vec<PostureFinding>,

    /// Any comparison diverged
    pub divergence: bool,

    /// Posture score, 0..=100
    pub score: u8,
}

impl ScanReport {
    /// First finding for a check
    #[must_use]
    pub fn finding(&self, check: CheckName) -> Option<&PostureFinding> {
        self.findings.iter().find(|f| f.check == check)
    }

    /// Findings that need attention (absent, weak or unknown)
    pub fn issues(&self) -> impl Iterator<Item = &PostureFinding> {
        self.findings
            .iter()
            .filter(|f| matches!(f.verdict, Verdict::Absent | Verdict::Weak | Verdict::Unknown))
    }

    /// Comparisons whose resolvers disagreed
    pub fn divergent_comparisons(&self) -> impl Iterator<Item = &ResolverComparison> {
        self.comparisons.iter().filter(|c| c.divergent)
    }
}
