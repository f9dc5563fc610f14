use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

use super::{duration_millis, Question, RawResponse, RecordType};
use crate::error::Failure;

/// A recursive resolver identified by label and address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResolverEndpoint {
    /// Human-readable label, e.g. `cloudflare`
    pub label: String,
    /// Resolver address
    pub address: IpAddr,
}

impl ResolverEndpoint {
    /// Create an endpoint.
    pub fn new(label: impl Into<String>, address: IpAddr) -> Self {
        Self {
            label: label.into(),
            address,
        }
    }

    /// An endpoint labelled with its own address.
    #[must_use]
    pub fn from_ip(address: IpAddr) -> Self {
        Self::new(address.to_string(), address)
    }

    /// The well-known public resolvers used when none are configured.
    #[must_use]
    pub fn public_defaults() -> Vec<Self> {
        vec![
            Self::new("cloudflare", IpAddr::V4(Ipv4Addr::new(1, 1, 1, 1))),
            Self::new("google", IpAddr::V4(Ipv4Addr::new(8, 8, 8, 8))),
            Self::new("quad9", IpAddr::V4(Ipv4Addr::new(9, 9, 9, 9))),
        ]
    }
}

impl fmt::Display for ResolverEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.label == self.address.to_string() {
            write!(f, "{}", self.address)
        } else {
            write!(f, "{} ({})", self.label, self.address)
        }
    }
}

/// Outcome of one question against one resolver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolverResult {
    /// Which resolver
    pub resolver: ResolverEndpoint,

    /// The question sent
    pub question: Question,

    /// Parsed response, absent on transport failure
    pub response: Option<RawResponse>,

    /// Wall-clock time around the wire query
    #[serde(with = "duration_millis")]
    pub elapsed: Duration,

    /// Minimum TTL across answer records
    pub ttl: Option<u32>,

    /// Transport failure, if any
    pub error: Option<Failure>,
}

impl ResolverResult {
    /// True if the resolver produced a response (any rcode)
    #[must_use]
    pub const fn responded(&self) -> bool {
        self.response.is_some()
    }

    /// Answer data normalized for comparison: lower-cased, sorted, deduplicated.
    ///
    /// RRSIG records are left out; their inception and expiration times differ
    /// between caches holding the same signed data. Returns `None` when the
    /// resolver did not respond.
    #[must_use]
    pub fn normalized_answers(&self) -> Option<Vec<String>> {
        let response = self.response.as_ref()?;
        let mut set: Vec<String> = response
            .answers
            .iter()
            .filter(|r| r.record_type != RecordType::RRSIG)
            .map(|r| format!("{} {} {}", r.name, r.record_type, r.data.to_ascii_lowercase()))
            .collect();
        set.sort();
        set.dedup();
        Some(set)
    }
}

/// One question compared across every configured resolver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolverComparison {
    /// Name asked, dot-terminated
    pub name: String,

    /// Type asked
    pub record_type: RecordType,

    /// Per-resolver results, in configured order
    pub results: Vec<ResolverResult>,

    /// Responding resolvers disagree on the answer set
    pub divergent: bool,

    /// Max minus min TTL across resolvers that returned answers
    pub ttl_spread: Option<u32>,

    /// Label of the fastest responding resolver
    pub fastest: Option<String>,
}
