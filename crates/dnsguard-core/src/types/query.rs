use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::time::Duration;

use super::{normalize_name, DnsRecord, RecordType, ResponseCode};

/// A single question aimed at a single server.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Question {
    /// Fully-qualified, dot-terminated name
    pub name: String,

    /// Record type asked for
    pub record_type: RecordType,

    /// Server the question is sent to
    pub server: IpAddr,

    /// RD flag; set for recursive resolvers, clear for iterative tracing
    pub recursion_desired: bool,

    /// Request DNSSEC records (EDNS DO bit)
    #[serde(default)]
    pub dnssec_ok: bool,
}

impl Question {
    /// Question for a recursive resolver (RD=1).
    pub fn recursive(name: impl AsRef<str>, record_type: RecordType, server: IpAddr) -> Self {
        Self {
            name: normalize_name(name.as_ref()),
            record_type,
            server,
            recursion_desired: true,
            dnssec_ok: false,
        }
    }

    /// Question for an authoritative server during a delegation walk (RD=0).
    pub fn iterative(name: impl AsRef<str>, record_type: RecordType, server: IpAddr) -> Self {
        Self {
            recursion_desired: false,
            ..Self::recursive(name, record_type, server)
        }
    }

    /// Same question with the DO bit set.
    #[must_use]
    pub fn with_dnssec(self) -> Self {
        Self {
            dnssec_ok: true,
            ..self
        }
    }

    /// True if both questions ask for the same name and type.
    #[must_use]
    pub fn is_comparable(&self, other: &Self) -> bool {
        self.name == other.name && self.record_type == other.record_type
    }
}

/// Transport a response arrived over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    /// Plain UDP
    #[default]
    Udp,
    /// TCP, after a truncated UDP answer
    Tcp,
}

/// A parsed response to one wire query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawResponse {
    /// Response code
    pub rcode: ResponseCode,

    /// Answer section, in wire order
    #[serde(default)]
    pub answers: Vec<DnsRecord>,

    /// Authority section, in wire order
    #[serde(default)]
    pub authority: Vec<DnsRecord>,

    /// Additional section, in wire order (OPT pseudo-records excluded)
    #[serde(default)]
    pub additional: Vec<DnsRecord>,

    /// Time from send to parsed response
    #[serde(with = "duration_millis")]
    pub elapsed: Duration,

    /// TC flag of the final response
    #[serde(default)]
    pub truncated: bool,

    /// Transport of the final response
    #[serde(default)]
    pub protocol: Protocol,
}

impl RawResponse {
    /// An empty response with the given code, for building fixtures.
    #[must_use]
    pub const fn empty(rcode: ResponseCode) -> Self {
        Self {
            rcode,
            answers: Vec::new(),
            authority: Vec::new(),
            additional: Vec::new(),
            elapsed: Duration::ZERO,
            truncated: false,
            protocol: Protocol::Udp,
        }
    }

    /// Answer records of the given type
    pub fn answers_of(&self, record_type: RecordType) -> impl Iterator<Item = &DnsRecord> {
        self.answers
            .iter()
            .filter(move |r| r.record_type == record_type)
    }

    /// Minimum TTL among answer records
    #[must_use]
    pub fn min_answer_ttl(&self) -> Option<u32> {
        self.answers.iter().map(|r| r.ttl).min()
    }

    /// Returns true if the rcode is NOERROR
    #[must_use]
    pub fn is_noerror(&self) -> bool {
        self.rcode == ResponseCode::NoError
    }

    /// Returns true if the rcode is NXDOMAIN
    #[must_use]
    pub fn is_nxdomain(&self) -> bool {
        self.rcode == ResponseCode::NXDomain
    }
}

/// Serialize a `Duration` as integer milliseconds.
pub mod duration_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    /// Serialize as milliseconds
    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(u64::try_from(value.as_millis()).unwrap_or(u64::MAX))
    }

    /// Deserialize from milliseconds
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn question_constructors() {
        let server: IpAddr = "198.41.0.4".parse().unwrap();
        let q = Question::iterative("Example.com", RecordType::A, server);
        assert_eq!(q.name, "example.com.");
        assert!(!q.recursion_desired);
        assert!(!q.dnssec_ok);

        let r = Question::recursive("example.com.", RecordType::A, server).with_dnssec();
        assert!(r.recursion_desired);
        assert!(r.dnssec_ok);
        assert!(q.is_comparable(&r));
    }

    #[test]
    fn min_ttl_over_answers() {
        let mut resp = RawResponse::empty(ResponseCode::NoError);
        assert_eq!(resp.min_answer_ttl(), None);
        resp.answers.push(DnsRecord::new("a.", RecordType::A, 300, "192.0.2.1"));
        resp.answers.push(DnsRecord::new("a.", RecordType::A, 60, "192.0.2.2"));
        assert_eq!(resp.min_answer_ttl(), Some(60));
        assert_eq!(resp.answers_of(RecordType::A).count(), 2);
    }

    #[test]
    fn elapsed_serializes_as_millis() {
        let mut resp = RawResponse::empty(ResponseCode::NXDomain);
        resp.elapsed = Duration::from_millis(42);
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["elapsed"], 42);
        assert_eq!(json["rcode"], "NXDOMAIN");
    }
}
