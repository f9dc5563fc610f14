use serde::{Deserialize, Serialize};
use std::net::IpAddr;

use super::{DnsRecord, Question, RawResponse, RecordType};
use crate::error::Failure;

/// How a single hop of a delegation walk was classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HopClass {
    /// Server delegated to a child zone
    Referral,
    /// Server answered (possibly with a CNAME to restart from)
    Answer,
    /// Server failed or gave nothing usable
    Error,
}

/// A candidate server that failed before the hop's server responded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedAttempt {
    /// Server that failed
    pub server: IpAddr,
    /// Why
    pub failure: Failure,
}

/// One step of an iterative trace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceHop {
    /// 1-based position in the trace
    pub index: usize,

    /// Server this hop's response came from (or the last one tried)
    pub server: IpAddr,

    /// Zone the server was expected to be authoritative for
    pub zone: String,

    /// The question sent
    pub question: Question,

    /// The response, absent when every attempt failed
    pub response: Option<RawResponse>,

    /// Classification of the response
    pub class: HopClass,

    /// Earlier candidates that failed for this hop
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failed_attempts: Vec<FailedAttempt>,

    /// Short annotation, e.g. `cname -> target` or `glue resolved`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// How a trace ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum Termination {
    /// Final answer found
    Answered,
    /// Walk stopped without an answer
    Failed(Failure),
}

/// A complete delegation walk for one name and type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trace {
    /// Name originally asked for, dot-terminated
    pub name: String,

    /// Record type asked for
    pub record_type: RecordType,

    /// Hops in observed order
    pub hops: Vec<TraceHop>,

    /// Records of the requested type from the final answer
    pub answers: Vec<DnsRecord>,

    /// CNAME targets followed, in order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cname_chain: Vec<String>,

    /// Outcome
    pub termination: Termination,
}

impl Trace {
    /// Returns true if the trace reached an answer
    #[must_use]
    pub const fn is_answered(&self) -> bool {
        matches!(self.termination, Termination::Answered)
    }

    /// The failure, if the trace did not reach an answer
    #[must_use]
    pub const fn failure(&self) -> Option<&Failure> {
        match &self.termination {
            Termination::Answered => None,
            Termination::Failed(failure) => Some(failure),
        }
    }

    /// Servers queried, in hop order
    #[must_use]
    pub fn servers(&self) -> Vec<IpAddr> {
        self.hops.iter().map(|h| h.server).collect()
    }
}
