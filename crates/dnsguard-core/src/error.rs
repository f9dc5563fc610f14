use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Result type alias for dnsguard operations
pub type Result<T> = std::result::Result<T, DnsGuardError>;

/// Errors that can occur while probing DNS
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DnsGuardError {
    /// No response arrived before the timeout (or the run deadline expired)
    #[error("query to {server} timed out")]
    Timeout {
        /// Server that was queried
        server: String,
    },

    /// The server could not be reached, or refused the connection
    #[error("server {server} unreachable: {reason}")]
    Unreachable {
        /// Server that was queried
        server: String,
        /// Underlying transport failure
        reason: String,
    },

    /// CNAME chain restarted too many times or revisited a name
    #[error("resolution loop after {restarts} CNAME restarts at {name}")]
    ResolutionLoop {
        /// Name at which the loop was detected
        name: String,
        /// Number of restarts performed
        restarts: usize,
    },

    /// Delegation walk exceeded the hop limit
    #[error("trace exceeded {limit} hops")]
    TraceTooLong {
        /// Configured hop limit
        limit: usize,
    },

    /// Response failed structural parsing
    #[error("malformed response from {server}: {reason}")]
    MalformedResponse {
        /// Server that sent the response
        server: String,
        /// Parser message
        reason: String,
    },

    /// None of the root hints answered
    #[error("no root server reachable")]
    NoReachableRoot,

    /// Target domain is not a well-formed hostname
    #[error("invalid domain name {domain:?}: {reason}")]
    InvalidDomain {
        /// The rejected input
        domain: String,
        /// Why it was rejected
        reason: String,
    },

    /// Configuration value is out of range or missing
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Every configured resolver failed for every question
    #[error("no configured resolver answered any query")]
    NoReachableResolvers,

    /// Uncategorized failure
    #[error("{0}")]
    Unknown(String),
}

impl DnsGuardError {
    /// Returns the serializable category of this error
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::Unreachable { .. } => ErrorKind::Unreachable,
            Self::ResolutionLoop { .. } => ErrorKind::ResolutionLoop,
            Self::TraceTooLong { .. } => ErrorKind::TraceTooLong,
            Self::MalformedResponse { .. } => ErrorKind::MalformedResponse,
            Self::NoReachableRoot => ErrorKind::NoReachableRoot,
            Self::InvalidDomain { .. } | Self::InvalidConfig(_) | Self::NoReachableResolvers => {
                ErrorKind::Config
            }
            Self::Unknown(_) => ErrorKind::Unknown,
        }
    }

    /// Returns true if another server might succeed where this one failed
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Timeout { .. } | Self::Unreachable { .. } | Self::MalformedResponse { .. }
        )
    }

    /// Returns true if the error aborts a scan before a report exists
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self.kind(), ErrorKind::Config)
    }
}

/// Serializable error category recorded in reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// No response in time
    Timeout,
    /// Transport refused or unreachable
    Unreachable,
    /// CNAME restart limit or cycle
    ResolutionLoop,
    /// Hop limit exceeded
    TraceTooLong,
    /// Response failed to parse
    MalformedResponse,
    /// All root hints failed
    NoReachableRoot,
    /// Fatal configuration problem
    Config,
    /// Anything else
    Unknown,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Timeout => "timeout",
            Self::Unreachable => "unreachable",
            Self::ResolutionLoop => "resolution_loop",
            Self::TraceTooLong => "trace_too_long",
            Self::MalformedResponse => "malformed_response",
            Self::NoReachableRoot => "no_reachable_root",
            Self::Config => "config",
            Self::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// An error flattened for inclusion in a report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Failure {
    /// Error category
    pub kind: ErrorKind,
    /// Human-readable message
    pub message: String,
}

impl From<&DnsGuardError> for Failure {
    fn from(err: &DnsGuardError) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

impl From<DnsGuardError> for Failure {
    fn from(err: DnsGuardError) -> Self {
        Self::from(&err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_errors() {
        let timeout = DnsGuardError::Timeout {
            server: "192.0.2.1".into(),
        };
        assert!(timeout.is_retryable());
        assert!(!DnsGuardError::TraceTooLong { limit: 30 }.is_retryable());
        assert!(!DnsGuardError::NoReachableRoot.is_retryable());
    }

    #[test]
    fn fatal_errors_are_config_kind() {
        assert!(DnsGuardError::NoReachableResolvers.is_fatal());
        assert!(DnsGuardError::InvalidConfig("x".into()).is_fatal());
        assert!(!DnsGuardError::NoReachableRoot.is_fatal());
    }

    #[test]
    fn failure_keeps_kind_and_message() {
        let err = DnsGuardError::ResolutionLoop {
            name: "a.example.".into(),
            restarts: 9,
        };
        let failure = Failure::from(&err);
        assert_eq!(failure.kind, ErrorKind::ResolutionLoop);
        assert!(failure.message.contains("a.example."));
    }
}
