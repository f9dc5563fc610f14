//! Query dispatch shared by every probe: one transport, one per-query
//! timeout, one run-wide deadline.

use dnsguard_core::{DnsGuardError, Question, RawResponse, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

use crate::wire::Transport;

/// A single point in time after which no new query may start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadline(Option<Instant>);

impl Deadline {
    /// No deadline.
    #[must_use]
    pub const fn none() -> Self {
        Self(None)
    }

    /// Deadline `budget` from now.
    #[must_use]
    pub fn after(budget: Duration) -> Self {
        Self(Some(Instant::now() + budget))
    }

    /// Time left, or `None` when unbounded.
    #[must_use]
    pub fn remaining(&self) -> Option<Duration> {
        self.0
            .map(|at| at.saturating_duration_since(Instant::now()))
    }

    /// Shorten `timeout` to the time left. `None` once the deadline passed.
    #[must_use]
    pub fn clamp(&self, timeout: Duration) -> Option<Duration> {
        match self.remaining() {
            None => Some(timeout),
            Some(left) if left.is_zero() => None,
            Some(left) => Some(timeout.min(left)),
        }
    }
}

/// Sends questions through a shared transport under a per-query timeout
/// and the run deadline.
#[derive(Clone)]
pub struct DnsClient {
    transport: Arc<dyn Transport>,
    timeout: Duration,
    deadline: Deadline,
}

impl std::fmt::Debug for DnsClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DnsClient")
            .field("timeout", &self.timeout)
            .field("deadline", &self.deadline)
            .finish_non_exhaustive()
    }
}

impl DnsClient {
    /// Create a client with no deadline.
    pub fn new(transport: Arc<dyn Transport>, timeout: Duration) -> Self {
        Self {
            transport,
            timeout,
            deadline: Deadline::none(),
        }
    }

    /// Attach a run deadline.
    #[must_use]
    pub const fn deadline(mut self, deadline: Deadline) -> Self {
        self.deadline = deadline;
        self
    }

    /// Per-query timeout
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Send one question. Fails with `Timeout` without touching the network
    /// once the deadline has passed.
    pub async fn query(&self, question: &Question) -> Result<RawResponse> {
        let Some(limit) = self.deadline.clamp(self.timeout) else {
            return Err(DnsGuardError::Timeout {
                server: question.server.to_string(),
            });
        };
        self.transport.query(question, limit).await
    }
}
