//! Resolver lookup: the same question against several recursive resolvers.

use dnsguard_core::{
    DnsGuardError, Failure, Question, RawResponse, RecordType, ResolverEndpoint, ResolverResult,
    Result,
};
use futures_util::future::join_all;
use std::net::IpAddr;
use std::time::{Duration, Instant};
use tracing::{debug, instrument, warn};

use crate::client::DnsClient;

/// Queries fixed recursive resolvers and normalizes their answers.
#[derive(Debug, Clone)]
pub struct Lookup {
    client: DnsClient,
    dnssec: bool,
}

impl Lookup {
    /// Create a lookup over `client`.
    #[must_use]
    pub const fn new(client: DnsClient) -> Self {
        Self {
            client,
            dnssec: false,
        }
    }

    /// Set the DO bit on questions sent by [`Lookup::lookup`].
    #[must_use]
    pub const fn dnssec(mut self, enabled: bool) -> Self {
        self.dnssec = enabled;
        self
    }

    /// Ask every resolver concurrently.
    ///
    /// Always returns one result per resolver, in the order given, whatever
    /// the completion order or individual failures.
    #[instrument(skip(self, resolvers), fields(resolvers = resolvers.len()))]
    pub async fn lookup(
        &self,
        name: &str,
        record_type: RecordType,
        resolvers: &[ResolverEndpoint],
    ) -> Vec<ResolverResult> {
        let futures = resolvers
            .iter()
            .map(|resolver| self.query_one(name, record_type, resolver, self.dnssec));
        join_all(futures).await
    }

    /// Ask a single resolver.
    pub async fn query_one(
        &self,
        name: &str,
        record_type: RecordType,
        resolver: &ResolverEndpoint,
        dnssec: bool,
    ) -> ResolverResult {
        let mut question = Question::recursive(name, record_type, resolver.address);
        if dnssec {
            question = question.with_dnssec();
        }

        let started = Instant::now();
        let outcome = self.client.query(&question).await;
        let elapsed = started.elapsed();

        match outcome {
            Ok(response) => {
                debug!(
                    resolver = %resolver,
                    rcode = %response.rcode,
                    answers = response.answers.len(),
                    elapsed_ms = elapsed.as_millis(),
                    "resolver answered"
                );
                ResolverResult {
                    resolver: resolver.clone(),
                    question,
                    ttl: response.min_answer_ttl(),
                    response: Some(response),
                    elapsed,
                    error: None,
                }
            }
            Err(e) => {
                warn!(resolver = %resolver, error = %e, "resolver query failed");
                ResolverResult {
                    resolver: resolver.clone(),
                    question,
                    response: None,
                    elapsed,
                    ttl: None,
                    error: Some(Failure::from(&e)),
                }
            }
        }
    }

    /// Try resolvers in order and return the first response received.
    ///
    /// Any rcode counts as a response; only transport failures move on to
    /// the next resolver. Returns the last error when every resolver fails.
    pub async fn first_response(
        &self,
        name: &str,
        record_type: RecordType,
        resolvers: &[ResolverEndpoint],
        dnssec: bool,
    ) -> Result<RawResponse> {
        let mut last_error = DnsGuardError::InvalidConfig("no resolvers configured".into());
        for resolver in resolvers {
            let result = self.query_one(name, record_type, resolver, dnssec).await;
            match (result.response, result.error) {
                (Some(response), _) => return Ok(response),
                (None, Some(failure)) => {
                    last_error = failure_to_error(failure, resolver.address);
                }
                (None, None) => {}
            }
        }
        Err(last_error)
    }

    /// Resolve a nameserver host to addresses through one recursive resolver.
    ///
    /// A records come first, then AAAA when `include_ipv6` is set. Failures
    /// yield an empty list; the caller decides what an empty list means.
    pub async fn addresses(
        &self,
        host: &str,
        server: IpAddr,
        include_ipv6: bool,
    ) -> Vec<IpAddr> {
        let resolver = ResolverEndpoint::from_ip(server);
        let mut types = vec![RecordType::A];
        if include_ipv6 {
            types.push(RecordType::AAAA);
        }

        let mut addrs = Vec::new();
        for record_type in types {
            let result = self.query_one(host, record_type, &resolver, false).await;
            if let Some(response) = result.response {
                addrs.extend(
                    response
                        .answers_of(record_type)
                        .filter_map(dnsguard_core::DnsRecord::as_ip),
                );
            }
        }
        addrs
    }

    /// Per-query timeout of the underlying client
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.client.timeout()
    }
}

fn failure_to_error(failure: Failure, server: IpAddr) -> DnsGuardError {
    use dnsguard_core::ErrorKind;

    let server = server.to_string();
    match failure.kind {
        ErrorKind::Timeout => DnsGuardError::Timeout { server },
        ErrorKind::Unreachable => DnsGuardError::Unreachable {
            server,
            reason: failure.message,
        },
        ErrorKind::MalformedResponse => DnsGuardError::MalformedResponse {
            server,
            reason: failure.message,
        },
        _ => DnsGuardError::Unknown(failure.message),
    }
}
