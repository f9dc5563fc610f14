//! Scan orchestration: comparisons, traces and posture under one deadline.

use dnsguard_core::{
    DnsGuardError, DomainName, PostureFinding, RecordType, ResolverComparison, Result, ScanReport,
    Trace,
};
use futures_util::future::join_all;
use std::sync::Arc;
use tracing::{info, instrument, warn};

use crate::aggregate;
use crate::client::{Deadline, DnsClient};
use crate::config::ProbeConfig;
use crate::lookup::Lookup;
use crate::posture::Evaluator;
use crate::trace::Tracer;
use crate::wire::{Transport, WireTransport};

/// What to scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanRequest {
    /// Target domain as given by the caller
    pub domain: String,
    /// Record types compared across resolvers (and traced)
    pub record_types: Vec<RecordType>,
    /// Run iterative traces as well
    pub trace: bool,
    /// DKIM selectors to check
    pub dkim_selectors: Vec<String>,
}

impl ScanRequest {
    /// Scan `domain` for the default record types, without traces.
    pub fn new(domain: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            record_types: RecordType::DEFAULT_SCAN.to_vec(),
            trace: false,
            dkim_selectors: Vec::new(),
        }
    }

    /// Set the record types.
    #[must_use]
    pub fn record_types(mut self, types: Vec<RecordType>) -> Self {
        self.record_types = types;
        self
    }

    /// Enable or disable traces.
    #[must_use]
    pub const fn trace(mut self, enabled: bool) -> Self {
        self.trace = enabled;
        self
    }

    /// Set the DKIM selectors.
    #[must_use]
    pub fn dkim_selectors(mut self, selectors: Vec<String>) -> Self {
        self.dkim_selectors = selectors;
        self
    }
}

/// Entry point for every probe.
///
/// Holds the transport and configuration; each call starts its own run
/// deadline.
#[derive(Clone)]
pub struct Scanner {
    transport: Arc<dyn Transport>,
    config: ProbeConfig,
}

impl std::fmt::Debug for Scanner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scanner")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Scanner {
    /// Create a scanner talking to the network.
    pub fn new(config: ProbeConfig) -> Result<Self> {
        Self::with_transport(Arc::new(WireTransport::new()), config)
    }

    /// Create a scanner over a custom transport.
    pub fn with_transport(transport: Arc<dyn Transport>, config: ProbeConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { transport, config })
    }

    /// The configuration in use
    #[must_use]
    pub const fn config(&self) -> &ProbeConfig {
        &self.config
    }

    fn client(&self) -> DnsClient {
        DnsClient::new(self.transport.clone(), self.config.timeout())
            .deadline(Deadline::after(self.config.deadline()))
    }

    /// Compare one question across the configured resolvers.
    pub async fn lookup(
        &self,
        domain: &str,
        record_type: RecordType,
        dnssec: bool,
    ) -> Result<ResolverComparison> {
        let domain = DomainName::parse(domain)?;
        let lookup = Lookup::new(self.client()).dnssec(dnssec);
        let comparison = compare(&lookup, &domain, record_type, &self.config).await;
        if !comparison.results.iter().any(|r| r.responded()) {
            return Err(DnsGuardError::NoReachableResolvers);
        }
        Ok(comparison)
    }

    /// Trace one question from the root.
    pub async fn trace(&self, domain: &str, record_type: RecordType) -> Result<Trace> {
        let domain = DomainName::parse(domain)?;
        let tracer = Tracer::new(self.client(), &self.config);
        Ok(tracer.trace(&domain.fqdn(), record_type).await)
    }

    /// Mail posture only: SPF, DMARC, DKIM, MX.
    pub async fn email(&self, domain: &str, dkim_selectors: &[String]) -> Result<Vec<PostureFinding>> {
        let domain = DomainName::parse(domain)?;
        validate_selectors(&domain, dkim_selectors)?;
        let evaluator = Evaluator::new(Lookup::new(self.client()), &self.config);
        Ok(evaluator.email(&domain, dkim_selectors).await)
    }

    /// Full scan.
    ///
    /// Fails only on fatal configuration problems: a malformed domain or
    /// selector, no record types, or no resolver answering any question.
    /// Everything else ends up inside the report.
    #[instrument(skip(self, request), fields(domain = %request.domain, trace = request.trace))]
    pub async fn scan(&self, request: &ScanRequest) -> Result<ScanReport> {
        let domain = DomainName::parse(&request.domain)?;
        if request.record_types.is_empty() {
            return Err(DnsGuardError::InvalidConfig("no record types requested".into()));
        }
        validate_selectors(&domain, &request.dkim_selectors)?;

        let client = self.client();
        let lookup = Lookup::new(client.clone());
        let tracer = Tracer::new(client.clone(), &self.config);
        let evaluator = Evaluator::new(Lookup::new(client), &self.config);

        let comparisons = join_all(
            request
                .record_types
                .iter()
                .map(|rt| compare(&lookup, &domain, *rt, &self.config)),
        );
        let traces = async {
            if request.trace {
                join_all(
                    request
                        .record_types
                        .iter()
                        .map(|rt| tracer.trace(domain.as_str(), *rt)),
                )
                .await
            } else {
                Vec::new()
            }
        };
        let findings = evaluator.evaluate(&domain, &request.dkim_selectors);

        let (comparisons, traces, findings) = tokio::join!(comparisons, traces, findings);

        let answered = comparisons
            .iter()
            .flat_map(|c| &c.results)
            .any(|r| r.responded());
        if !answered {
            warn!(domain = %domain, "no resolver answered");
            return Err(DnsGuardError::NoReachableResolvers);
        }

        let report = aggregate::report(
            &domain,
            self.config.resolvers.clone(),
            comparisons,
            traces,
            findings,
        );
        info!(
            domain = %domain,
            score = report.score,
            divergence = report.divergence,
            "scan complete"
        );
        Ok(report)
    }
}

async fn compare(
    lookup: &Lookup,
    domain: &DomainName,
    record_type: RecordType,
    config: &ProbeConfig,
) -> ResolverComparison {
    let name = domain.fqdn();
    let results = lookup.lookup(&name, record_type, &config.resolvers).await;
    aggregate::compare(&name, record_type, results)
}

fn validate_selectors(domain: &DomainName, selectors: &[String]) -> Result<()> {
    for selector in selectors {
        domain
            .child(&format!("{selector}._domainkey"))
            .map_err(|_| DnsGuardError::InvalidConfig(format!("invalid DKIM selector {selector:?}")))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{a, answer, nodata, record, referral, txt, Reply, ScriptedNetwork};
    use dnsguard_core::{CheckName, ErrorKind, Verdict};
    use std::time::Duration;

    fn scanner(network: &Arc<ScriptedNetwork>) -> Scanner {
        Scanner::with_transport(network.clone(), ProbeConfig::default()).unwrap()
    }

    fn healthy_zone(network: &ScriptedNetwork) {
        network.respond_any(
            "example.com",
            RecordType::A,
            answer(vec![a("example.com", "93.184.215.14")]),
        );
        network.respond_any(
            "example.com",
            RecordType::TXT,
            answer(vec![txt("example.com", "v=spf1 -all")]),
        );
        network.respond_any(
            "_dmarc.example.com",
            RecordType::TXT,
            answer(vec![txt("_dmarc.example.com", "v=DMARC1; p=reject")]),
        );
        network.respond_any(
            "example.com",
            RecordType::DS,
            answer(vec![record("example.com", RecordType::DS, "370 13 2 BE74")]),
        );
        network.respond_any("example.com", RecordType::DNSKEY, nodata());
        network.respond_any(
            "example.com",
            RecordType::CAA,
            answer(vec![record("example.com", RecordType::CAA, "0 issue \"digicert.com\"")]),
        );
        network.respond_any("example.com", RecordType::CNAME, nodata());
        network.respond_any(
            "example.com",
            RecordType::MX,
            answer(vec![record("example.com", RecordType::MX, "0 .")]),
        );
    }

    #[tokio::test]
    async fn test_full_scan() {
        let network = Arc::new(ScriptedNetwork::new());
        healthy_zone(&network);
        network.respond(
            "198.41.0.4",
            "example.com",
            RecordType::A,
            referral("com", &[("a.gtld-servers.net", Some("192.5.6.30"))]),
        );
        network.respond(
            "192.5.6.30",
            "example.com",
            RecordType::A,
            referral("example.com", &[("a.iana-servers.net", Some("199.43.135.53"))]),
        );

        let request = ScanRequest::new("Example.COM")
            .record_types(vec![RecordType::A])
            .trace(true);
        let report = scanner(&network).scan(&request).await.unwrap();

        assert_eq!(report.domain, "example.com");
        assert_eq!(report.resolvers.len(), 3);
        assert_eq!(report.comparisons.len(), 1);
        assert_eq!(report.comparisons[0].results.len(), 3);
        assert!(!report.divergence);

        let trace = &report.traces[0];
        assert!(trace.is_answered());
        assert_eq!(trace.hops.len(), 3);

        assert_eq!(report.finding(CheckName::Spf).unwrap().verdict, Verdict::Strict);
        assert_eq!(report.finding(CheckName::Caa).unwrap().verdict, Verdict::Present);
        assert!(report.finding(CheckName::Dkim).is_none());
        assert_eq!(report.score, 100);
    }

    #[tokio::test]
    async fn test_diverging_resolvers_flagged() {
        let network = Arc::new(ScriptedNetwork::new());
        healthy_zone(&network);
        network.respond(
            "9.9.9.9",
            "example.com",
            RecordType::A,
            answer(vec![a("example.com", "198.51.100.66")]),
        );

        let request = ScanRequest::new("example.com").record_types(vec![RecordType::A]);
        let report = scanner(&network).scan(&request).await.unwrap();

        assert!(report.divergence);
        assert!(report.traces.is_empty());
        assert_eq!(report.divergent_comparisons().count(), 1);
    }

    #[tokio::test]
    async fn test_invalid_domain_is_fatal() {
        let network = Arc::new(ScriptedNetwork::new());
        let err = scanner(&network)
            .scan(&ScanRequest::new("exa mple..com"))
            .await
            .unwrap_err();
        assert!(matches!(err, DnsGuardError::InvalidDomain { .. }));
        assert_eq!(network.query_count(), 0);
    }

    #[tokio::test]
    async fn test_invalid_selector_is_fatal() {
        let network = Arc::new(ScriptedNetwork::new());
        let request = ScanRequest::new("example.com").dkim_selectors(vec!["bad selector".into()]);
        let err = scanner(&network).scan(&request).await.unwrap_err();
        assert!(matches!(err, DnsGuardError::InvalidConfig(_)));
    }

    #[tokio::test]
    async fn test_no_reachable_resolvers() {
        let network = Arc::new(ScriptedNetwork::new());
        let err = scanner(&network)
            .scan(&ScanRequest::new("example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, DnsGuardError::NoReachableResolvers));
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_turns_slow_checks_unknown() {
        let network = Arc::new(ScriptedNetwork::new());
        healthy_zone(&network);
        network.on_any(
            "_dmarc.example.com",
            RecordType::TXT,
            Reply::Slow(Duration::from_secs(60), nodata()),
        );
        let config = ProbeConfig {
            deadline_secs: 1,
            ..ProbeConfig::default()
        };
        let scanner = tokio_test::assert_ok!(Scanner::with_transport(network.clone(), config));

        let request = ScanRequest::new("example.com").record_types(vec![RecordType::A]);
        let report = tokio_test::assert_ok!(scanner.scan(&request).await);

        let dmarc = report.finding(CheckName::Dmarc).unwrap();
        assert_eq!(dmarc.verdict, Verdict::Unknown);
        assert_eq!(dmarc.error, Some(ErrorKind::Timeout));
        assert_eq!(report.finding(CheckName::Spf).unwrap().verdict, Verdict::Strict);
    }

    #[tokio::test]
    async fn test_lookup_requires_one_answer() {
        let network = Arc::new(ScriptedNetwork::new());
        network.on_any("example.com", RecordType::A, Reply::Timeout);
        let err = scanner(&network)
            .lookup("example.com", RecordType::A, false)
            .await
            .unwrap_err();
        assert!(matches!(err, DnsGuardError::NoReachableResolvers));
    }

    #[test]
    fn test_empty_resolver_list_rejected() {
        let network = Arc::new(ScriptedNetwork::new());
        let config = ProbeConfig {
            resolvers: Vec::new(),
            ..ProbeConfig::default()
        };
        tokio_test::assert_err!(Scanner::with_transport(network, config));
    }
}
