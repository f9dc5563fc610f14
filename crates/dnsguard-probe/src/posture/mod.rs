//! Security posture checks derived from raw DNS evidence.
//!
//! Every check is split in two: an async `check` that fetches evidence
//! through the first responding resolver, and a pure `evaluate` that turns
//! evidence into a [`PostureFinding`]. A fetch failure becomes an `unknown`
//! finding carrying the error kind; it never fails the evaluation as a whole.

pub mod caa;
pub mod dkim;
pub mod dmarc;
pub mod dnssec;
pub mod mx;
pub mod spf;
pub mod takeover;

use dnsguard_core::{
    DnsGuardError, DomainName, PostureFinding, RawResponse, RecordType, ResolverEndpoint,
    ResponseCode, Result,
};
use tracing::{debug, instrument};

use crate::config::ProbeConfig;
use crate::lookup::Lookup;

/// Runs the posture checks for one domain.
#[derive(Debug, Clone)]
pub struct Evaluator {
    lookup: Lookup,
    resolvers: Vec<ResolverEndpoint>,
    caa_min_labels: usize,
}

impl Evaluator {
    /// Create an evaluator querying the resolvers in `config`.
    #[must_use]
    pub fn new(lookup: Lookup, config: &ProbeConfig) -> Self {
        Self {
            lookup,
            resolvers: config.resolvers.clone(),
            caa_min_labels: config.caa_min_labels,
        }
    }

    /// Run every check concurrently.
    ///
    /// Findings come back in fixed order: SPF, DMARC, one DKIM finding per
    /// selector, DNSSEC, CAA, dangling CNAME, MX. DKIM is skipped entirely
    /// when no selectors are given.
    #[instrument(skip(self, dkim_selectors), fields(domain = %domain, selectors = dkim_selectors.len()))]
    pub async fn evaluate(
        &self,
        domain: &DomainName,
        dkim_selectors: &[String],
    ) -> Vec<PostureFinding> {
        let (spf, dmarc, dkim, dnssec, caa, dangling, mx) = tokio::join!(
            spf::check(self, domain),
            dmarc::check(self, domain),
            dkim::check(self, domain, dkim_selectors),
            dnssec::check(self, domain),
            caa::check(self, domain),
            takeover::check(self, domain),
            mx::check(self, domain),
        );

        let mut findings = vec![spf, dmarc];
        findings.extend(dkim);
        findings.extend([dnssec, caa, dangling, mx]);
        debug!(findings = findings.len(), "posture evaluated");
        findings
    }

    /// Only the mail checks: SPF, DMARC, DKIM and MX.
    #[instrument(skip(self, dkim_selectors), fields(domain = %domain))]
    pub async fn email(
        &self,
        domain: &DomainName,
        dkim_selectors: &[String],
    ) -> Vec<PostureFinding> {
        let (spf, dmarc, dkim, mx) = tokio::join!(
            spf::check(self, domain),
            dmarc::check(self, domain),
            dkim::check(self, domain, dkim_selectors),
            mx::check(self, domain),
        );

        let mut findings = vec![spf, dmarc];
        findings.extend(dkim);
        findings.push(mx);
        findings
    }

    /// First response for `name`/`record_type`.
    ///
    /// NOERROR and NXDOMAIN are evidence; any other rcode means the resolver
    /// could not answer and is reported as an error.
    async fn fetch(&self, name: &str, record_type: RecordType, dnssec: bool) -> Result<RawResponse> {
        let response = self
            .lookup
            .first_response(name, record_type, &self.resolvers, dnssec)
            .await?;
        match response.rcode {
            ResponseCode::NoError | ResponseCode::NXDomain => Ok(response),
            rcode => Err(DnsGuardError::Unknown(format!(
                "{rcode} for {name} {record_type}"
            ))),
        }
    }
}

/// Data of the answer records of `record_type`.
fn answer_data(response: &RawResponse, record_type: RecordType) -> Vec<String> {
    response
        .answers_of(record_type)
        .map(|r| r.data.clone())
        .collect()
}

/// `tag=value` pairs of a `;`-separated record (DMARC, DKIM).
fn tags(record: &str) -> Vec<(String, String)> {
    record
        .split(';')
        .filter_map(|part| {
            let (key, value) = part.split_once('=')?;
            Some((key.trim().to_string(), value.trim().to_string()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::DnsClient;
    use crate::testing::{answer, nodata, nxdomain, record, txt, Reply, ScriptedNetwork};
    use dnsguard_core::{CheckName, ErrorKind, Verdict};
    use std::sync::Arc;
    use std::time::Duration;

    fn evaluator(network: &Arc<ScriptedNetwork>) -> Evaluator {
        let client = DnsClient::new(network.clone(), Duration::from_secs(2));
        Evaluator::new(Lookup::new(client), &ProbeConfig::default())
    }

    fn domain(name: &str) -> DomainName {
        DomainName::parse(name).unwrap()
    }

    #[test]
    fn test_tags() {
        let parsed = tags("v=DMARC1; p=reject;; rua = mailto:a@example.com ");
        assert_eq!(parsed.len(), 3);
        assert_eq!(parsed[2], ("rua".to_string(), "mailto:a@example.com".to_string()));
    }

    #[tokio::test]
    async fn test_caa_walks_up_to_parent() {
        let network = Arc::new(ScriptedNetwork::new());
        network.respond_any("www.example.com", RecordType::CAA, nodata());
        network.respond_any(
            "example.com",
            RecordType::CAA,
            answer(vec![record("example.com", RecordType::CAA, "0 issue \"letsencrypt.org\"")]),
        );

        let finding = caa::check(&evaluator(&network), &domain("www.example.com")).await;

        assert_eq!(finding.verdict, Verdict::Present);
        assert_eq!(finding.name, "example.com.");
        assert!(finding.explanation.contains("letsencrypt.org"));
    }

    #[tokio::test]
    async fn test_caa_never_queries_tld() {
        let network = Arc::new(ScriptedNetwork::new());
        network.respond_any("www.example.com", RecordType::CAA, nodata());
        network.respond_any("example.com", RecordType::CAA, nodata());

        let finding = caa::check(&evaluator(&network), &domain("www.example.com")).await;

        assert_eq!(finding.verdict, Verdict::Absent);
        assert!(network.queries().iter().all(|q| q.name != "com."));
    }

    #[tokio::test]
    async fn test_caa_failure_is_unknown() {
        let network = Arc::new(ScriptedNetwork::new());
        network.respond_any("www.example.com", RecordType::CAA, nodata());
        network.on_any("example.com", RecordType::CAA, Reply::Timeout);

        let finding = caa::check(&evaluator(&network), &domain("www.example.com")).await;

        assert_eq!(finding.verdict, Verdict::Unknown);
        assert_eq!(finding.error, Some(ErrorKind::Timeout));
    }

    #[tokio::test]
    async fn test_dangling_cname_to_nxdomain() {
        let network = Arc::new(ScriptedNetwork::new());
        network.respond_any(
            "shop.example.com",
            RecordType::CNAME,
            answer(vec![crate::testing::cname("shop.example.com", "gone.example.net")]),
        );
        network.respond_any("gone.example.net", RecordType::A, nxdomain());

        let finding = takeover::check(&evaluator(&network), &domain("shop.example.com")).await;

        assert_eq!(finding.verdict, Verdict::Weak);
        assert_eq!(finding.evidence, vec!["shop.example.com. CNAME gone.example.net."]);
    }

    #[tokio::test]
    async fn test_cname_with_dead_apex() {
        let network = Arc::new(ScriptedNetwork::new());
        network.respond_any(
            "blog.example.com",
            RecordType::CNAME,
            answer(vec![crate::testing::cname("blog.example.com", "x.provider.io")]),
        );
        network.respond_any("x.provider.io", RecordType::A, nodata());
        network.respond_any("provider.io", RecordType::NS, nodata());

        let finding = takeover::check(&evaluator(&network), &domain("blog.example.com")).await;

        assert_eq!(finding.verdict, Verdict::Weak);
        assert!(finding.explanation.contains("provider.io."));
    }

    #[tokio::test]
    async fn test_servfail_is_unknown() {
        let network = Arc::new(ScriptedNetwork::new());
        network.respond_any(
            "example.com",
            RecordType::TXT,
            dnsguard_core::RawResponse::empty(ResponseCode::ServFail),
        );

        let finding = spf::check(&evaluator(&network), &domain("example.com")).await;

        assert_eq!(finding.verdict, Verdict::Unknown);
        assert!(finding.explanation.contains("SERVFAIL"));
    }

    #[tokio::test]
    async fn test_full_evaluation_order() {
        let network = Arc::new(ScriptedNetwork::new());
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
            "s1._domainkey.example.com",
            RecordType::TXT,
            answer(vec![txt("s1._domainkey.example.com", "v=DKIM1; p=abc")]),
        );
        network.respond_any("s2._domainkey.example.com", RecordType::TXT, nxdomain());
        network.respond_any("example.com", RecordType::DS, nodata());
        network.respond_any("example.com", RecordType::DNSKEY, nodata());
        network.respond_any("example.com", RecordType::CAA, nodata());
        network.respond_any("example.com", RecordType::CNAME, nodata());
        network.respond_any(
            "example.com",
            RecordType::MX,
            answer(vec![record("example.com", RecordType::MX, "0 .")]),
        );

        let selectors = vec!["s1".to_string(), "s2".to_string()];
        let findings = evaluator(&network)
            .evaluate(&domain("example.com"), &selectors)
            .await;

        let checks: Vec<CheckName> = findings.iter().map(|f| f.check).collect();
        assert_eq!(
            checks,
            vec![
                CheckName::Spf,
                CheckName::Dmarc,
                CheckName::Dkim,
                CheckName::Dkim,
                CheckName::Dnssec,
                CheckName::Caa,
                CheckName::DanglingCname,
                CheckName::Mx,
            ]
        );
        let verdicts: Vec<Verdict> = findings.iter().map(|f| f.verdict).collect();
        assert_eq!(
            verdicts,
            vec![
                Verdict::Strict,
                Verdict::Strict,
                Verdict::Present,
                Verdict::Absent,
                Verdict::Absent,
                Verdict::Absent,
                Verdict::Absent,
                Verdict::Strict,
            ]
        );
        // DNSSEC queries carry the DO bit; nothing else does.
        for question in network.queries() {
            let dnssec = matches!(question.record_type, RecordType::DS | RecordType::DNSKEY);
            assert_eq!(question.dnssec_ok, dnssec);
        }
    }

    #[tokio::test]
    async fn test_email_skips_dkim_without_selectors() {
        let network = Arc::new(ScriptedNetwork::new());
        network.respond_any("example.com", RecordType::TXT, nodata());
        network.respond_any("_dmarc.example.com", RecordType::TXT, nxdomain());
        network.respond_any("example.com", RecordType::MX, nodata());

        let findings = evaluator(&network).email(&domain("example.com"), &[]).await;

        let checks: Vec<CheckName> = findings.iter().map(|f| f.check).collect();
        assert_eq!(checks, vec![CheckName::Spf, CheckName::Dmarc, CheckName::Mx]);
        assert!(findings.iter().all(|f| f.verdict == Verdict::Absent));
    }
}
