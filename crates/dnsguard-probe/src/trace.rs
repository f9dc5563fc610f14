//! Iterative delegation tracing from the root hints down to the
//! authoritative servers.
//!
//! The walk is an explicit state machine. Each [`State::Querying`] step sends
//! one question (RD clear) to the first of its remaining candidates and turns
//! the response into the next state: a referral narrows the zone and swaps in
//! the glue addresses, a CNAME-only answer restarts from the root for the
//! target, and anything else ends the walk.

use dnsguard_core::{
    is_in_zone, is_strict_subdomain, normalize_name, DnsGuardError, DnsRecord, FailedAttempt,
    Failure, HopClass, Question, RawResponse, RecordType, Termination, Trace, TraceHop,
};
use std::collections::{HashSet, VecDeque};
use std::net::IpAddr;
use tracing::{debug, info, instrument, warn};

use crate::client::DnsClient;
use crate::config::ProbeConfig;
use crate::lookup::Lookup;

/// Candidates tried per hop: the first plus one retry.
const ATTEMPTS_PER_HOP: usize = 2;

/// Walks a name from the root hints to an answer.
#[derive(Debug, Clone)]
pub struct Tracer {
    client: DnsClient,
    root_hints: Vec<IpAddr>,
    glue_resolver: IpAddr,
    use_ipv6: bool,
    max_hops: usize,
    max_cname_restarts: usize,
    max_glue_lookups: usize,
}

impl Tracer {
    /// Create a tracer with the limits and root hints from `config`.
    #[must_use]
    pub fn new(client: DnsClient, config: &ProbeConfig) -> Self {
        let mut root_hints = config.root_hints.clone();
        if !config.use_ipv6 {
            root_hints.retain(IpAddr::is_ipv4);
        }
        Self {
            client,
            root_hints,
            glue_resolver: config.glue_resolver,
            use_ipv6: config.use_ipv6,
            max_hops: config.max_hops,
            max_cname_restarts: config.max_cname_restarts,
            max_glue_lookups: config.max_glue_lookups,
        }
    }

    /// Replace the root hints.
    #[must_use]
    pub fn root_hints(mut self, hints: Vec<IpAddr>) -> Self {
        self.root_hints = hints;
        self
    }

    /// Set the recursive resolver used for glue-less referrals.
    #[must_use]
    pub const fn glue_resolver(mut self, resolver: IpAddr) -> Self {
        self.glue_resolver = resolver;
        self
    }

    /// Follow AAAA glue as well as A glue.
    #[must_use]
    pub const fn ipv6(mut self, enabled: bool) -> Self {
        self.use_ipv6 = enabled;
        self
    }

    /// Set the hop limit.
    #[must_use]
    pub const fn max_hops(mut self, limit: usize) -> Self {
        self.max_hops = limit;
        self
    }

    /// Walk `name`/`record_type` from the root.
    ///
    /// Never fails outright: how the walk ended is recorded in the returned
    /// trace's [`Termination`].
    #[instrument(skip(self), fields(hints = self.root_hints.len()))]
    pub async fn trace(&self, name: &str, record_type: RecordType) -> Trace {
        let start = normalize_name(name);
        let mut walk = Walk::new(&start, record_type);
        let mut state = self.from_root(&start);

        loop {
            state = match state {
                State::Querying(step) => self.step(&mut walk, step).await,
                State::Answered => {
                    info!(name = %start, hops = walk.hops.len(), "trace answered");
                    return walk.finish(Termination::Answered);
                }
                State::Failed(error) => {
                    warn!(name = %start, hops = walk.hops.len(), error = %error, "trace failed");
                    return walk.finish(Termination::Failed(Failure::from(&error)));
                }
            };
        }
    }

    fn from_root(&self, name: &str) -> State {
        if self.root_hints.is_empty() {
            return State::Failed(DnsGuardError::NoReachableRoot);
        }
        State::Querying(Step {
            name: name.to_string(),
            zone: ".".to_string(),
            candidates: self.root_hints.iter().copied().collect(),
            at_root: true,
            note: None,
        })
    }

    async fn step(&self, walk: &mut Walk, mut step: Step) -> State {
        if walk.hops.len() >= self.max_hops {
            return State::Failed(DnsGuardError::TraceTooLong {
                limit: self.max_hops,
            });
        }
        let index = walk.hops.len() + 1;

        let mut failed = Vec::new();
        let mut last = None;
        while failed.len() < ATTEMPTS_PER_HOP {
            let Some(server) = step.candidates.pop_front() else {
                break;
            };
            let question = Question::iterative(&step.name, walk.record_type, server);
            match self.client.query(&question).await {
                Ok(response) => {
                    last = Some((question, Ok(response)));
                    break;
                }
                Err(error) => {
                    debug!(hop = index, server = %server, error = %error, "candidate failed");
                    let retry = error.is_retryable();
                    failed.push(FailedAttempt {
                        server,
                        failure: Failure::from(&error),
                    });
                    last = Some((question, Err(error)));
                    if !retry {
                        break;
                    }
                }
            }
        }

        let Some((question, outcome)) = last else {
            return State::Failed(DnsGuardError::Unknown(format!(
                "no candidate servers for zone {}",
                step.zone
            )));
        };

        let response = match outcome {
            Ok(response) => response,
            Err(error) => {
                // The hop's server is the last one tried; its failure is the note.
                failed.pop();
                walk.push(TraceHop {
                    index,
                    server: question.server,
                    zone: step.zone.clone(),
                    question,
                    response: None,
                    class: HopClass::Error,
                    failed_attempts: failed,
                    note: Some(error.to_string()),
                });
                return if step.at_root {
                    State::Failed(DnsGuardError::NoReachableRoot)
                } else {
                    State::Failed(error)
                };
            }
        };

        let server = question.server;
        let outcome = classify(&step.name, walk.record_type, &step.zone, &response, self.use_ipv6);
        debug!(hop = index, server = %server, zone = %step.zone, outcome = outcome.label(), "hop");

        let mut hop = TraceHop {
            index,
            server,
            zone: step.zone.clone(),
            question,
            response: None,
            class: HopClass::Error,
            failed_attempts: failed,
            note: step.note.take(),
        };

        let next = match outcome {
            Outcome::Answer { records, chain } => {
                hop.class = HopClass::Answer;
                walk.cname_chain.extend(chain);
                walk.answers = records;
                State::Answered
            }
            Outcome::Cname { chain } => {
                hop.class = HopClass::Answer;
                let target = chain.last().cloned().unwrap_or_default();
                hop.note = Some(format!("cname -> {target}"));
                self.restart(walk, chain)
            }
            Outcome::Referral { zone, hosts, glue } => {
                hop.class = HopClass::Referral;
                self.follow_referral(zone, hosts, glue, step.name).await
            }
            Outcome::DeadEnd(reason) => {
                hop.note = Some(reason.clone());
                State::Failed(DnsGuardError::Unknown(reason))
            }
        };

        hop.response = Some(response);
        walk.push(hop);
        next
    }

    fn restart(&self, walk: &mut Walk, chain: Vec<String>) -> State {
        let Some(target) = chain.last().cloned() else {
            return State::Failed(DnsGuardError::Unknown("empty CNAME chain".into()));
        };
        walk.restarts += 1;
        let revisited = chain.iter().any(|name| !walk.visited.insert(name.clone()));
        walk.cname_chain.extend(chain);

        if walk.restarts > self.max_cname_restarts || revisited {
            return State::Failed(DnsGuardError::ResolutionLoop {
                name: target,
                restarts: walk.restarts,
            });
        }
        debug!(target = %target, restarts = walk.restarts, "restarting from root");
        self.from_root(&target)
    }

    async fn follow_referral(
        &self,
        zone: String,
        hosts: Vec<String>,
        glue: Vec<IpAddr>,
        name: String,
    ) -> State {
        if !glue.is_empty() {
            return State::Querying(Step {
                name,
                zone,
                candidates: glue.into(),
                at_root: false,
                note: None,
            });
        }

        // No glue: resolve the NS names through the glue resolver, one level deep.
        let lookup = Lookup::new(self.client.clone());
        let mut candidates = VecDeque::new();
        for host in hosts.iter().take(self.max_glue_lookups) {
            for addr in lookup
                .addresses(host, self.glue_resolver, self.use_ipv6)
                .await
            {
                if !candidates.contains(&addr) {
                    candidates.push_back(addr);
                }
            }
        }

        if candidates.is_empty() {
            return State::Failed(DnsGuardError::Unreachable {
                server: zone,
                reason: "no nameserver address could be resolved".into(),
            });
        }
        State::Querying(Step {
            name,
            zone,
            candidates,
            at_root: false,
            note: Some("glue resolved".into()),
        })
    }
}

/// Where the walk stands.
enum State {
    Querying(Step),
    Answered,
    Failed(DnsGuardError),
}

/// One pending hop: the name being resolved, the zone the candidates serve
/// and the candidates not yet tried.
struct Step {
    name: String,
    zone: String,
    candidates: VecDeque<IpAddr>,
    at_root: bool,
    note: Option<String>,
}

/// Accumulated trace output.
struct Walk {
    name: String,
    record_type: RecordType,
    hops: Vec<TraceHop>,
    answers: Vec<DnsRecord>,
    cname_chain: Vec<String>,
    visited: HashSet<String>,
    restarts: usize,
}

impl Walk {
    fn new(name: &str, record_type: RecordType) -> Self {
        Self {
            name: name.to_string(),
            record_type,
            hops: Vec::new(),
            answers: Vec::new(),
            cname_chain: Vec::new(),
            visited: HashSet::from([name.to_string()]),
            restarts: 0,
        }
    }

    fn push(&mut self, hop: TraceHop) {
        self.hops.push(hop);
    }

    fn finish(self, termination: Termination) -> Trace {
        Trace {
            name: self.name,
            record_type: self.record_type,
            hops: self.hops,
            answers: self.answers,
            cname_chain: self.cname_chain,
            termination,
        }
    }
}

/// What one response means for the walk.
#[derive(Debug, PartialEq, Eq)]
enum Outcome {
    /// Records of the requested type, reached through `chain` CNAMEs
    Answer {
        records: Vec<DnsRecord>,
        chain: Vec<String>,
    },
    /// CNAMEs only; restart for the last target
    Cname { chain: Vec<String> },
    /// Delegation to a child zone
    Referral {
        zone: String,
        hosts: Vec<String>,
        glue: Vec<IpAddr>,
    },
    /// Nothing usable
    DeadEnd(String),
}

impl Outcome {
    const fn label(&self) -> &'static str {
        match self {
            Self::Answer { .. } => "answer",
            Self::Cname { .. } => "cname",
            Self::Referral { .. } => "referral",
            Self::DeadEnd(_) => "dead-end",
        }
    }
}

fn classify(
    name: &str,
    record_type: RecordType,
    zone: &str,
    response: &RawResponse,
    use_ipv6: bool,
) -> Outcome {
    if !response.is_noerror() {
        return Outcome::DeadEnd(format!("{} for {name}", response.rcode));
    }

    if let Some(outcome) = follow_answer(name, record_type, &response.answers) {
        return outcome;
    }

    // Referral: NS owned by a zone strictly below the current one that
    // still contains the name.
    let delegation = response.authority.iter().find(|r| {
        r.record_type == RecordType::NS
            && is_strict_subdomain(&r.name, zone)
            && is_in_zone(name, &r.name)
    });
    let Some(delegation) = delegation else {
        let reason = if response.authority.iter().any(|r| r.record_type == RecordType::NS) {
            format!("lame or upward referral from zone {zone}")
        } else {
            format!("no data for {name} {record_type}")
        };
        return Outcome::DeadEnd(reason);
    };

    let child = delegation.name.clone();
    let hosts: Vec<String> = response
        .authority
        .iter()
        .filter(|r| r.record_type == RecordType::NS && r.name == child)
        .filter_map(DnsRecord::target_name)
        .collect();

    let mut glue = Vec::new();
    for record in &response.additional {
        let usable = match record.record_type {
            RecordType::A => true,
            RecordType::AAAA => use_ipv6,
            _ => false,
        };
        if !usable || !hosts.contains(&record.name) {
            continue;
        }
        if let Some(addr) = record.as_ip() {
            if !glue.contains(&addr) {
                glue.push(addr);
            }
        }
    }

    Outcome::Referral {
        zone: child,
        hosts,
        glue,
    }
}

/// Follow CNAMEs inside one answer section starting at `name`.
fn follow_answer(name: &str, record_type: RecordType, answers: &[DnsRecord]) -> Option<Outcome> {
    let mut owner = name.to_string();
    let mut chain: Vec<String> = Vec::new();

    loop {
        let records: Vec<DnsRecord> = answers
            .iter()
            .filter(|r| r.record_type == record_type && r.name == owner)
            .cloned()
            .collect();
        if !records.is_empty() {
            return Some(Outcome::Answer { records, chain });
        }

        let next = answers
            .iter()
            .find(|r| r.record_type == RecordType::CNAME && r.name == owner)
            .and_then(DnsRecord::target_name);
        match next {
            Some(target) if !chain.contains(&target) && chain.len() < answers.len() => {
                chain.push(target.clone());
                owner = target;
            }
            _ => break,
        }
    }

    (!chain.is_empty()).then_some(Outcome::Cname { chain })
}
