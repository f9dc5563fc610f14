//! Scripted in-memory network for exercising probes without sockets.

use async_trait::async_trait;
use dnsguard_core::{
    normalize_name, DnsGuardError, DnsRecord, Question, RawResponse, RecordType, ResponseCode,
    Result,
};
use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Mutex;
use std::time::Duration;

use crate::wire::Transport;

#[derive(Debug, Clone)]
pub enum Reply {
    Response(RawResponse),
    Slow(Duration, RawResponse),
    Timeout,
    Unreachable,
}

type Key = (Option<IpAddr>, String, RecordType);

#[derive(Debug, Default)]
pub struct ScriptedNetwork {
    scripts: Mutex<HashMap<Key, Reply>>,
    log: Mutex<Vec<Question>>,
}

impl ScriptedNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reply from one server.
    pub fn on(&self, server: &str, name: &str, record_type: RecordType, reply: Reply) {
        let key = (Some(server.parse().unwrap()), normalize_name(name), record_type);
        self.scripts.lock().unwrap().insert(key, reply);
    }

    /// Reply from any server without a more specific script.
    pub fn on_any(&self, name: &str, record_type: RecordType, reply: Reply) {
        let key = (None, normalize_name(name), record_type);
        self.scripts.lock().unwrap().insert(key, reply);
    }

    pub fn respond(&self, server: &str, name: &str, record_type: RecordType, response: RawResponse) {
        self.on(server, name, record_type, Reply::Response(response));
    }

    pub fn respond_any(&self, name: &str, record_type: RecordType, response: RawResponse) {
        self.on_any(name, record_type, Reply::Response(response));
    }

    pub fn queries(&self) -> Vec<Question> {
        self.log.lock().unwrap().clone()
    }

    pub fn query_count(&self) -> usize {
        self.log.lock().unwrap().len()
    }

    pub fn servers_queried(&self) -> Vec<IpAddr> {
        self.queries().iter().map(|q| q.server).collect()
    }

    fn lookup(&self, question: &Question) -> Option<Reply> {
        let scripts = self.scripts.lock().unwrap();
        let name = normalize_name(&question.name);
        scripts
            .get(&(Some(question.server), name.clone(), question.record_type))
            .or_else(|| scripts.get(&(None, name, question.record_type)))
            .cloned()
    }
}

#[async_trait]
impl Transport for ScriptedNetwork {
    async fn query(&self, question: &Question, timeout: Duration) -> Result<RawResponse> {
        self.log.lock().unwrap().push(question.clone());
        let server = question.server.to_string();

        match self.lookup(question) {
            Some(Reply::Response(response)) => Ok(response),
            Some(Reply::Slow(delay, mut response)) => {
                if delay > timeout {
                    tokio::time::sleep(timeout).await;
                    return Err(DnsGuardError::Timeout { server });
                }
                tokio::time::sleep(delay).await;
                response.elapsed = delay;
                Ok(response)
            }
            Some(Reply::Timeout) => Err(DnsGuardError::Timeout { server }),
            Some(Reply::Unreachable) | None => Err(DnsGuardError::Unreachable {
                server,
                reason: "connection refused".into(),
            }),
        }
    }
}

pub fn a(name: &str, ip: &str) -> DnsRecord {
    DnsRecord::new(name, RecordType::A, 300, ip)
}

pub fn aaaa(name: &str, ip: &str) -> DnsRecord {
    DnsRecord::new(name, RecordType::AAAA, 300, ip)
}

pub fn ns(zone: &str, target: &str) -> DnsRecord {
    DnsRecord::new(zone, RecordType::NS, 172_800, normalize_name(target))
}

pub fn cname(name: &str, target: &str) -> DnsRecord {
    DnsRecord::new(name, RecordType::CNAME, 300, normalize_name(target))
}

pub fn txt(name: &str, text: &str) -> DnsRecord {
    DnsRecord::new(name, RecordType::TXT, 300, text)
}

pub fn record(name: &str, record_type: RecordType, data: &str) -> DnsRecord {
    DnsRecord::new(name, record_type, 300, data)
}

/// NOERROR response carrying `records` in the answer section.
pub fn answer(records: Vec<DnsRecord>) -> RawResponse {
    let mut response = RawResponse::empty(ResponseCode::NoError);
    response.answers = records;
    response
}

/// NOERROR response with an empty answer section.
pub fn nodata() -> RawResponse {
    RawResponse::empty(ResponseCode::NoError)
}

pub fn nxdomain() -> RawResponse {
    RawResponse::empty(ResponseCode::NXDomain)
}

/// Referral to `zone` served by `servers` (name, optional glue address).
pub fn referral(zone: &str, servers: &[(&str, Option<&str>)]) -> RawResponse {
    let mut response = RawResponse::empty(ResponseCode::NoError);
    for (host, glue) in servers {
        response.authority.push(ns(zone, host));
        if let Some(ip) = glue {
            let glue_record = if ip.contains(':') { aaaa(host, ip) } else { a(host, ip) };
            response.additional.push(glue_record);
        }
    }
    response
}
