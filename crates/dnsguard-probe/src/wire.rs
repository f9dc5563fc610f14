//! Wire query primitive: one question, one server, UDP with TCP fallback.

use async_trait::async_trait;
use dnsguard_core::{
    normalize_name, DnsGuardError, DnsRecord, Protocol, Question, RawResponse, RecordType,
    ResponseCode, Result,
};
use hickory_proto::op::{Edns, Message, MessageType, OpCode, Query};
use hickory_proto::rr::{Name, RData, Record};
use hickory_proto::serialize::binary::BinEncodable;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::time::{Duration, Instant};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpStream, UdpSocket};
use tokio::time::timeout;
use tracing::{debug, trace};

/// Default DNS port.
pub const DNS_PORT: u16 = 53;

/// EDNS0 payload size advertised on UDP queries.
pub const UDP_PAYLOAD: u16 = 1232;

/// Largest datagram we are prepared to receive.
const RECV_BUFFER: usize = 4096;

/// Fixed DNS header size.
const HEADER_LEN: usize = 12;

/// TC flag in the third header byte.
const TC_BIT: u8 = 0x02;

/// Outcome of the UDP leg of a query.
enum UdpReply {
    Answer(Message),
    Truncated,
}

/// Sends one question to one server.
///
/// Implementations perform exactly one attempt per transport and never retry
/// on their own; retry policy belongs to the caller.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send `question` to `question.server` and wait at most `timeout`.
    async fn query(&self, question: &Question, timeout: Duration) -> Result<RawResponse>;
}

/// Plain UDP/TCP transport speaking the DNS wire format.
#[derive(Debug, Clone)]
pub struct WireTransport {
    port: u16,
    udp_payload: u16,
}

impl Default for WireTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl WireTransport {
    /// Transport targeting port 53.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            port: DNS_PORT,
            udp_payload: UDP_PAYLOAD,
        }
    }

    /// Use a non-standard server port.
    #[must_use]
    pub const fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Advertise a different EDNS0 payload size.
    #[must_use]
    pub const fn udp_payload(mut self, size: u16) -> Self {
        self.udp_payload = size;
        self
    }

    fn build_request(&self, question: &Question) -> Result<(u16, Vec<u8>)> {
        let name = Name::from_ascii(&question.name).map_err(|e| DnsGuardError::InvalidDomain {
            domain: question.name.clone(),
            reason: e.to_string(),
        })?;

        let id: u16 = rand::random();
        let mut message = Message::new();
        message
            .set_id(id)
            .set_message_type(MessageType::Query)
            .set_op_code(OpCode::Query)
            .set_recursion_desired(question.recursion_desired);
        message.add_query(Query::query(
            name,
            hickory_proto::rr::RecordType::from(question.record_type.code()),
        ));

        let mut edns = Edns::new();
        edns.set_max_payload(self.udp_payload);
        edns.set_dnssec_ok(question.dnssec_ok);
        message.set_edns(edns);

        let bytes = message
            .to_vec()
            .map_err(|e| DnsGuardError::Unknown(format!("failed to encode query: {e}")))?;
        Ok((id, bytes))
    }

    async fn udp_exchange(
        &self,
        server: SocketAddr,
        request: &[u8],
        id: u16,
        question: &Question,
    ) -> Result<UdpReply> {
        let unreachable = |e: std::io::Error| DnsGuardError::Unreachable {
            server: server.ip().to_string(),
            reason: e.to_string(),
        };

        let socket = UdpSocket::bind(unspecified_for(server.ip()))
            .await
            .map_err(unreachable)?;
        socket.connect(server).await.map_err(unreachable)?;
        socket.send(request).await.map_err(unreachable)?;

        let mut buf = vec![0u8; RECV_BUFFER];
        loop {
            let len = socket.recv(&mut buf).await.map_err(unreachable)?;
            let datagram = &buf[..len];
            if len < HEADER_LEN {
                return Err(DnsGuardError::MalformedResponse {
                    server: server.ip().to_string(),
                    reason: format!("{len}-byte datagram is shorter than a DNS header"),
                });
            }

            let got = u16::from_be_bytes([datagram[0], datagram[1]]);
            if got != id {
                trace!(server = %server, got, want = id, "ignoring datagram with foreign id");
                continue;
            }
            // A truncated body may be cut mid-record; only the header is trusted.
            if datagram[2] & TC_BIT != 0 {
                return Ok(UdpReply::Truncated);
            }

            let message = decode(server.ip(), datagram)?;
            if !echoes_question(&message, question) {
                trace!(server = %server, "ignoring datagram for another question");
                continue;
            }
            return Ok(UdpReply::Answer(message));
        }
    }

    async fn tcp_exchange(&self, server: SocketAddr, request: &[u8]) -> Result<Message> {
        let unreachable = |e: std::io::Error| DnsGuardError::Unreachable {
            server: server.ip().to_string(),
            reason: e.to_string(),
        };

        let len = u16::try_from(request.len())
            .map_err(|_| DnsGuardError::Unknown("query larger than 65535 bytes".into()))?;

        let mut stream = TcpStream::connect(server).await.map_err(unreachable)?;
        let mut framed = Vec::with_capacity(request.len() + 2);
        framed.extend_from_slice(&len.to_be_bytes());
        framed.extend_from_slice(request);
        stream.write_all(&framed).await.map_err(unreachable)?;

        let mut len_buf = [0u8; 2];
        stream.read_exact(&mut len_buf).await.map_err(unreachable)?;
        let mut body = vec![0u8; usize::from(u16::from_be_bytes(len_buf))];
        stream.read_exact(&mut body).await.map_err(unreachable)?;

        decode(server.ip(), &body)
    }
}

#[async_trait]
impl Transport for WireTransport {
    async fn query(&self, question: &Question, limit: Duration) -> Result<RawResponse> {
        if limit.is_zero() {
            return Err(DnsGuardError::InvalidConfig("query timeout must be > 0".into()));
        }

        let server = SocketAddr::new(question.server, self.port);
        let (id, request) = self.build_request(question)?;
        let started = Instant::now();

        debug!(
            server = %server,
            name = %question.name,
            record_type = %question.record_type,
            rd = question.recursion_desired,
            "sending query"
        );

        let reply = timeout(limit, self.udp_exchange(server, &request, id, question))
            .await
            .map_err(|_| DnsGuardError::Timeout {
                server: question.server.to_string(),
            })??;

        if let UdpReply::Answer(message) = reply {
            return Ok(to_raw_response(&message, started.elapsed(), Protocol::Udp));
        }

        debug!(server = %server, "truncated UDP response, retrying over TCP");
        let remaining = limit.saturating_sub(started.elapsed());
        let tcp = if remaining.is_zero() {
            Err(DnsGuardError::Unreachable {
                server: question.server.to_string(),
                reason: "no time left for TCP retry".into(),
            })
        } else {
            timeout(remaining, self.tcp_exchange(server, &request))
                .await
                .unwrap_or_else(|_| {
                    Err(DnsGuardError::Unreachable {
                        server: question.server.to_string(),
                        reason: "TCP retry timed out".into(),
                    })
                })
        };

        match tcp {
            Ok(message) => Ok(to_raw_response(&message, started.elapsed(), Protocol::Tcp)),
            Err(DnsGuardError::Unreachable { server, reason }) => {
                Err(DnsGuardError::Unreachable { server, reason })
            }
            Err(other) => Err(DnsGuardError::Unreachable {
                server: question.server.to_string(),
                reason: format!("TCP retry failed: {other}"),
            }),
        }
    }
}

fn unspecified_for(ip: IpAddr) -> SocketAddr {
    match ip {
        IpAddr::V4(_) => SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 0),
        IpAddr::V6(_) => SocketAddr::new(IpAddr::V6(Ipv6Addr::UNSPECIFIED), 0),
    }
}

/// True if the response's question section matches what was asked.
///
/// An empty question section is accepted; some servers drop it from error
/// replies.
fn echoes_question(message: &Message, question: &Question) -> bool {
    let Some(query) = message.queries().first() else {
        return true;
    };
    normalize_name(&query.name().to_string()) == normalize_name(&question.name)
        && u16::from(query.query_type()) == question.record_type.code()
}

fn decode(server: IpAddr, bytes: &[u8]) -> Result<Message> {
    let message = Message::from_vec(bytes).map_err(|e| DnsGuardError::MalformedResponse {
        server: server.to_string(),
        reason: e.to_string(),
    })?;
    if message.message_type() != MessageType::Response {
        return Err(DnsGuardError::MalformedResponse {
            server: server.to_string(),
            reason: "message is not a response".into(),
        });
    }
    Ok(message)
}

/// Convert a decoded hickory message into the probe's response model.
pub(crate) fn to_raw_response(message: &Message, elapsed: Duration, protocol: Protocol) -> RawResponse {
    RawResponse {
        rcode: ResponseCode::from_code(u16::from(message.response_code())),
        answers: message.answers().iter().filter_map(to_record).collect(),
        authority: message.name_servers().iter().filter_map(to_record).collect(),
        additional: message.additionals().iter().filter_map(to_record).collect(),
        elapsed,
        truncated: message.truncated(),
        protocol,
    }
}

fn to_record(record: &Record) -> Option<DnsRecord> {
    let record_type = RecordType::from_code(u16::from(record.record_type()));
    // OPT lives in the EDNS section, never in the model.
    if record_type.code() == 41 {
        return None;
    }

    let data = match record.data() {
        RData::TXT(txt) => txt
            .iter()
            .map(|chunk| String::from_utf8_lossy(chunk).into_owned())
            .collect::<String>(),
        RData::MX(mx) => format!("{} {}", mx.preference(), mx.exchange()),
        other => other.to_string(),
    };

    Some(DnsRecord::new(
        record.name().to_string(),
        record_type,
        record.ttl(),
        data,
    ))
}
