use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::DnsGuardError;

/// DNS record types understood by the probes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
#[allow(clippy::upper_case_acronyms)]
pub enum RecordType {
    A,
    AAAA,
    CNAME,
    MX,
    NS,
    SOA,
    TXT,
    CAA,
    DS,
    DNSKEY,
    RRSIG,
    PTR,
    SRV,
    /// Any other type, by numeric code
    Unknown(u16),
}

impl RecordType {
    /// Record types compared across resolvers when the caller names none.
    pub const DEFAULT_SCAN: [Self; 7] = [
        Self::A,
        Self::AAAA,
        Self::CNAME,
        Self::MX,
        Self::TXT,
        Self::NS,
        Self::SOA,
    ];

    /// IANA type code
    #[must_use]
    pub const fn code(self) -> u16 {
        match self {
            Self::A => 1,
            Self::NS => 2,
            Self::CNAME => 5,
            Self::SOA => 6,
            Self::PTR => 12,
            Self::MX => 15,
            Self::TXT => 16,
            Self::AAAA => 28,
            Self::SRV => 33,
            Self::DS => 43,
            Self::RRSIG => 46,
            Self::DNSKEY => 48,
            Self::CAA => 257,
            Self::Unknown(code) => code,
        }
    }

    /// Inverse of [`RecordType::code`]
    #[must_use]
    pub const fn from_code(code: u16) -> Self {
        match code {
            1 => Self::A,
            2 => Self::NS,
            5 => Self::CNAME,
            6 => Self::SOA,
            12 => Self::PTR,
            15 => Self::MX,
            16 => Self::TXT,
            28 => Self::AAAA,
            33 => Self::SRV,
            43 => Self::DS,
            46 => Self::RRSIG,
            48 => Self::DNSKEY,
            257 => Self::CAA,
            other => Self::Unknown(other),
        }
    }

    /// Returns true for A and AAAA
    #[must_use]
    pub const fn is_address(self) -> bool {
        matches!(self, Self::A | Self::AAAA)
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::A => f.write_str("A"),
            Self::AAAA => f.write_str("AAAA"),
            Self::CNAME => f.write_str("CNAME"),
            Self::MX => f.write_str("MX"),
            Self::NS => f.write_str("NS"),
            Self::SOA => f.write_str("SOA"),
            Self::TXT => f.write_str("TXT"),
            Self::CAA => f.write_str("CAA"),
            Self::DS => f.write_str("DS"),
            Self::DNSKEY => f.write_str("DNSKEY"),
            Self::RRSIG => f.write_str("RRSIG"),
            Self::PTR => f.write_str("PTR"),
            Self::SRV => f.write_str("SRV"),
            Self::Unknown(code) => write!(f, "TYPE{code}"),
        }
    }
}

impl FromStr for RecordType {
    type Err = DnsGuardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        let parsed = match upper.as_str() {
            "A" => Self::A,
            "AAAA" => Self::AAAA,
            "CNAME" => Self::CNAME,
            "MX" => Self::MX,
            "NS" => Self::NS,
            "SOA" => Self::SOA,
            "TXT" => Self::TXT,
            "CAA" => Self::CAA,
            "DS" => Self::DS,
            "DNSKEY" => Self::DNSKEY,
            "RRSIG" => Self::RRSIG,
            "PTR" => Self::PTR,
            "SRV" => Self::SRV,
            other => other
                .strip_prefix("TYPE")
                .and_then(|n| n.parse::<u16>().ok())
                .map(Self::from_code)
                .ok_or_else(|| {
                    DnsGuardError::InvalidConfig(format!("unknown record type: {s}"))
                })?,
        };
        Ok(parsed)
    }
}

impl TryFrom<String> for RecordType {
    type Error = DnsGuardError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<RecordType> for String {
    fn from(rt: RecordType) -> Self {
        rt.to_string()
    }
}

/// DNS response codes (RCODE).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
#[allow(clippy::upper_case_acronyms)]
pub enum ResponseCode {
    NoError,
    FormErr,
    ServFail,
    NXDomain,
    NotImp,
    Refused,
    /// Any other code
    Other(u16),
}

impl ResponseCode {
    /// Build from the numeric RCODE.
    #[must_use]
    pub const fn from_code(code: u16) -> Self {
        match code {
            0 => Self::NoError,
            1 => Self::FormErr,
            2 => Self::ServFail,
            3 => Self::NXDomain,
            4 => Self::NotImp,
            5 => Self::Refused,
            other => Self::Other(other),
        }
    }
}

impl fmt::Display for ResponseCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoError => f.write_str("NOERROR"),
            Self::FormErr => f.write_str("FORMERR"),
            Self::ServFail => f.write_str("SERVFAIL"),
            Self::NXDomain => f.write_str("NXDOMAIN"),
            Self::NotImp => f.write_str("NOTIMP"),
            Self::Refused => f.write_str("REFUSED"),
            Self::Other(code) => write!(f, "RCODE{code}"),
        }
    }
}

/// One resource record in presentation form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DnsRecord {
    /// Owner name, lower-case and dot-terminated
    pub name: String,

    /// Record type
    #[serde(rename = "type")]
    pub record_type: RecordType,

    /// Time to live in seconds
    pub ttl: u32,

    /// Record data in presentation form; TXT strings are concatenated unquoted
    pub data: String,
}

impl DnsRecord {
    /// Build a record, normalizing the owner name.
    pub fn new(
        name: impl AsRef<str>,
        record_type: RecordType,
        ttl: u32,
        data: impl Into<String>,
    ) -> Self {
        Self {
            name: super::normalize_name(name.as_ref()),
            record_type,
            ttl,
            data: data.into(),
        }
    }

    /// Try to parse the data as an IP address
    #[must_use]
    pub fn as_ip(&self) -> Option<std::net::IpAddr> {
        if self.record_type.is_address() {
            self.data.parse().ok()
        } else {
            None
        }
    }

    /// Target name for NS and CNAME records, normalized
    #[must_use]
    pub fn target_name(&self) -> Option<String> {
        matches!(self.record_type, RecordType::NS | RecordType::CNAME)
            .then(|| super::normalize_name(&self.data))
    }

    /// True if this record's owner is `name` (normalized comparison)
    #[must_use]
    pub fn is_owned_by(&self, name: &str) -> bool {
        self.name == super::normalize_name(name)
    }
}

impl fmt::Display for DnsRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}\t{}\t{}\t{}",
            self.name, self.ttl, self.record_type, self.data
        )
    }
}
