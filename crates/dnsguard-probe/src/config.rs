//! Probe configuration and the compiled-in root hint table.

use dnsguard_core::{DnsGuardError, ResolverEndpoint, Result};
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::time::Duration;

/// One IANA root server.
#[derive(Debug, Clone, Copy)]
pub struct RootHint {
    /// Hostname of the root server
    pub name: &'static str,
    /// IPv4 address
    pub ipv4: Ipv4Addr,
    /// IPv6 address
    pub ipv6: Ipv6Addr,
}

/// IANA root servers, a through m.
pub static ROOT_HINTS: [RootHint; 13] = [
    RootHint {
        name: "a.root-servers.net.",
        ipv4: Ipv4Addr::new(198, 41, 0, 4),
        ipv6: Ipv6Addr::new(0x2001, 0x503, 0xba3e, 0, 0, 0, 0x2, 0x30),
    },
    RootHint {
        name: "b.root-servers.net.",
        ipv4: Ipv4Addr::new(170, 247, 170, 2),
        ipv6: Ipv6Addr::new(0x2801, 0x1b8, 0x10, 0, 0, 0, 0, 0xb),
    },
    RootHint {
        name: "c.root-servers.net.",
        ipv4: Ipv4Addr::new(192, 33, 4, 12),
        ipv6: Ipv6Addr::new(0x2001, 0x500, 0x2, 0, 0, 0, 0, 0xc),
    },
    RootHint {
        name: "d.root-servers.net.",
        ipv4: Ipv4Addr::new(199, 7, 91, 13),
        ipv6: Ipv6Addr::new(0x2001, 0x500, 0x2d, 0, 0, 0, 0, 0xd),
    },
    RootHint {
        name: "e.root-servers.net.",
        ipv4: Ipv4Addr::new(192, 203, 230, 10),
        ipv6: Ipv6Addr::new(0x2001, 0x500, 0xa8, 0, 0, 0, 0, 0xe),
    },
    RootHint {
        name: "f.root-servers.net.",
        ipv4: Ipv4Addr::new(192, 5, 5, 241),
        ipv6: Ipv6Addr::new(0x2001, 0x500, 0x2f, 0, 0, 0, 0, 0xf),
    },
    RootHint {
        name: "g.root-servers.net.",
        ipv4: Ipv4Addr::new(192, 112, 36, 4),
        ipv6: Ipv6Addr::new(0x2001, 0x500, 0x12, 0, 0, 0, 0, 0xd0d),
    },
    RootHint {
        name: "h.root-servers.net.",
        ipv4: Ipv4Addr::new(198, 97, 190, 53),
        ipv6: Ipv6Addr::new(0x2001, 0x500, 0x1, 0, 0, 0, 0, 0x53),
    },
    RootHint {
        name: "i.root-servers.net.",
        ipv4: Ipv4Addr::new(192, 36, 148, 17),
        ipv6: Ipv6Addr::new(0x2001, 0x7fe, 0, 0, 0, 0, 0, 0x53),
    },
    RootHint {
        name: "j.root-servers.net.",
        ipv4: Ipv4Addr::new(192, 58, 128, 30),
        ipv6: Ipv6Addr::new(0x2001, 0x503, 0xc27, 0, 0, 0, 0x2, 0x30),
    },
    RootHint {
        name: "k.root-servers.net.",
        ipv4: Ipv4Addr::new(193, 0, 14, 129),
        ipv6: Ipv6Addr::new(0x2001, 0x7fd, 0, 0, 0, 0, 0, 0x1),
    },
    RootHint {
        name: "l.root-servers.net.",
        ipv4: Ipv4Addr::new(199, 7, 83, 42),
        ipv6: Ipv6Addr::new(0x2001, 0x500, 0x9f, 0, 0, 0, 0, 0x42),
    },
    RootHint {
        name: "m.root-servers.net.",
        ipv4: Ipv4Addr::new(202, 12, 27, 33),
        ipv6: Ipv6Addr::new(0x2001, 0xdc3, 0, 0, 0, 0, 0, 0x35),
    },
];

/// Root server addresses in table order, IPv4 first then (optionally) IPv6.
#[must_use]
pub fn root_hint_addrs(include_ipv6: bool) -> Vec<IpAddr> {
    let mut addrs: Vec<IpAddr> = ROOT_HINTS.iter().map(|h| IpAddr::V4(h.ipv4)).collect();
    if include_ipv6 {
        addrs.extend(ROOT_HINTS.iter().map(|h| IpAddr::V6(h.ipv6)));
    }
    addrs
}

/// Configuration shared by every probe.
///
/// Passed explicitly to each component; nothing here is read from the
/// environment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeConfig {
    /// Recursive resolvers compared against each other, in report order.
    #[serde(default = "ResolverEndpoint::public_defaults")]
    pub resolvers: Vec<ResolverEndpoint>,

    /// Where iterative traces start.
    #[serde(default = "default_root_hints")]
    pub root_hints: Vec<IpAddr>,

    /// Recursive resolver used to find NS addresses when a referral has no glue.
    #[serde(default = "default_glue_resolver")]
    pub glue_resolver: IpAddr,

    /// Per-query timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Budget for a whole run, in seconds.
    #[serde(default = "default_deadline_secs")]
    pub deadline_secs: u64,

    /// Hop limit for one trace, CNAME restarts included.
    #[serde(default = "default_max_hops")]
    pub max_hops: usize,

    /// CNAME restarts allowed in one trace.
    #[serde(default = "default_max_cname_restarts")]
    pub max_cname_restarts: usize,

    /// NS names resolved through the glue resolver per referral.
    #[serde(default = "default_max_glue_lookups")]
    pub max_glue_lookups: usize,

    /// Labels at which the CAA walk stops climbing (2 keeps it off bare TLDs).
    #[serde(default = "default_caa_min_labels")]
    pub caa_min_labels: usize,

    /// Use IPv6 glue and root hints during traces.
    #[serde(default)]
    pub use_ipv6: bool,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            resolvers: ResolverEndpoint::public_defaults(),
            root_hints: default_root_hints(),
            glue_resolver: default_glue_resolver(),
            timeout_ms: default_timeout_ms(),
            deadline_secs: default_deadline_secs(),
            max_hops: default_max_hops(),
            max_cname_restarts: default_max_cname_restarts(),
            max_glue_lookups: default_max_glue_lookups(),
            caa_min_labels: default_caa_min_labels(),
            use_ipv6: false,
        }
    }
}

impl ProbeConfig {
    /// Per-query timeout
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Run-wide budget
    #[must_use]
    pub const fn deadline(&self) -> Duration {
        Duration::from_secs(self.deadline_secs)
    }

    /// Reject configurations no run can succeed with.
    pub fn validate(&self) -> Result<()> {
        if self.timeout_ms == 0 {
            return Err(DnsGuardError::InvalidConfig("timeout must be > 0".into()));
        }
        if self.deadline_secs == 0 {
            return Err(DnsGuardError::InvalidConfig("deadline must be > 0".into()));
        }
        if self.resolvers.is_empty() {
            return Err(DnsGuardError::InvalidConfig("no resolvers configured".into()));
        }
        if self.root_hints.is_empty() {
            return Err(DnsGuardError::InvalidConfig("no root hints configured".into()));
        }
        if self.max_hops == 0 {
            return Err(DnsGuardError::InvalidConfig("max_hops must be > 0".into()));
        }
        if self.caa_min_labels == 0 {
            return Err(DnsGuardError::InvalidConfig("caa_min_labels must be > 0".into()));
        }
        Ok(())
    }
}

// Default value functions for serde.
fn default_root_hints() -> Vec<IpAddr> {
    root_hint_addrs(false)
}

const fn default_glue_resolver() -> IpAddr {
    IpAddr::V4(Ipv4Addr::new(1, 1, 1, 1))
}

const fn default_timeout_ms() -> u64 {
    2000
}

const fn default_deadline_secs() -> u64 {
    30
}

const fn default_max_hops() -> usize {
    30
}

const fn default_max_cname_restarts() -> usize {
    8
}

const fn default_max_glue_lookups() -> usize {
    6
}

const fn default_caa_min_labels() -> usize {
    2
}
