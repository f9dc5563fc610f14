//! DNS probes for dnsguard.
//!
//! This crate does the network work behind a scan:
//!
//! - **wire**: one question to one server over UDP, TCP on truncation
//! - **lookup**: the same question against several recursive resolvers
//! - **trace**: iterative delegation walks from the root hints
//! - **posture**: SPF, DMARC, DKIM, DNSSEC, CAA, dangling CNAME and MX checks
//! - **aggregate**: divergence, score and the final report
//!
//! [`Scanner`] ties them together under one run deadline.
//!
//! # Example
//!
//! ```rust,no_run
//! use dnsguard_probe::{ProbeConfig, ScanRequest, Scanner};
//!
//! # async fn run() -> dnsguard_core::Result<()> {
//! let scanner = Scanner::new(ProbeConfig::default())?;
//! let report = scanner.scan(&ScanRequest::new("example.com").trace(true)).await?;
//! println!("score {}", report.score);
//! # Ok(())
//! # }
//! ```

pub mod aggregate;
pub mod client;
pub mod config;
pub mod lookup;
pub mod posture;
pub mod scanner;
pub mod trace;
pub mod wire;

#[cfg(test)]
mod testing;

pub use client::{Deadline, DnsClient};
pub use config::{root_hint_addrs, ProbeConfig, RootHint, ROOT_HINTS};
pub use lookup::Lookup;
pub use posture::Evaluator;
pub use scanner::{ScanRequest, Scanner};
pub use trace::Tracer;
pub use wire::{Transport, WireTransport};
