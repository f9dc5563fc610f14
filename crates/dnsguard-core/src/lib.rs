//! Core types and error taxonomy for dnsguard.
//!
//! This crate provides the foundational types shared by the probes and the
//! reporting layer:
//!
//! - **Types**: questions, raw responses, trace hops, resolver results,
//!   posture findings and the final [`ScanReport`]
//! - **Errors**: the [`DnsGuardError`] taxonomy and its serializable
//!   [`ErrorKind`] projection
//!
//! # Example
//!
//! ```rust
//! use dnsguard_core::{DomainName, RecordType};
//!
//! let domain = DomainName::parse("Example.COM.").unwrap();
//! assert_eq!(domain.fqdn(), "example.com.");
//! assert_eq!("txt".parse::<RecordType>().unwrap(), RecordType::TXT);
//! ```

mod error;
pub mod types;

pub use error::{DnsGuardError, ErrorKind, Failure, Result};
pub use types::*;
