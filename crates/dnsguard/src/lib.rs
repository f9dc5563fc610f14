//! DNS resolution tracing, resolver comparison and DNS security posture checks.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use dnsguard::{ProbeConfig, ScanRequest, Scanner};
//!
//! #[tokio::main]
//! async fn main() -> dnsguard::Result<()> {
//!     let scanner = Scanner::new(ProbeConfig::default())?;
//!
//!     // Compare resolvers, trace from the root and evaluate posture
//!     let report = scanner
//!         .scan(&ScanRequest::new("example.com").trace(true))
//!         .await?;
//!
//!     println!("Score: {}", report.score);
//!     for finding in report.issues() {
//!         println!("{}: {}", finding.check, finding.explanation);
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! # Crates
//!
//! - [`dnsguard_core`] - data model and error taxonomy
//! - [`probe`] - wire queries, lookups, tracing and posture checks

// Re-export core types
pub use dnsguard_core::*;

// Re-export the probes
pub use dnsguard_probe as probe;
pub use dnsguard_probe::{
    root_hint_addrs, Evaluator, Lookup, ProbeConfig, ScanRequest, Scanner, Tracer, ROOT_HINTS,
};

// Re-export runtime for convenience
pub use serde;
pub use serde_json;
pub use tokio;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reexports() {
        let request = ScanRequest::new("example.com");
        assert_eq!(request.record_types.len(), 7);
        tokio_test::assert_ok!(DomainName::parse(&request.domain));
        assert!(ProbeConfig::default().validate().is_ok());
    }
}
