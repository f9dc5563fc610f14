//! # dnsguard-cli
//!
//! Command-line interface for dnsguard.
//!
//! ## Commands
//!
//! - **lookup**: one question against several recursive resolvers, side by side
//! - **trace**: iterative delegation walk from the root servers
//! - **email**: SPF, DMARC, DKIM and MX posture
//! - **scan**: everything at once, as a scored report (JSON, YAML or HTML)
//! - **config**: show, locate or create the config file
//!
//! Output comes as pretty tables, JSON, CSV or YAML.

pub mod cli;
pub mod config;
pub mod output;

pub use cli::run;
