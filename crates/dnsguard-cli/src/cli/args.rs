//! Command-line argument definitions using clap.

use clap::{Args, Parser, Subcommand};
use dnsguard::RecordType;
use std::net::IpAddr;
use std::path::PathBuf;

use crate::output::OutputFormat;

/// DNS resolution tracing and security posture analyzer
///
/// Compares public resolvers, walks delegations from the root and checks
/// SPF, DMARC, DKIM, DNSSEC, CAA and dangling CNAMEs. Passive: only
/// ordinary DNS queries are sent.
#[derive(Parser, Debug)]
#[command(name = "dnsguard")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output format
    #[arg(short, long, global = true, value_enum)]
    pub output: Option<OutputFormat>,

    /// Per-query timeout in milliseconds
    #[arg(long, global = true, value_name = "MS")]
    pub timeout: Option<u64>,

    /// Budget for the whole run in seconds
    #[arg(long, global = true, value_name = "SECS")]
    pub deadline: Option<u64>,

    /// Config file to use instead of the platform default
    #[arg(long = "config", env = "DNSGUARD_CONFIG", global = true, value_name = "FILE")]
    pub config_file: Option<PathBuf>,

    /// Increase verbosity (debug logging on stderr)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Ask several recursive resolvers the same question and compare
    Lookup(LookupArgs),

    /// Iterative trace from the root servers, like dig +trace
    Trace(TraceArgs),

    /// Email posture: SPF, DMARC, DKIM selectors and MX
    Email(EmailArgs),

    /// Full scan with a scored report
    Scan(ScanArgs),

    /// Manage CLI configuration
    Config(ConfigArgs),
}

// ============================================================================
// Lookup command
// ============================================================================

#[derive(Args, Debug)]
pub struct LookupArgs {
    /// Domain to look up
    pub domain: String,

    /// Record type (A, AAAA, CNAME, MX, TXT, NS, SOA, CAA, DS, DNSKEY)
    #[arg(short = 't', long = "type", default_value = "A")]
    pub record_type: RecordType,

    /// Comma-separated resolver addresses (default: 1.1.1.1,8.8.8.8,9.9.9.9)
    #[arg(long, value_delimiter = ',')]
    pub resolvers: Option<Vec<IpAddr>>,

    /// Set the DO bit to request DNSSEC records
    #[arg(long)]
    pub dnssec: bool,

    /// Show authority section records
    #[arg(long)]
    pub show_authority: bool,
}

// ============================================================================
// Trace command
// ============================================================================

#[derive(Args, Debug)]
pub struct TraceArgs {
    /// Domain to trace
    pub domain: String,

    /// Record type to ask for
    #[arg(short = 't', long = "type", default_value = "A")]
    pub record_type: RecordType,

    /// Recursive resolver for NS names when a referral carries no glue
    #[arg(long, value_name = "IP")]
    pub ns_resolver: Option<IpAddr>,

    /// Also use IPv6 root hints and glue
    #[arg(long)]
    pub ipv6: bool,
}

// ============================================================================
// Email command
// ============================================================================

#[derive(Args, Debug)]
pub struct EmailArgs {
    /// Domain to check
    pub domain: String,

    /// Comma-separated DKIM selectors to check (e.g., google,selector1)
    #[arg(long, value_delimiter = ',')]
    pub dkim_selectors: Vec<String>,

    /// Comma-separated resolver addresses
    #[arg(long, value_delimiter = ',')]
    pub resolvers: Option<Vec<IpAddr>>,

    /// Primary resolver for the posture queries (tried before --resolvers)
    #[arg(long, value_name = "IP")]
    pub server: Option<IpAddr>,
}

impl EmailArgs {
    /// Resolver override for the posture queries, `--server` first.
    pub fn posture_resolvers(&self) -> Option<Vec<IpAddr>> {
        let Some(server) = self.server else {
            return self.resolvers.clone();
        };
        let mut resolvers = vec![server];
        resolvers.extend(self.resolvers.iter().flatten().filter(|ip| **ip != server));
        Some(resolvers)
    }
}

// ============================================================================
// Scan command
// ============================================================================

#[derive(Args, Debug)]
pub struct ScanArgs {
    /// Domain to scan
    pub domain: String,

    /// Record types to compare (default: A,AAAA,CNAME,MX,TXT,NS,SOA)
    #[arg(short = 't', long = "types", value_delimiter = ',')]
    pub record_types: Option<Vec<RecordType>>,

    /// Comma-separated resolver addresses for the comparison
    #[arg(long, value_delimiter = ',')]
    pub resolvers: Option<Vec<IpAddr>>,

    /// Include an iterative trace per record type (slower)
    #[arg(long)]
    pub trace: bool,

    /// Recursive resolver used during traces for NS names without glue
    #[arg(long, value_name = "IP")]
    pub ns_resolver: Option<IpAddr>,

    /// Comma-separated DKIM selectors to check
    #[arg(long, value_delimiter = ',')]
    pub dkim_selectors: Vec<String>,

    /// Write the JSON report to a file
    #[arg(long, value_name = "FILE")]
    pub out: Option<String>,

    /// Write an HTML report to a file
    #[arg(long, value_name = "FILE")]
    pub html: Option<String>,
}

// ============================================================================
// Config command
// ============================================================================

#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show the effective configuration
    Show,

    /// Show config file path
    Path,

    /// Write a config file with the default values
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_lookup() {
        let cli = Cli::try_parse_from([
            "dnsguard",
            "lookup",
            "example.com",
            "-t",
            "mx",
            "--resolvers",
            "1.1.1.1,8.8.4.4",
            "-o",
            "json",
        ])
        .unwrap();

        assert_eq!(cli.output, Some(OutputFormat::Json));
        let Commands::Lookup(args) = cli.command else {
            panic!("expected lookup");
        };
        assert_eq!(args.record_type, RecordType::MX);
        assert_eq!(args.resolvers.unwrap().len(), 2);
    }

    #[test]
    fn test_parse_scan() {
        let cli = Cli::try_parse_from([
            "dnsguard",
            "scan",
            "example.com",
            "--trace",
            "--dkim-selectors",
            "google,s1",
            "--types",
            "A,TXT",
            "--timeout",
            "500",
        ])
        .unwrap();

        assert_eq!(cli.timeout, Some(500));
        let Commands::Scan(args) = cli.command else {
            panic!("expected scan");
        };
        assert!(args.trace);
        assert_eq!(args.dkim_selectors, vec!["google", "s1"]);
        assert_eq!(
            args.record_types,
            Some(vec![RecordType::A, RecordType::TXT])
        );
    }

    #[test]
    fn test_email_server_goes_first() {
        let cli = Cli::try_parse_from([
            "dnsguard",
            "email",
            "example.com",
            "--server",
            "9.9.9.9",
            "--resolvers",
            "1.1.1.1,9.9.9.9",
        ])
        .unwrap();
        let Commands::Email(args) = cli.command else {
            panic!("expected email");
        };
        let expected: Vec<IpAddr> = vec!["9.9.9.9".parse().unwrap(), "1.1.1.1".parse().unwrap()];
        assert_eq!(args.posture_resolvers(), Some(expected));

        let cli = Cli::try_parse_from(["dnsguard", "email", "example.com", "--server", "8.8.8.8"])
            .unwrap();
        let Commands::Email(args) = cli.command else {
            panic!("expected email");
        };
        assert_eq!(
            args.posture_resolvers(),
            Some(vec!["8.8.8.8".parse::<IpAddr>().unwrap()])
        );

        let cli = Cli::try_parse_from(["dnsguard", "email", "example.com"]).unwrap();
        let Commands::Email(args) = cli.command else {
            panic!("expected email");
        };
        assert_eq!(args.posture_resolvers(), None);
    }

    #[test]
    fn test_rejects_bad_record_type() {
        assert!(Cli::try_parse_from(["dnsguard", "lookup", "example.com", "-t", "BOGUS"]).is_err());
    }
}
