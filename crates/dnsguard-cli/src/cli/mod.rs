//! CLI argument parsing and command dispatch.

pub mod args;
pub mod commands;

use anyhow::Result;
use args::{Cli, Commands};
use clap::Parser;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::config::{Config, Overrides};

/// Run the CLI application.
pub async fn run() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.verbose);
    if cli.no_color {
        colored::control::set_override(false);
    }

    // Load configuration
    let config_path = Config::path(cli.config_file.as_deref())?;
    let config = Config::load(&config_path)?;
    debug!(path = %config_path.display(), exists = config_path.exists(), "configuration loaded");

    // Flags beat the file, the file beats the defaults
    let output_format = cli.output.or(config.output_format).unwrap_or_default();

    let ctx = commands::Context {
        config,
        config_path,
        overrides: Overrides {
            timeout_ms: cli.timeout,
            deadline_secs: cli.deadline,
            ..Overrides::default()
        },
        output_format,
        verbose: cli.verbose,
        no_color: cli.no_color,
    };

    // Dispatch to appropriate command
    match cli.command {
        Commands::Lookup(args) => commands::lookup::execute(ctx, args).await,
        Commands::Trace(args) => commands::trace::execute(ctx, args).await,
        Commands::Email(args) => commands::email::execute(ctx, args).await,
        Commands::Scan(args) => commands::scan::execute(ctx, args).await,
        Commands::Config(args) => commands::config::execute(ctx, args),
    }
}

/// Log to stderr. `RUST_LOG` wins; `-v` turns on debug for our crates.
fn init_tracing(verbose: bool) {
    let fallback = if verbose {
        "warn,dnsguard=debug,dnsguard_probe=debug,dnsguard_cli=debug"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));

    // Already installed when embedded in a test harness.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
