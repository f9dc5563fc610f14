//! Command implementations.

pub mod config;
pub mod email;
pub mod lookup;
pub mod scan;
pub mod trace;

use dnsguard::Scanner;
use std::path::PathBuf;

use crate::config::{Config, Overrides};
use crate::output::OutputFormat;

/// Shared context for all commands.
#[derive(Debug, Clone)]
pub struct Context {
    /// Loaded configuration file (or defaults)
    pub config: Config,

    /// Where the configuration lives
    pub config_path: PathBuf,

    /// Global flags that override the file
    pub overrides: Overrides,

    /// Output format
    pub output_format: OutputFormat,

    /// Verbose output
    pub verbose: bool,

    /// Disable colors
    pub no_color: bool,
}

impl Context {
    /// Build a scanner from the file, the global flags and `extra`.
    ///
    /// Fields set in `extra` take precedence over the global flags.
    pub fn scanner(&self, extra: Overrides) -> anyhow::Result<Scanner> {
        let overrides = Overrides {
            timeout_ms: extra.timeout_ms.or(self.overrides.timeout_ms),
            deadline_secs: extra.deadline_secs.or(self.overrides.deadline_secs),
            resolvers: extra.resolvers.or_else(|| self.overrides.resolvers.clone()),
            glue_resolver: extra.glue_resolver.or(self.overrides.glue_resolver),
            ipv6: extra.ipv6 || self.overrides.ipv6,
        };
        let probe = self.config.probe_config(&overrides)?;
        Ok(Scanner::new(probe)?)
    }
}
