//! Configuration management.
//!
//! The file is optional TOML. Its `[probe]` table is a [`ProbeConfig`];
//! missing keys fall back to the library defaults, and command-line flags
//! override whatever the file says.

use anyhow::{Context as _, Result};
use directories::ProjectDirs;
use dnsguard::{root_hint_addrs, ProbeConfig, ResolverEndpoint};
use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::path::{Path, PathBuf};

use crate::output::OutputFormat;

/// CLI configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Default output format.
    pub output_format: Option<OutputFormat>,

    /// Probe settings: resolvers, timeouts, limits.
    #[serde(default)]
    pub probe: ProbeConfig,
}

/// Values from the command line, layered over the file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    /// Per-query timeout in milliseconds
    pub timeout_ms: Option<u64>,
    /// Run budget in seconds
    pub deadline_secs: Option<u64>,
    /// Replacement resolver list
    pub resolvers: Option<Vec<IpAddr>>,
    /// Resolver for glue-less referrals
    pub glue_resolver: Option<IpAddr>,
    /// Use IPv6 during traces
    pub ipv6: bool,
}

impl Config {
    /// Default config file path.
    pub fn default_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("", "", "dnsguard")
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }

    /// The explicit path if given, else the default one.
    pub fn path(explicit: Option<&Path>) -> Result<PathBuf> {
        explicit.map_or_else(Self::default_path, |p| Ok(p.to_path_buf()))
    }

    /// Load configuration from `path`. A missing file means defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let config: Self =
            toml::from_str(&content).with_context(|| format!("parsing {}", path.display()))?;

        Ok(config)
    }

    /// Save configuration to `path`.
    pub fn save(&self, path: &Path) -> Result<()> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;

        Ok(())
    }

    /// The probe configuration with `overrides` applied, validated.
    pub fn probe_config(&self, overrides: &Overrides) -> Result<ProbeConfig> {
        let mut probe = self.probe.clone();

        if let Some(timeout_ms) = overrides.timeout_ms {
            probe.timeout_ms = timeout_ms;
        }
        if let Some(deadline_secs) = overrides.deadline_secs {
            probe.deadline_secs = deadline_secs;
        }
        if let Some(resolvers) = &overrides.resolvers {
            probe.resolvers = resolvers.iter().copied().map(label_resolver).collect();
        }
        if let Some(glue_resolver) = overrides.glue_resolver {
            probe.glue_resolver = glue_resolver;
        }
        if overrides.ipv6 {
            probe.use_ipv6 = true;
            // Only widen the stock table; a hand-written list is kept as is.
            if probe.root_hints == root_hint_addrs(false) {
                probe.root_hints = root_hint_addrs(true);
            }
        }

        probe.validate()?;
        Ok(probe)
    }
}

/// Give well-known public resolvers their usual label.
fn label_resolver(address: IpAddr) -> ResolverEndpoint {
    ResolverEndpoint::public_defaults()
        .into_iter()
        .find(|r| r.address == address)
        .unwrap_or_else(|| ResolverEndpoint::from_ip(address))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(&dir.path().join("nope.toml")).unwrap();
        assert!(config.output_format.is_none());
        assert_eq!(config.probe.timeout_ms, 2000);
    }

    #[test]
    fn test_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "output_format = \"json\"\n\n[probe]\ntimeout_ms = 750\ncaa_min_labels = 3\n",
        )
        .unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.output_format, Some(OutputFormat::Json));
        assert_eq!(config.probe.timeout_ms, 750);
        assert_eq!(config.probe.caa_min_labels, 3);
        assert_eq!(config.probe.resolvers.len(), 3);
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        Config::default().save(&path).unwrap();
        let loaded = Config::load(&path).unwrap();

        assert_eq!(loaded.probe.resolvers, ResolverEndpoint::public_defaults());
        assert_eq!(loaded.probe.root_hints.len(), 13);
    }

    #[test]
    fn test_flags_override_file() {
        let mut config = Config::default();
        config.probe.timeout_ms = 750;
        config.probe.deadline_secs = 60;

        let overrides = Overrides {
            timeout_ms: Some(300),
            resolvers: Some(vec!["8.8.8.8".parse().unwrap(), "192.0.2.53".parse().unwrap()]),
            ..Overrides::default()
        };
        let probe = config.probe_config(&overrides).unwrap();

        assert_eq!(probe.timeout(), Duration::from_millis(300));
        assert_eq!(probe.deadline_secs, 60);
        assert_eq!(probe.resolvers[0].label, "google");
        assert_eq!(probe.resolvers[1].label, "192.0.2.53");
    }

    #[test]
    fn test_ipv6_widens_root_hints() {
        let overrides = Overrides {
            ipv6: true,
            ..Overrides::default()
        };
        let probe = Config::default().probe_config(&overrides).unwrap();
        assert!(probe.use_ipv6);
        assert_eq!(probe.root_hints.len(), 26);
    }

    #[test]
    fn test_invalid_override_rejected() {
        let overrides = Overrides {
            timeout_ms: Some(0),
            ..Overrides::default()
        };
        assert!(Config::default().probe_config(&overrides).is_err());
    }
}
