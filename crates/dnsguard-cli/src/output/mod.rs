//! Output formatting for different formats.

pub mod html;

use anyhow::Result;
use clap::ValueEnum;
use colored::{ColoredString, Colorize};
use dnsguard::Verdict;
use serde::{Deserialize, Serialize};
use std::io;
use std::str::FromStr;

/// Available output formats.
#[derive(Debug, Clone, Copy, Default, ValueEnum, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Pretty-printed tables with colors
    #[default]
    Pretty,
    /// JSON output
    Json,
    /// CSV output, one row per resolver, hop or finding
    Csv,
    /// YAML output
    Yaml,
}

impl FromStr for OutputFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pretty" | "table" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            "csv" => Ok(Self::Csv),
            "yaml" | "yml" => Ok(Self::Yaml),
            _ => anyhow::bail!(
                "Unknown output format: {}\n\
                 Valid formats: pretty, json, csv, yaml",
                s
            ),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pretty => write!(f, "pretty"),
            Self::Json => write!(f, "json"),
            Self::Csv => write!(f, "csv"),
            Self::Yaml => write!(f, "yaml"),
        }
    }
}

/// Print `value` as JSON or YAML.
///
/// Returns `false` without printing anything for the formats each command
/// renders itself (pretty and CSV).
pub fn print_structured<T: Serialize>(format: OutputFormat, value: &T) -> Result<bool> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(value)?),
        OutputFormat::Yaml => print!("{}", serde_yaml::to_string(value)?),
        OutputFormat::Pretty | OutputFormat::Csv => return Ok(false),
    }
    Ok(true)
}

/// Write flat rows as CSV to stdout, header first.
pub fn print_csv<R: Serialize>(rows: impl IntoIterator<Item = R>) -> Result<()> {
    let mut writer = csv::Writer::from_writer(io::stdout().lock());
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

/// Verdict colored by how good it is.
pub fn verdict_colored(verdict: Verdict) -> ColoredString {
    let text = verdict.to_string();
    match verdict {
        Verdict::Strict => text.green().bold(),
        Verdict::Present => text.green(),
        Verdict::Weak => text.yellow().bold(),
        Verdict::Absent => text.red(),
        Verdict::Unknown => text.dimmed(),
    }
}

/// Score colored by band.
pub fn score_colored(score: u8) -> ColoredString {
    let text = format!("{score}/100");
    match score {
        90..=100 => text.green().bold(),
        70..=89 => text.yellow().bold(),
        _ => text.red().bold(),
    }
}

/// Shorten `s` to `max` characters for table cells.
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{cut}...")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_format() {
        assert_eq!("YML".parse::<OutputFormat>().unwrap(), OutputFormat::Yaml);
        assert_eq!("table".parse::<OutputFormat>().unwrap(), OutputFormat::Pretty);
        assert!("xml".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("v=spf1 include:_spf.example.com -all", 12), "v=spf1 in...");
    }
}
