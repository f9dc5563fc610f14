//! `dnsguard email` - SPF, DMARC, DKIM and MX posture.

use anyhow::Result;
use colored::Colorize;
use dnsguard::PostureFinding;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use super::Context;
use crate::cli::args::EmailArgs;
use crate::config::Overrides;
use crate::output::{print_csv, print_structured, truncate, verdict_colored, OutputFormat};

#[derive(Tabled)]
struct FindingRow {
    #[tabled(rename = "Check")]
    check: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Verdict")]
    verdict: String,
    #[tabled(rename = "Explanation")]
    explanation: String,
}

#[derive(Serialize)]
pub(crate) struct FindingCsv<'a> {
    check: String,
    name: &'a str,
    verdict: String,
    explanation: &'a str,
    evidence: String,
    error: String,
}

impl<'a> From<&'a PostureFinding> for FindingCsv<'a> {
    fn from(finding: &'a PostureFinding) -> Self {
        Self {
            check: finding.check.to_string(),
            name: &finding.name,
            verdict: finding.verdict.to_string(),
            explanation: &finding.explanation,
            evidence: finding.evidence.join(" | "),
            error: finding.error.map(|k| k.to_string()).unwrap_or_default(),
        }
    }
}

pub async fn execute(ctx: Context, args: EmailArgs) -> Result<()> {
    let scanner = ctx.scanner(Overrides {
        resolvers: args.posture_resolvers(),
        ..Overrides::default()
    })?;

    let findings = scanner.email(&args.domain, &args.dkim_selectors).await?;

    if print_structured(ctx.output_format, &findings)? {
        return Ok(());
    }
    match ctx.output_format {
        OutputFormat::Csv => print_csv(findings.iter().map(FindingCsv::from)),
        _ => {
            println!("{} {}", "Email posture:".bold(), args.domain.cyan().bold());
            if args.dkim_selectors.is_empty() {
                println!(
                    "  {}",
                    "DKIM skipped: pass --dkim-selectors to check keys".dimmed()
                );
            }
            print_findings(&findings, ctx.verbose);
            Ok(())
        }
    }
}

/// Findings table, shared with `scan`. Evidence is listed when `verbose`.
pub(crate) fn print_findings(findings: &[PostureFinding], verbose: bool) {
    let rows: Vec<FindingRow> = findings
        .iter()
        .map(|f| FindingRow {
            check: f.check.to_string().bold().to_string(),
            name: f.name.clone(),
            verdict: verdict_colored(f.verdict).to_string(),
            explanation: truncate(&f.explanation, 80),
        })
        .collect();

    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");

    if verbose {
        for finding in findings.iter().filter(|f| !f.evidence.is_empty()) {
            println!("  {} {}", finding.check.to_string().bold(), finding.name.dimmed());
            for evidence in &finding.evidence {
                println!("    {evidence}");
            }
        }
    }
}
