//! `dnsguard scan` - full scan with a scored report.

use anyhow::{Context as _, Result};
use colored::Colorize;
use dnsguard::probe::aggregate::deductions;
use dnsguard::{ScanReport, ScanRequest};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::time::Duration;
use tabled::{settings::Style, Table, Tabled};
use tracing::debug;

use super::email::{print_findings, FindingCsv};
use super::lookup::print_comparison;
use super::trace::print_trace;
use super::Context;
use crate::cli::args::ScanArgs;
use crate::config::Overrides;
use crate::output::{html, print_csv, print_structured, score_colored, OutputFormat};

#[derive(Tabled)]
struct ComparisonRow {
    #[tabled(rename = "Question")]
    question: String,
    #[tabled(rename = "Responded")]
    responded: String,
    #[tabled(rename = "Agree")]
    agree: String,
    #[tabled(rename = "TTL spread")]
    ttl_spread: String,
    #[tabled(rename = "Fastest")]
    fastest: String,
}

pub async fn execute(ctx: Context, args: ScanArgs) -> Result<()> {
    let scanner = ctx.scanner(Overrides {
        resolvers: args.resolvers.clone(),
        glue_resolver: args.ns_resolver,
        ..Overrides::default()
    })?;

    let mut request = ScanRequest::new(&args.domain)
        .trace(args.trace)
        .dkim_selectors(args.dkim_selectors.clone());
    if let Some(types) = &args.record_types {
        request = request.record_types(types.clone());
    }

    let spinner = spinner(&ctx, &args.domain);
    let result = scanner.scan(&request).await;
    spinner.finish_and_clear();
    let report = result?;
    debug!(score = report.score, findings = report.findings.len(), "scan finished");

    let mut written = Vec::new();
    if let Some(out) = &args.out {
        let path = expand(out);
        let json = serde_json::to_string_pretty(&report)?;
        std::fs::write(&path, json).with_context(|| format!("writing {}", path.display()))?;
        written.push(path);
    }
    if let Some(out) = &args.html {
        let path = expand(out);
        std::fs::write(&path, html::render(&report)?)
            .with_context(|| format!("writing {}", path.display()))?;
        written.push(path);
    }

    // A file-only run with a machine format stays quiet on stdout.
    if !written.is_empty() && ctx.output_format != OutputFormat::Pretty {
        return Ok(());
    }

    if print_structured(ctx.output_format, &report)? {
        return Ok(());
    }
    match ctx.output_format {
        OutputFormat::Csv => print_csv(report.findings.iter().map(FindingCsv::from))?,
        _ => print_report(&report, ctx.verbose),
    }
    for path in written {
        println!("{} {}", "Wrote".green().bold(), path.display());
    }

    Ok(())
}

fn spinner(ctx: &Context, domain: &str) -> ProgressBar {
    if ctx.output_format != OutputFormat::Pretty || ctx.no_color {
        return ProgressBar::hidden();
    }
    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner} {msg} [{elapsed}]") {
        spinner.set_style(style);
    }
    spinner.set_message(format!("scanning {domain}"));
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}

fn expand(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path).into_owned())
}

fn print_report(report: &ScanReport, verbose: bool) {
    println!("{} {}", "Domain:".bold(), report.domain.cyan().bold());
    println!(
        "{} {}",
        "Generated:".bold(),
        report.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    println!("{} {}", "Score:".bold(), score_colored(report.score));
    if report.divergence {
        println!("{} {}", "Divergence:".bold(), "resolvers disagree".red().bold());
    }
    println!();

    let deductions = deductions(&report.findings);
    if !deductions.is_empty() {
        println!("{}", "Deductions:".bold().underline());
        for d in &deductions {
            println!(
                "  {}  {:15} {}",
                format!("{:>4}", format!("-{}", d.points)).red(),
                d.check.to_string(),
                d.reason
            );
        }
        println!();
    }

    println!("{}", "Posture:".bold().underline());
    print_findings(&report.findings, verbose);
    println!();

    println!("{}", "Resolvers:".bold().underline());
    let rows: Vec<ComparisonRow> = report
        .comparisons
        .iter()
        .map(|c| ComparisonRow {
            question: format!("{} {}", c.name, c.record_type),
            responded: format!(
                "{}/{}",
                c.results.iter().filter(|r| r.responded()).count(),
                c.results.len()
            ),
            agree: if c.divergent {
                "no".red().bold().to_string()
            } else {
                "yes".green().to_string()
            },
            ttl_spread: c.ttl_spread.map_or_else(|| "-".into(), |s| format!("{s}s")),
            fastest: c.fastest.clone().unwrap_or_else(|| "-".into()),
        })
        .collect();
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");
    println!();

    // Only the disagreements get the full per-resolver breakdown.
    for comparison in report.divergent_comparisons() {
        print_comparison(comparison, false);
    }

    for trace in &report.traces {
        print_trace(trace, verbose);
    }
}
