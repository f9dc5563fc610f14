//! `dnsguard lookup` - one question, several resolvers.

use anyhow::Result;
use colored::Colorize;
use dnsguard::{ResolverComparison, ResolverResult};
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use super::Context;
use crate::cli::args::LookupArgs;
use crate::config::Overrides;
use crate::output::{print_csv, print_structured, truncate, OutputFormat};

#[derive(Tabled)]
struct ResolverRow {
    #[tabled(rename = "Resolver")]
    resolver: String,
    #[tabled(rename = "Rcode")]
    rcode: String,
    #[tabled(rename = "TTL")]
    ttl: String,
    #[tabled(rename = "Time")]
    elapsed: String,
    #[tabled(rename = "Answers")]
    answers: String,
}

/// Flat CSV shape of one resolver result.
#[derive(Serialize)]
struct ResolverCsv<'a> {
    name: &'a str,
    record_type: String,
    resolver: &'a str,
    address: String,
    rcode: String,
    ttl: Option<u32>,
    elapsed_ms: u128,
    answers: String,
    error: String,
}

impl<'a> ResolverCsv<'a> {
    fn new(comparison: &'a ResolverComparison, result: &'a ResolverResult) -> Self {
        Self {
            name: &comparison.name,
            record_type: comparison.record_type.to_string(),
            resolver: &result.resolver.label,
            address: result.resolver.address.to_string(),
            rcode: result
                .response
                .as_ref()
                .map(|r| r.rcode.to_string())
                .unwrap_or_default(),
            ttl: result.ttl,
            elapsed_ms: result.elapsed.as_millis(),
            answers: answer_data(result).join(";"),
            error: result
                .error
                .as_ref()
                .map(|f| f.message.clone())
                .unwrap_or_default(),
        }
    }
}

pub async fn execute(ctx: Context, args: LookupArgs) -> Result<()> {
    let scanner = ctx.scanner(Overrides {
        resolvers: args.resolvers.clone(),
        ..Overrides::default()
    })?;

    let comparison = scanner
        .lookup(&args.domain, args.record_type, args.dnssec)
        .await?;

    if print_structured(ctx.output_format, &comparison)? {
        return Ok(());
    }
    match ctx.output_format {
        OutputFormat::Csv => print_csv(
            comparison
                .results
                .iter()
                .map(|r| ResolverCsv::new(&comparison, r)),
        ),
        _ => {
            print_comparison(&comparison, args.show_authority);
            Ok(())
        }
    }
}

/// Table of one comparison, shared with `scan`.
pub(crate) fn print_comparison(comparison: &ResolverComparison, show_authority: bool) {
    let status = if comparison.divergent {
        "resolvers disagree".red().bold()
    } else {
        "consistent".green()
    };
    println!(
        "{} {} {}",
        comparison.name.cyan().bold(),
        comparison.record_type.to_string().yellow(),
        status
    );

    let rows: Vec<ResolverRow> = comparison.results.iter().map(row).collect();
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");

    let mut summary = Vec::new();
    if let Some(fastest) = &comparison.fastest {
        summary.push(format!("{} {}", "fastest:".dimmed(), fastest));
    }
    if let Some(spread) = comparison.ttl_spread {
        summary.push(format!("{} {}s", "TTL spread:".dimmed(), spread));
    }
    if !summary.is_empty() {
        println!("  {}", summary.join("  "));
    }

    if show_authority {
        for result in &comparison.results {
            let Some(response) = &result.response else {
                continue;
            };
            if response.authority.is_empty() {
                continue;
            }
            println!("  {} {}", "authority via".dimmed(), result.resolver);
            for record in &response.authority {
                println!("    {record}");
            }
        }
    }
    println!();
}

fn row(result: &ResolverResult) -> ResolverRow {
    let elapsed = format!("{} ms", result.elapsed.as_millis());
    match &result.response {
        Some(response) => {
            let answers = answer_data(result);
            ResolverRow {
                resolver: result.resolver.to_string(),
                rcode: response.rcode.to_string(),
                ttl: result.ttl.map_or_else(|| "-".into(), |t| t.to_string()),
                elapsed,
                answers: if answers.is_empty() {
                    "(none)".dimmed().to_string()
                } else {
                    answers
                        .iter()
                        .map(|a| truncate(a, 60))
                        .collect::<Vec<_>>()
                        .join("\n")
                },
            }
        }
        None => ResolverRow {
            resolver: result.resolver.to_string(),
            rcode: "error".red().to_string(),
            ttl: "-".into(),
            elapsed,
            answers: result
                .error
                .as_ref()
                .map_or_else(|| "no response".into(), |f| f.message.clone()),
        },
    }
}

fn answer_data(result: &ResolverResult) -> Vec<String> {
    result
        .response
        .as_ref()
        .map(|r| r.answers.iter().map(|a| a.data.clone()).collect())
        .unwrap_or_default()
}
