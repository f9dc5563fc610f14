//! `dnsguard trace` - iterative delegation walk from the root.

use anyhow::Result;
use colored::Colorize;
use dnsguard::{HopClass, RecordType, Trace, TraceHop};
use serde::Serialize;

use super::Context;
use crate::cli::args::TraceArgs;
use crate::config::Overrides;
use crate::output::{print_csv, print_structured, OutputFormat};

/// Authority records shown per hop before eliding the rest.
const AUTHORITY_SHOWN: usize = 12;

#[derive(Serialize)]
struct HopCsv<'a> {
    index: usize,
    server: String,
    zone: &'a str,
    name: &'a str,
    record_type: String,
    class: &'static str,
    rcode: String,
    elapsed_ms: Option<u128>,
    answers: usize,
    authority: usize,
    additional: usize,
    failed_attempts: usize,
    note: &'a str,
}

pub async fn execute(ctx: Context, args: TraceArgs) -> Result<()> {
    let scanner = ctx.scanner(Overrides {
        glue_resolver: args.ns_resolver,
        ipv6: args.ipv6,
        ..Overrides::default()
    })?;

    let trace = scanner.trace(&args.domain, args.record_type).await?;

    if print_structured(ctx.output_format, &trace)? {
        return Ok(());
    }
    match ctx.output_format {
        OutputFormat::Csv => print_csv(trace.hops.iter().map(hop_csv)),
        _ => {
            print_trace(&trace, ctx.verbose);
            Ok(())
        }
    }
}

const fn class_label(class: HopClass) -> &'static str {
    match class {
        HopClass::Referral => "referral",
        HopClass::Answer => "answer",
        HopClass::Error => "error",
    }
}

fn hop_csv(hop: &TraceHop) -> HopCsv<'_> {
    let response = hop.response.as_ref();
    HopCsv {
        index: hop.index,
        server: hop.server.to_string(),
        zone: &hop.zone,
        name: &hop.question.name,
        record_type: hop.question.record_type.to_string(),
        class: class_label(hop.class),
        rcode: response.map(|r| r.rcode.to_string()).unwrap_or_default(),
        elapsed_ms: response.map(|r| r.elapsed.as_millis()),
        answers: response.map_or(0, |r| r.answers.len()),
        authority: response.map_or(0, |r| r.authority.len()),
        additional: response.map_or(0, |r| r.additional.len()),
        failed_attempts: hop.failed_attempts.len(),
        note: hop.note.as_deref().unwrap_or_default(),
    }
}

/// Hop-by-hop listing, shared with `scan`.
pub(crate) fn print_trace(trace: &Trace, verbose: bool) {
    println!(
        "{} {} {}",
        "Trace".bold(),
        trace.name.cyan().bold(),
        trace.record_type.to_string().yellow()
    );

    for hop in &trace.hops {
        print_hop(hop, verbose);
    }

    println!();
    match trace.failure() {
        Some(failure) => println!(
            "{} {} ({})",
            "STOPPED:".red().bold(),
            failure.message,
            failure.kind
        ),
        None => {
            println!("{}", "FINAL:".green().bold());
            if trace.answers.is_empty() {
                println!("   {}", "(no records of this type)".dimmed());
            }
            for record in &trace.answers {
                println!("   {record}");
            }
            if !trace.cname_chain.is_empty() {
                println!("   {} {}", "via".dimmed(), trace.cname_chain.join(" -> "));
            }
        }
    }
    println!();
}

fn print_hop(hop: &TraceHop, verbose: bool) {
    let class = match hop.class {
        HopClass::Referral => class_label(hop.class).cyan(),
        HopClass::Answer => class_label(hop.class).green().bold(),
        HopClass::Error => class_label(hop.class).red().bold(),
    };

    let mut line = format!(
        "[{}] server={} zone={} q={} {} {}",
        hop.index,
        hop.server.to_string().bold(),
        hop.zone,
        hop.question.name,
        hop.question.record_type,
        class
    );
    if let Some(response) = &hop.response {
        line.push_str(&format!(
            " rcode={} {}ms answers={} authority={} additional={}",
            response.rcode,
            response.elapsed.as_millis(),
            response.answers.len(),
            response.authority.len(),
            response.additional.len()
        ));
    }
    if let Some(note) = &hop.note {
        line.push_str(&format!(" note={}", note.dimmed()));
    }
    println!("{line}");

    if verbose {
        for attempt in &hop.failed_attempts {
            println!(
                "    {} {} {}",
                "failed".yellow(),
                attempt.server,
                attempt.failure.message.dimmed()
            );
        }
    }

    let Some(response) = &hop.response else {
        return;
    };
    if !response.answers.is_empty() {
        println!("  answers:");
        for record in &response.answers {
            println!("     {record}");
        }
    }
    let delegation: Vec<_> = response
        .authority
        .iter()
        .filter(|r| r.record_type == RecordType::NS || verbose)
        .collect();
    if !delegation.is_empty() {
        println!("  authority:");
        for record in delegation.iter().take(AUTHORITY_SHOWN) {
            println!("     {record}");
        }
        if delegation.len() > AUTHORITY_SHOWN {
            println!("     {} more...", delegation.len() - AUTHORITY_SHOWN);
        }
    }
}
