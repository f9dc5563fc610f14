//! `dnsguard config` - CLI configuration management.

use anyhow::Result;
use colored::Colorize;

use super::Context;
use crate::cli::args::{ConfigArgs, ConfigCommands};
use crate::config::Config;
use crate::output::OutputFormat;

pub fn execute(ctx: Context, args: ConfigArgs) -> Result<()> {
    match args.command {
        ConfigCommands::Show => show_config(&ctx),
        ConfigCommands::Path => show_path(&ctx),
        ConfigCommands::Init { force } => init_config(&ctx, force),
    }
}

fn show_config(ctx: &Context) -> Result<()> {
    // Effective values: the file with the global flags applied.
    let probe = ctx.config.probe_config(&ctx.overrides)?;
    let effective = Config {
        output_format: Some(ctx.output_format),
        probe,
    };

    match ctx.output_format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&effective)?);
        }
        OutputFormat::Yaml => {
            print!("{}", serde_yaml::to_string(&effective)?);
        }
        _ => {
            println!("{}", "Current Configuration:".bold());
            let source = if ctx.config_path.exists() {
                ctx.config_path.display().to_string()
            } else {
                "(defaults, no config file)".dimmed().to_string()
            };
            println!("  {} {}", "file:".bold(), source);
            println!();

            let probe = &effective.probe;
            println!("  {} {}", "output_format:".bold(), ctx.output_format);
            println!("  {}", "resolvers:".bold());
            for resolver in &probe.resolvers {
                println!("    - {resolver}");
            }
            println!("  {} {} servers", "root_hints:".bold(), probe.root_hints.len());
            println!("  {} {}", "glue_resolver:".bold(), probe.glue_resolver);
            println!("  {} {} ms", "timeout:".bold(), probe.timeout_ms);
            println!("  {} {} s", "deadline:".bold(), probe.deadline_secs);
            println!("  {} {}", "max_hops:".bold(), probe.max_hops);
            println!("  {} {}", "max_cname_restarts:".bold(), probe.max_cname_restarts);
            println!("  {} {}", "max_glue_lookups:".bold(), probe.max_glue_lookups);
            println!("  {} {}", "caa_min_labels:".bold(), probe.caa_min_labels);
            println!("  {} {}", "use_ipv6:".bold(), probe.use_ipv6);
        }
    }

    Ok(())
}

fn show_path(ctx: &Context) -> Result<()> {
    println!("{}", ctx.config_path.display());
    Ok(())
}

fn init_config(ctx: &Context, force: bool) -> Result<()> {
    let path = &ctx.config_path;
    if path.exists() && !force {
        anyhow::bail!(
            "Config file already exists: {}\n\
             Use --force to overwrite it.",
            path.display()
        );
    }

    Config::default().save(path)?;
    println!("{} Wrote {}", "Success:".green().bold(), path.display());

    Ok(())
}
