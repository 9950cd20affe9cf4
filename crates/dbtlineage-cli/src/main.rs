use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::{Path, PathBuf};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use dbtlineage_core::{Severity, SourceConfig, SourceReport};
use dbtlineage_dbt::{DbtSource, NodeCategory};

/// dbtlineage - dbt lineage and schema extraction for metadata catalogs
#[derive(Parser)]
#[command(name = "dbtlineage")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to config file (default: dbtlineage.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Emit one metadata work unit per dbt node
    Ingest {
        /// Output file for work units (JSON array); stdout if omitted
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output file for the run report
        #[arg(short, long)]
        report: Option<PathBuf>,
    },

    /// List extracted nodes with their urns and upstreams
    List,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .init();

    let config_path = cli.config.unwrap_or_else(|| PathBuf::from("dbtlineage.toml"));
    let config = SourceConfig::from_file(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

    if cli.verbose {
        eprintln!(
            "{} platform: {}, env: {}, load_schemas: {}",
            "Using".cyan(),
            config.target_platform,
            config.env,
            config.load_schemas
        );
    }

    match cli.command {
        Commands::Ingest { output, report } => {
            ingest_command(config, output.as_deref(), report.as_deref())
        }
        Commands::List => list_command(config),
    }
}

/// Ingest command - emit work units and print the run report
fn ingest_command(config: SourceConfig, output: Option<&Path>, report_path: Option<&Path>) -> Result<()> {
    let mut source = DbtSource::new(config)?;

    let result = source.get_workunits().map(|workunits| workunits.collect::<Vec<_>>());
    let workunits = match result {
        Ok(workunits) => workunits,
        Err(e) => {
            source.close();
            let report = source.into_report();
            if let Err(save_err) = save_report(&report, report_path) {
                tracing::error!("failed to save report of aborted run: {:#}", save_err);
            }
            print_report_summary(&report);
            return Err(e).context("dbt ingestion aborted");
        }
    };

    tracing::info!(workunits = workunits.len(), "dbt ingestion finished");

    let json = serde_json::to_string_pretty(&workunits)?;
    match output {
        Some(path) => {
            std::fs::write(path, json)
                .with_context(|| format!("Failed to write work units to {}", path.display()))?;
            eprintln!("{} {}", "Work units saved to:".green(), path.display());
        }
        None => println!("{}", json),
    }

    source.close();
    let report = source.into_report();
    save_report(&report, report_path)?;
    print_report_summary(&report);

    if report.has_failures() {
        std::process::exit(1);
    }

    Ok(())
}

/// List command - show nodes as extracted, without emitting
fn list_command(config: SourceConfig) -> Result<()> {
    let source = DbtSource::new(config)?;
    let nodes = source.load_nodes()?;

    println!("\n{}", "=".repeat(60).bright_blue());
    println!("{}", "dbt Nodes".bold().bright_blue());
    println!("{}", "=".repeat(60).bright_blue());
    println!();

    for node in &nodes {
        let category = match node.category {
            NodeCategory::Model => "model".green(),
            NodeCategory::Source => "source".cyan(),
        };

        println!("[{}] {} ({})", category, node.dbt_name.bold(), node.materialization);
        println!("    urn: {}", node.datahub_urn);
        println!("    columns: {}", node.columns.len());

        for upstream in &node.upstream_urns {
            println!("      <- {}", upstream.yellow());
        }
    }

    println!();
    println!("{} nodes", nodes.len());
    println!("{}", "=".repeat(60).bright_blue());

    Ok(())
}

fn save_report(report: &SourceReport, path: Option<&Path>) -> Result<()> {
    if let Some(path) = path {
        report
            .save_to_file(path)
            .with_context(|| format!("Failed to write report to {}", path.display()))?;
        eprintln!("{} {}", "Report saved to:".green(), path.display());
    }
    Ok(())
}

/// Print report summary to stderr, keeping stdout for work units
fn print_report_summary(report: &SourceReport) {
    eprintln!("\n{}", "=".repeat(60).bright_blue());
    eprintln!("{}", "dbt Ingestion Report".bold().bright_blue());
    eprintln!("{}", "=".repeat(60).bright_blue());
    eprintln!();

    eprintln!("Version: {}", report.version);
    eprintln!("Timestamp: {}", report.timestamp);
    eprintln!();

    eprintln!("{}", "Summary:".bold());
    eprintln!("  Work units: {}", report.summary.workunits_produced);

    if report.summary.warnings > 0 {
        eprintln!("  Warnings: {}", report.summary.warnings.to_string().yellow());
    } else {
        eprintln!("  Warnings: {}", report.summary.warnings.to_string().green());
    }

    if report.summary.failures > 0 {
        eprintln!("  Failures: {}", report.summary.failures.to_string().red().bold());
    } else {
        eprintln!("  Failures: {}", report.summary.failures.to_string().green());
    }
    eprintln!();

    if report.diagnostics.is_empty() {
        eprintln!("{}", "✓ No issues found!".green().bold());
    } else {
        eprintln!("{}", "Diagnostics:".bold());
        for diag in &report.diagnostics {
            let severity_str = match diag.severity {
                Severity::Error => "ERROR".red().bold(),
                Severity::Warn => "WARN".yellow().bold(),
                Severity::Info => "INFO".cyan(),
            };

            eprintln!("  [{}] {}: {}", severity_str, diag.code, diag.message);

            if !diag.dataset.is_empty() {
                eprintln!("    Dataset: {}", diag.dataset);
            }
        }
    }

    eprintln!();
    eprintln!("{}", "=".repeat(60).bright_blue());
}
