//! Vantage CLI
//!
//! Command-line front door for the portfolio engine:
//! - Validating raw datasets against the forbidden-field gate
//! - Running the full derivation pipeline and printing ranked actions
//!
//! The gate runs here, at the edge: the core assumes no derived field ever
//! appears in raw facts and does not re-validate.

use std::fs;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing_subscriber::EnvFilter;
use vantage_engine::{compute, ComputeResult, EngineConfig, Severity};
use vantage_model::{parse_dataset, Dataset};

#[derive(Parser)]
#[command(name = "vantage")]
#[command(author, version, about = "Vantage: portfolio decision-support engine")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the derivation pipeline and print ranked actions per company.
    Compute {
        /// Raw dataset JSON (companies, people, relationships, investors, team)
        #[arg(short, long)]
        data: PathBuf,

        /// Reference timestamp (RFC 3339). Defaults to the current time; pass
        /// it explicitly to reproduce a previous run exactly.
        #[arg(long)]
        now: Option<DateTime<Utc>>,

        /// Restrict output to one company id
        #[arg(long)]
        company: Option<String>,

        /// Emit the full result object as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check a raw dataset against the schema and forbidden-field gate.
    Validate {
        /// Raw dataset JSON
        #[arg(short, long)]
        data: PathBuf,
    },
}

fn load_dataset(path: &PathBuf) -> Result<Dataset> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read dataset {}", path.display()))?;
    let value: serde_json::Value = serde_json::from_str(&raw)
        .with_context(|| format!("dataset {} is not valid JSON", path.display()))?;
    match parse_dataset(&value) {
        Ok(dataset) => Ok(dataset),
        Err(violations) => {
            for violation in &violations {
                eprintln!("{} {violation}", "error:".red().bold());
            }
            bail!("dataset failed validation with {} error(s)", violations.len());
        }
    }
}

fn severity_label(severity: Severity) -> colored::ColoredString {
    match severity {
        Severity::Critical => "CRITICAL".red().bold(),
        Severity::High => "HIGH".red(),
        Severity::Medium => "MEDIUM".yellow(),
        Severity::Low => "LOW".normal(),
    }
}

fn print_result(result: &ComputeResult, only_company: Option<&str>) {
    for company in &result.companies {
        if only_company.is_some_and(|id| id != company.company_id) {
            continue;
        }
        let label = company
            .company_name
            .as_deref()
            .unwrap_or(&company.company_id);
        println!("\n{}", label.bold().underline());

        match (company.runway.months, company.runway.infinite) {
            (Some(months), _) => println!("  runway: {months:.1} months"),
            (None, true) => println!("  runway: not consuming cash"),
            (None, false) => println!("  runway: {}", "unknown".yellow()),
        }

        if company.issues.issues.is_empty() {
            println!("  issues: none");
        } else {
            println!("  issues:");
            for issue in &company.issues.issues {
                println!(
                    "    [{}] {}",
                    severity_label(issue.severity),
                    issue.issue_type.as_str()
                );
            }
        }

        if !company.pre_issues.is_empty() {
            println!("  pre-issues:");
            for pre in &company.pre_issues {
                println!(
                    "    {} likelihood {:.2}, escalates in {:.0}d (cost {:.1}x)",
                    pre.pre_issue_type.as_str(),
                    pre.likelihood,
                    pre.escalation.days_until_escalation,
                    pre.cost_of_delay.cost_multiplier,
                );
            }
        }

        if company.ranked_actions.is_empty() {
            println!("  actions: none");
            continue;
        }
        println!("  actions:");
        for ranked in &company.ranked_actions {
            let marker = if ranked.rank <= 5 { "*" } else { " " };
            println!(
                "   {marker}{:>3}. [{:>7.1}] {:<12} {}",
                ranked.rank,
                ranked.rank_score,
                ranked.action.source.kind_str(),
                ranked.action.title,
            );
        }
    }

    for warning in &result.warnings {
        eprintln!("{} {warning}", "warning:".yellow().bold());
    }
    for error in &result.errors {
        eprintln!("{} {error}", "error:".red().bold());
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Compute { data, now, company, json } => {
            let dataset = load_dataset(&data)?;
            let now = now.unwrap_or_else(Utc::now);
            let result = compute(&dataset, now, &EngineConfig::default())
                .context("derivation graph is malformed")?;
            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                print_result(&result, company.as_deref());
            }
            if !result.errors.is_empty() {
                bail!("computation finished with {} error(s)", result.errors.len());
            }
            Ok(())
        }
        Commands::Validate { data } => {
            let dataset = load_dataset(&data)?;
            println!(
                "{} {} companies, {} people, {} relationships",
                "ok:".green().bold(),
                dataset.companies.len(),
                dataset.people.len(),
                dataset.relationships.len(),
            );
            Ok(())
        }
    }
}
