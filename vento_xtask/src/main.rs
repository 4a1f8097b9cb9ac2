use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use vento_core::synthetic::generate_records;
use vento_core::{FactQuery, FactReadApi, SignalDimensionApi, StoredFact};
use vento_source::records_to_json;
use vento_store::open_store;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Command::GenerateDataset(args) => generate_dataset(args),
        Command::CheckStore(args) => check_store(args).await,
    }
}

#[derive(Parser)]
#[command(author, version, about = "Developer utilities for the Vento ETL workspace")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Write deterministic one-minute turbine records as a JSON source file.
    GenerateDataset(GenerateDatasetArgs),
    /// Scan a store for orphaned facts, empty signals and ordering breaks.
    CheckStore(CheckStoreArgs),
}

#[derive(Parser)]
struct GenerateDatasetArgs {
    /// First day of generated data (YYYY-MM-DD).
    #[arg(long)]
    start: NaiveDate,
    /// Number of days to generate.
    #[arg(long, default_value_t = 10)]
    days: u32,
    /// Seed for the value generator.
    #[arg(long, default_value_t = 0)]
    seed: u64,
    /// Destination JSON file.
    #[arg(long, default_value = "data/records.json")]
    out: PathBuf,
}

#[derive(Parser)]
struct CheckStoreArgs {
    /// Directory holding vento.json and the sqlite database.
    #[arg(long, default_value = ".")]
    datastore: PathBuf,
    /// Reduce output to errors only.
    #[arg(long, default_value_t = false)]
    quiet: bool,
}

fn generate_dataset(args: GenerateDatasetArgs) -> Result<()> {
    if args.days == 0 {
        return Err(anyhow!("--days must be at least 1"));
    }
    let start = args
        .start
        .and_hms_opt(0, 0, 0)
        .ok_or_else(|| anyhow!("invalid start date {}", args.start))?;
    let records = generate_records(start, args.days, args.seed);
    if let Some(parent) = args.out.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("create_dir_all {}", parent.display()))?;
    }
    let json = serde_json::to_string(&records_to_json(&records))?;
    fs::write(&args.out, format!("{json}\n"))
        .with_context(|| format!("write {}", args.out.display()))?;
    println!(
        "wrote {} records ({} days from {}) to {}",
        records.len(),
        args.days,
        args.start,
        args.out.display()
    );
    Ok(())
}

#[derive(Debug, PartialEq, Eq)]
struct Finding {
    kind: &'static str,
    message: String,
}

/// Facts whose (timestamp, signal_id) is lower than the fact inserted before them.
fn ordering_breaks(facts: &[StoredFact]) -> usize {
    facts
        .windows(2)
        .filter(|pair| (pair[1].timestamp, pair[1].signal_id) < (pair[0].timestamp, pair[0].signal_id))
        .count()
}

fn scan(signal_ids: &HashSet<i32>, counts: &BTreeMap<i32, u64>, facts: &[StoredFact]) -> Vec<Finding> {
    let mut findings = Vec::new();
    for (signal_id, count) in counts {
        if !signal_ids.contains(signal_id) {
            findings.push(Finding {
                kind: "error",
                message: format!("{count} facts reference missing signal {signal_id}"),
            });
        }
    }
    let mut empty: Vec<&i32> = signal_ids
        .iter()
        .filter(|id| !counts.contains_key(id))
        .collect();
    empty.sort();
    for signal_id in empty {
        findings.push(Finding {
            kind: "warning",
            message: format!("signal {signal_id} has no facts"),
        });
    }
    let breaks = ordering_breaks(facts);
    if breaks > 0 {
        findings.push(Finding {
            kind: "warning",
            message: format!(
                "{breaks} facts break (timestamp, signal_id) order; earlier ranges were loaded after later ones or reprocessed"
            ),
        });
    }
    findings
}

async fn check_store(args: CheckStoreArgs) -> Result<()> {
    let store = open_store(&args.datastore)
        .await
        .with_context(|| format!("open store under {}", args.datastore.display()))?;
    let signals = store.list_signals().await?;
    let counts: BTreeMap<i32, u64> = store.count_facts_by_signal().await?.into_iter().collect();
    let facts = store.list_facts(FactQuery::default()).await?;
    store.close().await?;

    if !args.quiet {
        println!("{} signals, {} facts", signals.len(), facts.len());
        for signal in &signals {
            println!(
                "  {:>4} {:<24} {:<6} {}",
                signal.id,
                signal.name,
                signal.operation,
                counts.get(&signal.id).copied().unwrap_or(0)
            );
        }
    }

    let signal_ids: HashSet<i32> = signals.iter().map(|signal| signal.id).collect();
    let findings = scan(&signal_ids, &counts, &facts);
    let mut errors = 0;
    for finding in &findings {
        if finding.kind == "error" {
            errors += 1;
        } else if args.quiet {
            continue;
        }
        println!("[{}] {}", finding.kind, finding.message);
    }
    if errors > 0 {
        return Err(anyhow!("store check found {errors} error(s)"));
    }
    if !args.quiet {
        println!("store check passed");
    }
    Ok(())
}
