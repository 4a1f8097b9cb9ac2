use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

use vento_core::{BootstrapOutcome, SignalDimensionApi, SourceApi};
use vento_etl::EtlPipeline;
use vento_source::{FileSource, HttpSource};
use vento_store::{load_or_init_config, SignalStore, VentoConfig};

/// Aggregate one day of turbine records into the signal fact table.
#[derive(Parser)]
#[command(name = "vento-etl", version, about)]
struct Cli {
    /// Directory holding vento.json and the default sqlite database.
    #[arg(long, default_value = ".")]
    base_dir: PathBuf,

    /// Explicit config file; overrides the one under --base-dir.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Logging verbosity level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Fetch, transform and load the records of one day (or a range of days).
    Run(RunArgs),
    /// Populate the signal dimension if it is empty.
    Bootstrap,
    /// Add configured (field, operation) pairs missing from the dimension.
    Reconcile,
    /// Delete a signal and all of its facts.
    DeleteSignal(DeleteSignalArgs),
}

#[derive(Parser)]
struct RunArgs {
    /// Calendar day to process (YYYY-MM-DD).
    #[arg(long)]
    date: NaiveDate,
    /// Last day of a multi-day run (inclusive); defaults to --date.
    #[arg(long)]
    to: Option<NaiveDate>,
    /// Read records from a JSON file instead of the HTTP source.
    #[arg(long)]
    input: Option<PathBuf>,
}

#[derive(Parser)]
struct DeleteSignalArgs {
    #[arg(long)]
    id: i32,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_new(&cli.log_level)
        .with_context(|| format!("invalid log level: {}", cli.log_level))?;
    fmt().with_env_filter(filter).with_target(true).init();

    let (config, base_dir) = load_config(&cli)?;
    let store = SignalStore::connect(&config, &base_dir)
        .await
        .with_context(|| format!("connecting to {} store", config.backend_name()))?;

    let outcome = match cli.command {
        Command::Run(args) => run(args, &config, store.clone()).await,
        Command::Bootstrap => bootstrap(&config, &store).await,
        Command::Reconcile => reconcile(&config, &store).await,
        Command::DeleteSignal(args) => delete_signal(args, &store).await,
    };
    store.close().await.context("closing store")?;
    outcome
}

fn load_config(cli: &Cli) -> Result<(VentoConfig, PathBuf)> {
    match &cli.config {
        Some(path) => {
            let config = VentoConfig::load(path)
                .with_context(|| format!("loading config from {}", path.display()))?;
            let base = path
                .parent()
                .filter(|parent| !parent.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."))
                .to_path_buf();
            Ok((config, base))
        }
        None => {
            let config = load_or_init_config(&cli.base_dir)
                .with_context(|| format!("loading config under {}", cli.base_dir.display()))?;
            Ok((config, cli.base_dir.clone()))
        }
    }
}

async fn run(args: RunArgs, config: &VentoConfig, store: SignalStore) -> Result<()> {
    let to = args.to.unwrap_or(args.date);
    match args.input {
        Some(path) => {
            let source = FileSource::new(path);
            run_with(source, config, store, args.date, to).await
        }
        None => {
            let source = HttpSource::new(&config.source, config.pipeline.fields.clone())?;
            run_with(source, config, store, args.date, to).await
        }
    }
}

async fn run_with<S: SourceApi>(
    source: S,
    config: &VentoConfig,
    store: SignalStore,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<()> {
    let pipeline = EtlPipeline::new(source, store, config.pipeline.clone())?;
    let report = pipeline
        .run_range(from, to)
        .await
        .with_context(|| format!("pipeline run for {from}..={to}"))?;
    tracing::info!(
        records = report.records,
        buckets = report.buckets,
        facts = report.write.inserted,
        skipped = report.write.skipped_missing,
        dropped = report.dropped_rows(),
        "run complete for {}..={}",
        report.from,
        report.to,
    );
    for pair in &report.unresolved {
        println!(
            "unresolved signal ({}, {}): {} rows dropped",
            pair.name, pair.operation, pair.rows
        );
    }
    println!(
        "loaded {} facts for {}..={} ({} buckets)",
        report.write.inserted, report.from, report.to, report.buckets
    );
    Ok(())
}

async fn bootstrap(config: &VentoConfig, store: &SignalStore) -> Result<()> {
    let pipeline = &config.pipeline;
    match store
        .bootstrap_signals(&pipeline.fields, &pipeline.operations)
        .await?
    {
        BootstrapOutcome::Populated { inserted } => {
            println!("signal dimension populated with {inserted} signals");
        }
        BootstrapOutcome::Skipped { existing } => {
            println!("signal dimension already holds {existing} signals; nothing to do");
        }
    }
    Ok(())
}

async fn reconcile(config: &VentoConfig, store: &SignalStore) -> Result<()> {
    let pipeline = &config.pipeline;
    let outcome = store
        .reconcile_signals(&pipeline.fields, &pipeline.operations)
        .await?;
    for signal in &outcome.inserted {
        println!(
            "added signal {} ({}, {})",
            signal.id, signal.name, signal.operation
        );
    }
    println!(
        "{} signals added, {} already present",
        outcome.inserted.len(),
        outcome.existing
    );
    Ok(())
}

async fn delete_signal(args: DeleteSignalArgs, store: &SignalStore) -> Result<()> {
    if !store.delete_signal(args.id).await? {
        return Err(anyhow!("signal {} does not exist", args.id));
    }
    println!("deleted signal {} and its facts", args.id);
    Ok(())
}
