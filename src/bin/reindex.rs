//! Binary entry point for running a repair job against a graph
//! snapshot.
//!
//! Streams JSONL records through one worker the same way the batch
//! framework would drive a single partition, then prints the report.
//! Useful for verifying an index definition and record stream before
//! scheduling the distributed job.

use std::collections::BTreeMap;
use std::error::Error;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use tracing_subscriber::EnvFilter;

use umbra_reindex::record::GraphRecord;
use umbra_reindex::testkit::{GraphSnapshot, MemoryGraph};
use umbra_reindex::{RepairConfig, RepairWorker};

#[derive(Parser, Debug)]
#[command(
    name = "reindex",
    version,
    about = "Repair one secondary index from a record stream",
    disable_help_subcommand = true
)]
struct Cli {
    /// TOML configuration file naming the index under repair.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Index name (overrides the configuration file).
    #[arg(long)]
    index: Option<String>,

    /// Owning relation-type name for relation-scoped indexes.
    #[arg(long)]
    relation_type: Option<String>,

    /// JSON graph snapshot: live vertices and index definitions.
    #[arg(long)]
    snapshot: PathBuf,

    /// JSONL record stream, one graph record per line.
    #[arg(long)]
    records: PathBuf,

    /// Output format for the final report.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = build_config(&cli)?;

    let snapshot: GraphSnapshot = serde_json::from_reader(File::open(&cli.snapshot)?)?;
    let graph = MemoryGraph::from_snapshot(&snapshot);

    let records = read_records(&cli.records)?;
    let worker = RepairWorker::new(graph, config)?;
    let report = worker.run(records)?;

    match cli.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Text => {
            println!("index:      {}", report.index);
            println!("records:    {}", report.records);
            println!("duration:   {:.1} ms", report.duration_ms);
            println!(
                "committed:  {} ok / {} failed",
                report.counters.successful_transactions, report.counters.failed_transactions
            );
            println!(
                "shutdowns:  {} ok / {} failed",
                report.counters.successful_shutdowns, report.counters.failed_shutdowns
            );
        }
    }
    Ok(())
}

fn build_config(cli: &Cli) -> Result<RepairConfig, Box<dyn Error>> {
    let mut config = match &cli.config {
        Some(path) => RepairConfig::load(path)?,
        None => RepairConfig {
            index_name: String::new(),
            relation_type: None,
            backend: BTreeMap::new(),
        },
    };
    if let Some(index) = &cli.index {
        config.index_name = index.clone();
    }
    if let Some(relation_type) = &cli.relation_type {
        config.relation_type = Some(relation_type.clone());
    }
    config.validate()?;
    Ok(config)
}

fn read_records(path: &PathBuf) -> Result<Vec<GraphRecord>, Box<dyn Error>> {
    let reader = BufReader::new(File::open(path)?);
    let mut records = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        records.push(serde_json::from_str(&line)?);
    }
    Ok(records)
}
