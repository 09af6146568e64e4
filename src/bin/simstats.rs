use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use simstats::counters::RunKey;
use simstats::{AggregatedDataset, Analyzer};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Format {
    Json,
    Table,
}

#[derive(Parser)]
#[command(name = "simstats")]
#[command(about = "Derive comparable metrics from gem5 stats.txt dumps")]
struct Cli {
    #[arg(short, long, help = "Directory of <benchmark>_<config>/stats.txt runs")]
    raw: Option<PathBuf>,

    #[arg(long, help = "JSON rule table (defaults to the built-in rules)")]
    rules: Option<PathBuf>,

    #[arg(long, value_delimiter = ',', help = "Known benchmark names, comma separated")]
    benchmarks: Vec<String>,

    #[arg(long, help = "CSV file with a `name` column of interesting counters")]
    interest: Option<PathBuf>,

    #[arg(short, long = "metric", help = "Metric to compute (repeatable, default: all)")]
    metrics: Vec<String>,

    #[arg(long, value_enum, default_value = "table", help = "Output format")]
    format: Format,

    #[arg(long, help = "Also write the dataset to this Parquet file")]
    parquet: Option<PathBuf>,

    #[arg(long, help = "List the available metrics and exit")]
    list: bool,

    #[arg(long, help = "Evaluate cells on a single thread")]
    sequential: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut builder = Analyzer::builder()
        .known_benchmarks(cli.benchmarks.iter().cloned())
        .parallel(!cli.sequential);
    if let Some(rules) = &cli.rules {
        builder = builder.rules_file(rules);
    }
    if let Some(interest) = &cli.interest {
        builder = builder.interest_file(interest);
    }
    let analyzer = builder.build().context("Failed to set up analyzer")?;

    if cli.list {
        for name in analyzer.registry().names() {
            let description = analyzer
                .registry()
                .get(name)
                .map(|r| r.description())
                .unwrap_or_default();
            println!("{name:<24} {description}");
        }
        return Ok(());
    }

    let raw = cli
        .raw
        .as_ref()
        .ok_or_else(|| anyhow::anyhow!("--raw is required unless --list is given"))?;
    let runs = analyzer
        .load_runs(raw)
        .with_context(|| format!("Failed to load runs from {}", raw.display()))?;

    let dataset = if cli.metrics.is_empty() {
        analyzer.analyze(&runs)
    } else {
        let keys: Vec<&RunKey> = runs.keys().collect();
        analyzer.compute(&runs, &cli.metrics, keys)?
    };

    match cli.format {
        Format::Json => println!("{}", dataset.to_json_string()?),
        Format::Table => print_table(&dataset),
    }

    if let Some(path) = &cli.parquet {
        dataset
            .write_parquet(path)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        tracing::info!(path = %path.display(), rows = dataset.len(), "wrote Parquet dataset");
    }

    Ok(())
}

fn print_table(dataset: &AggregatedDataset) {
    println!("{:<24} {:<16} {:<24} value", "metric", "benchmark", "configuration");
    for row in dataset {
        println!(
            "{:<24} {:<16} {:<24} {}",
            row.metric, row.benchmark, row.configuration, row.value
        );
    }
}
