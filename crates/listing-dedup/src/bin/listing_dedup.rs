//! listing-dedup CLI
//!
//! Reads a JSON array of records, runs one deduplication pass and writes the
//! outcome as pretty JSON.

use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use listing_dedup::{
    BlockingStrategy, Budget, DeduplicationConfig, DeduplicationEngine, Record,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "listing-dedup")]
#[command(about = "Find, merge and queue for review duplicate listing records")]
#[command(version)]
struct Cli {
    /// JSON file holding an array of records
    input: PathBuf,

    /// Configuration file (TOML, or JSON with a .json extension)
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    /// Override the fuzzy acceptance threshold (0-100)
    #[arg(long)]
    threshold: Option<f64>,

    /// Override the candidate blocking strategy
    #[arg(long)]
    blocking: Option<Blocking>,

    /// Abort the pass after this many seconds
    #[arg(long, value_name = "SECS")]
    timeout_secs: Option<u64>,

    /// Output file (omit for stdout)
    #[arg(long, short = 'o')]
    output: Option<PathBuf>,
}

#[derive(Clone, Copy, ValueEnum)]
enum Blocking {
    None,
    SharedNameToken,
    SameCity,
}

impl From<Blocking> for BlockingStrategy {
    fn from(value: Blocking) -> Self {
        match value {
            Blocking::None => BlockingStrategy::None,
            Blocking::SharedNameToken => BlockingStrategy::SharedNameToken,
            Blocking::SameCity => BlockingStrategy::SameCity,
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Logs go to stderr so stdout stays valid JSON
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => DeduplicationConfig::from_file(path)?,
        None => DeduplicationConfig::default(),
    };
    if let Some(threshold) = cli.threshold {
        config.acceptance_threshold = threshold;
    }
    if let Some(blocking) = cli.blocking {
        config.blocking = blocking.into();
    }

    let engine = DeduplicationEngine::new(config)?;
    let records: Vec<Record> = serde_json::from_str(&fs::read_to_string(&cli.input)?)?;

    let budget = match cli.timeout_secs {
        Some(secs) => Budget::with_timeout(Duration::from_secs(secs)),
        None => Budget::unlimited(),
    };
    let outcome = engine.deduplicate_within(records, &budget)?;
    let json = serde_json::to_string_pretty(&outcome)?;

    match &cli.output {
        Some(path) => fs::write(path, json)?,
        None => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(json.as_bytes())?;
            stdout.write_all(b"\n")?;
        }
    }

    Ok(())
}
