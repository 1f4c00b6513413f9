//! Ontology Discovery CLI
//!
//! Connects to a database or a set of data files, discovers the ontology and
//! writes it as JSON. A human-readable summary is printed to stdout; logs go to
//! stderr.

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use std::path::PathBuf;
use term_ontology::config::DiscoveryConfig;
use term_ontology::discovery::assembler::discover_ontology;
use term_ontology::logging::setup::{init_logging, LoggingConfig};
use term_ontology::report::{OntologyFormatter, SummaryFormatter};
use term_ontology::sources::{EngineKind, SourceConfig};
use tracing::info;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Engine family of the source
    #[arg(long, value_enum)]
    engine: EngineKind,

    /// SQLite database path, PostgreSQL URL, or a directory / glob of CSV or
    /// Parquet files
    #[arg(long)]
    connection: String,

    /// Catalog to activate before reflection (PostgreSQL: must match the
    /// database in the URL)
    #[arg(long)]
    catalog: Option<String>,

    /// Database or schema to activate before reflection (PostgreSQL: schema)
    #[arg(long)]
    database: Option<String>,

    /// Where the ontology document is written
    #[arg(long, default_value = "discovered_ontology.json")]
    output: PathBuf,

    /// Only include these tables
    #[arg(long, value_delimiter = ',')]
    tables: Vec<String>,

    /// JSON file with discovery settings
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log discovery details
    #[arg(short, long)]
    verbose: bool,

    /// Emit logs as JSON
    #[arg(long)]
    log_json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let logging = if args.verbose {
        LoggingConfig::development()
    } else {
        LoggingConfig::default()
    };
    init_logging(logging.with_json_format(args.log_json))
        .map_err(|e| anyhow!("failed to initialize logging: {e}"))?;

    let config = match &args.config {
        Some(path) => DiscoveryConfig::from_json_file(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => DiscoveryConfig::default(),
    };

    let mut source = SourceConfig::new(args.engine, args.connection).with_tables(args.tables);
    source.catalog = args.catalog;
    source.database = args.database;

    info!(
        engine = %source.engine,
        catalog = source.catalog.as_deref().unwrap_or("-"),
        database = source.database.as_deref().unwrap_or("-"),
        tables = source.include_tables.len(),
        "Starting ontology discovery"
    );

    let document = discover_ontology(&source, &config)
        .await
        .context("ontology discovery failed")?;

    document
        .write_to(&args.output)
        .with_context(|| format!("failed to write {}", args.output.display()))?;

    print!("{}", SummaryFormatter::new().format(&document)?);
    println!();
    println!("Saved ontology to '{}'", args.output.display());
    Ok(())
}
