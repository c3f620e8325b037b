//! medref Ingest - medical reference ingestion tool

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use medref_common::config::load_dotenv;
use medref_common::logging::{init_logging, LogConfig, LogLevel};
use medref_ingest::config::{parse_field_list, IngestConfig};
use medref_ingest::models::{LoadMode, LoadOutcome};
use medref_ingest::pipeline::{read_records, run_source_with, RunOptions};
use medref_ingest::sources::{DocumentSource, MedlinePlusSource, OpenFdaSource};
use medref_ingest::storage::{DocumentTable, InMemoryDocumentTable, PgDocumentTable};
use medref_ingest::writer::TableWriter;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "medref-ingest")]
#[command(author, version, about = "Medical reference ingestion tool")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// How each source's rows are written
    #[arg(long, global = true, default_value = "overwrite", value_parser = parse_mode)]
    mode: LoadMode,

    /// Write fetched records as JSON into this directory before loading
    #[arg(long, global = true)]
    dump: Option<PathBuf>,

    /// Load into an in-memory table instead of PostgreSQL
    #[arg(long, global = true)]
    dry_run: bool,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create the destination table if it does not exist
    InitTable,

    /// Ingest MedlinePlus health topics
    Medlineplus,

    /// Ingest openFDA drug labels
    Openfda {
        /// Maximum number of pages to request
        #[arg(long, env = "OPENFDA_MAX_PAGES")]
        max_pages: Option<usize>,

        /// Results per page
        #[arg(long, env = "OPENFDA_PAGE_SIZE")]
        page_size: Option<usize>,

        /// Search expression
        #[arg(long, env = "OPENFDA_SEARCH")]
        search: Option<String>,

        /// Comma-separated label sections joined into the document text
        #[arg(long, env = "OPENFDA_FIELDS")]
        fields: Option<String>,
    },

    /// Ingest every source in turn
    All,

    /// Load a JSON array of raw records for one source
    LoadJson {
        /// JSON file holding the records
        file: PathBuf,

        /// Source tag for the loaded rows
        #[arg(long)]
        source: String,
    },
}

fn parse_mode(value: &str) -> std::result::Result<LoadMode, String> {
    value.parse().map_err(|e: medref_ingest::IngestError| e.to_string())
}

async fn open_table(config: &IngestConfig, dry_run: bool) -> Result<Arc<dyn DocumentTable>> {
    if dry_run {
        info!("Dry run: loading into an in-memory table");
        return Ok(Arc::new(InMemoryDocumentTable::new(
            config.database.table.qualified(),
        )));
    }

    let table = PgDocumentTable::connect(&config.database)
        .await
        .with_context(|| format!("Failed to connect to {}", config.database.url))?;
    Ok(Arc::new(table))
}

async fn ingest(
    source: &dyn DocumentSource,
    writer: &TableWriter,
    options: &RunOptions,
) -> Result<LoadOutcome> {
    writer.ensure_table_exists().await?;
    let outcome = run_source_with(source, writer, options)
        .await
        .with_context(|| format!("Ingestion failed for source {}", source.source_name()))?;
    Ok(outcome)
}

fn report(outcome: &LoadOutcome) {
    match outcome {
        LoadOutcome::Skipped { source } => println!("{}: no records, table left unchanged", source),
        LoadOutcome::Written { source, rows, mode } => {
            println!("{}: {} rows written ({:?})", source, rows, mode)
        },
    }
}

async fn print_counts(table: &dyn DocumentTable) -> Result<()> {
    for (source, count) in table.count_by_source().await? {
        println!("{} {}: {} rows", table.table_name(), source, count);
    }
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    load_dotenv();
    let cli = Cli::parse();

    let mut log_config = LogConfig::from_env()?.with_file_prefix("medref-ingest");
    if cli.verbose {
        log_config = log_config.with_level(LogLevel::Debug);
    }
    let _guard = init_logging(&log_config)?;

    let mut config = IngestConfig::from_env()?;
    let options = RunOptions {
        mode: cli.mode,
        dump_dir: cli.dump.clone(),
    };

    let table = open_table(&config, cli.dry_run).await?;
    let writer = TableWriter::new(table.clone());

    match cli.command {
        Command::InitTable => {
            writer.ensure_table_exists().await?;
            info!("Table {} is ready", table.table_name());
        },
        Command::Medlineplus => {
            let source = MedlinePlusSource::new(config.medlineplus)?;
            report(&ingest(&source, &writer, &options).await?);
        },
        Command::Openfda {
            max_pages,
            page_size,
            search,
            fields,
        } => {
            if let Some(max_pages) = max_pages {
                config.openfda.max_pages = max_pages;
            }
            if let Some(page_size) = page_size {
                config.openfda.page_size = page_size;
            }
            if let Some(search) = search {
                config.openfda.search = search;
            }
            if let Some(fields) = fields {
                config.openfda.fields = parse_field_list(&fields);
            }

            let source = OpenFdaSource::new(config.openfda)?;
            report(&ingest(&source, &writer, &options).await?);
        },
        Command::All => {
            let sources: Vec<Box<dyn DocumentSource>> = vec![
                Box::new(MedlinePlusSource::new(config.medlineplus)?),
                Box::new(OpenFdaSource::new(config.openfda)?),
            ];

            let mut failed = Vec::new();
            for source in &sources {
                match ingest(source.as_ref(), &writer, &options).await {
                    Ok(outcome) => report(&outcome),
                    Err(e) => {
                        error!("{:#}", e);
                        failed.push(source.source_name().to_string());
                    },
                }
            }

            if !failed.is_empty() {
                anyhow::bail!("Ingestion failed for: {}", failed.join(", "));
            }
        },
        Command::LoadJson { file, source } => {
            let records = read_records(&file)
                .await
                .with_context(|| format!("Failed to read records from {}", file.display()))?;
            info!("Read {} records from {}", records.len(), file.display());

            writer.ensure_table_exists().await?;
            report(&writer.load_with_mode(records, &source, cli.mode).await?);
        },
    }

    if cli.dry_run {
        print_counts(table.as_ref()).await?;
    }

    info!("Ingestion complete");
    Ok(())
}
