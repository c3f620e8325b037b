//! Source-to-table pipeline
//!
//! One run fetches a source's records and loads them in a single write.
//! Sources never share state, so a failed run leaves other sources alone.

use std::path::{Path, PathBuf};
use tracing::info;

use crate::error::Result;
use crate::models::{LoadMode, LoadOutcome, RawRecord};
use crate::sources::DocumentSource;
use crate::writer::TableWriter;

/// Options for a single source run
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub mode: LoadMode,
    /// Directory receiving a JSON copy of the fetched records
    pub dump_dir: Option<PathBuf>,
}

/// Fetch records from `source` and load them with `mode`
pub async fn run_source(
    source: &dyn DocumentSource,
    writer: &TableWriter,
    mode: LoadMode,
) -> Result<LoadOutcome> {
    let options = RunOptions {
        mode,
        dump_dir: None,
    };
    run_source_with(source, writer, &options).await
}

pub async fn run_source_with(
    source: &dyn DocumentSource,
    writer: &TableWriter,
    options: &RunOptions,
) -> Result<LoadOutcome> {
    let name = source.source_name().to_string();
    info!(source = %name, "Fetching records");

    let records = source.fetch_records().await?;
    info!(source = %name, count = records.len(), "Fetched {} records", records.len());

    if let Some(dir) = &options.dump_dir {
        let path = dump_records(dir, &name, &records).await?;
        info!(source = %name, path = %path.display(), "Wrote raw records");
    }

    writer.load_with_mode(records, &name, options.mode).await
}

/// Write `records` as pretty JSON to `<dir>/<source>.json`
pub async fn dump_records(dir: &Path, source: &str, records: &[RawRecord]) -> Result<PathBuf> {
    tokio::fs::create_dir_all(dir).await?;
    let path = dir.join(format!("{}.json", source));
    let json = serde_json::to_vec_pretty(records)?;
    tokio::fs::write(&path, json).await?;
    Ok(path)
}

/// Read a JSON array of records written by [`dump_records`] or by hand
pub async fn read_records(path: &Path) -> Result<Vec<RawRecord>> {
    let text = tokio::fs::read_to_string(path).await?;
    RawRecord::list_from_json(&text)
}
