//! Destination table backends
//!
//! [`PgDocumentTable`] writes to PostgreSQL; [`InMemoryDocumentTable`] keeps
//! rows in process for dry runs and tests. Both replace a source's slice in
//! one step so readers never observe a half-written source.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use std::collections::BTreeMap;

use crate::error::{IngestError, Result};
use crate::models::DocumentRow;

pub use memory::InMemoryDocumentTable;
pub use postgres::PgDocumentTable;

/// Rows inserted per statement
pub const DEFAULT_BATCH_SIZE: usize = 500;

/// A table holding documents partitioned by `source`
#[async_trait]
pub trait DocumentTable: Send + Sync {
    /// Name used in log messages
    fn table_name(&self) -> String;

    /// Create the table with the fixed column set if it does not exist
    async fn ensure_table_exists(&self) -> Result<()>;

    /// Add rows without removing any existing ones
    async fn append(&self, rows: &[DocumentRow]) -> Result<usize>;

    /// Atomically replace every row whose `source` equals `source`
    async fn overwrite_source(&self, rows: &[DocumentRow], source: &str) -> Result<usize>;

    /// Row count per source
    async fn count_by_source(&self) -> Result<BTreeMap<String, i64>>;
}

/// Every row handed to `overwrite_source` must belong to the slice being replaced
pub(crate) fn check_rows_match_source(rows: &[DocumentRow], source: &str) -> Result<()> {
    match rows.iter().find(|row| row.source != source) {
        Some(row) => Err(IngestError::Schema(format!(
            "row {} has source {} but the {} slice is being replaced",
            row.doc_id, row.source, source
        ))),
        None => Ok(()),
    }
}
