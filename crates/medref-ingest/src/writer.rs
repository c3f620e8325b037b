//! Table writer
//!
//! Turns adapter records into rows and hands them to a [`DocumentTable`].
//! Row construction finishes for the whole batch before the table is touched.

use chrono::Utc;
use std::sync::Arc;
use tracing::info;

use crate::error::Result;
use crate::models::{LoadMode, LoadOutcome, RawRecord};
use crate::schema::build_rows;
use crate::storage::DocumentTable;

pub struct TableWriter {
    table: Arc<dyn DocumentTable>,
}

impl TableWriter {
    pub fn new(table: Arc<dyn DocumentTable>) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &dyn DocumentTable {
        self.table.as_ref()
    }

    pub async fn ensure_table_exists(&self) -> Result<()> {
        self.table.ensure_table_exists().await
    }

    /// Replace `source_value`'s slice with `records`
    ///
    /// An empty batch is a no-op: the existing slice is left in place.
    pub async fn load(&self, records: Vec<RawRecord>, source_value: &str) -> Result<LoadOutcome> {
        self.load_with_mode(records, source_value, LoadMode::Overwrite)
            .await
    }

    pub async fn load_with_mode(
        &self,
        records: Vec<RawRecord>,
        source_value: &str,
        mode: LoadMode,
    ) -> Result<LoadOutcome> {
        if records.is_empty() {
            info!("No records to load for source {}", source_value);
            return Ok(LoadOutcome::Skipped {
                source: source_value.to_string(),
            });
        }

        let rows = build_rows(records, source_value, Utc::now())?;

        let written = match mode {
            LoadMode::Overwrite => self.table.overwrite_source(&rows, source_value).await?,
            LoadMode::Append => self.table.append(&rows).await?,
        };

        info!(
            source = source_value,
            rows = written,
            table = %self.table.table_name(),
            "Loaded {} rows for source {}",
            written,
            source_value
        );

        Ok(LoadOutcome::Written {
            source: source_value.to_string(),
            rows: written,
            mode,
        })
    }
}
