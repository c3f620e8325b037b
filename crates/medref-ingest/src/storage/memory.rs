// In-memory document table

use async_trait::async_trait;
use std::collections::{BTreeMap, HashSet};
use tokio::sync::Mutex;
use tracing::debug;

use super::{check_rows_match_source, DocumentTable};
use crate::error::{IngestError, Result};
use crate::models::DocumentRow;

#[derive(Debug, Default)]
struct State {
    created: bool,
    rows: Vec<DocumentRow>,
    writes: usize,
}

/// Process-local table used for dry runs and tests
#[derive(Debug)]
pub struct InMemoryDocumentTable {
    name: String,
    state: Mutex<State>,
}

impl Default for InMemoryDocumentTable {
    fn default() -> Self {
        Self::new("memory")
    }
}

impl InMemoryDocumentTable {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: Mutex::new(State::default()),
        }
    }

    /// Snapshot of every stored row in insertion order
    pub async fn rows(&self) -> Vec<DocumentRow> {
        self.state.lock().await.rows.clone()
    }

    /// Rows belonging to one source
    pub async fn rows_for_source(&self, source: &str) -> Vec<DocumentRow> {
        self.state
            .lock()
            .await
            .rows
            .iter()
            .filter(|row| row.source == source)
            .cloned()
            .collect()
    }

    /// Number of append/overwrite calls that reached the table
    pub async fn write_count(&self) -> usize {
        self.state.lock().await.writes
    }

    pub async fn exists(&self) -> bool {
        self.state.lock().await.created
    }

    fn require_created(&self, state: &State) -> Result<()> {
        if state.created {
            Ok(())
        } else {
            Err(IngestError::TableMissing(self.name.clone()))
        }
    }
}

/// Reject rows whose `(source, doc_id)` is already stored or repeats in the batch
fn check_unique_keys(stored: &[DocumentRow], rows: &[DocumentRow]) -> Result<()> {
    let mut keys: HashSet<(&str, &str)> = stored
        .iter()
        .map(|row| (row.source.as_str(), row.doc_id.as_str()))
        .collect();

    for row in rows {
        if !keys.insert((row.source.as_str(), row.doc_id.as_str())) {
            return Err(IngestError::DuplicateKey(format!(
                "(source, doc_id)=({}, {}) already exists",
                row.source, row.doc_id
            )));
        }
    }
    Ok(())
}

#[async_trait]
impl DocumentTable for InMemoryDocumentTable {
    fn table_name(&self) -> String {
        self.name.clone()
    }

    async fn ensure_table_exists(&self) -> Result<()> {
        self.state.lock().await.created = true;
        Ok(())
    }

    async fn append(&self, rows: &[DocumentRow]) -> Result<usize> {
        let mut state = self.state.lock().await;
        self.require_created(&state)?;
        check_unique_keys(&state.rows, rows)?;

        state.rows.extend_from_slice(rows);
        state.writes += 1;
        debug!(table = %self.name, appended = rows.len(), "Appended rows");
        Ok(rows.len())
    }

    async fn overwrite_source(&self, rows: &[DocumentRow], source: &str) -> Result<usize> {
        check_rows_match_source(rows, source)?;

        let mut state = self.state.lock().await;
        self.require_created(&state)?;
        check_unique_keys(&[], rows)?;

        state.rows.retain(|row| row.source != source);
        state.rows.extend_from_slice(rows);
        state.writes += 1;
        debug!(table = %self.name, source, stored = rows.len(), "Replaced source slice");
        Ok(rows.len())
    }

    async fn count_by_source(&self) -> Result<BTreeMap<String, i64>> {
        let state = self.state.lock().await;
        let mut counts = BTreeMap::new();
        for row in &state.rows {
            *counts.entry(row.source.clone()).or_insert(0) += 1;
        }
        Ok(counts)
    }
}
