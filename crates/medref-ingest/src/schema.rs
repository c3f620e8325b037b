//! Fixed destination schema and typed row construction
//!
//! Rows are built for a whole batch before anything is written, so a single
//! malformed record fails the load for its source without a partial write.

use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::HashSet;

use crate::error::{IngestError, Result};
use crate::models::{DocumentRow, RawRecord, SynonymField};
use crate::normalize::standardize;

/// Destination columns and their SQL types, in table order
pub const TABLE_COLUMNS: [(&str, &str); 9] = [
    ("doc_id", "TEXT NOT NULL"),
    ("category", "TEXT"),
    ("source", "TEXT NOT NULL"),
    ("title", "TEXT"),
    ("synonyms", "TEXT[]"),
    ("url", "TEXT"),
    ("raw_text", "TEXT"),
    ("meta_json", "TEXT"),
    ("ingested_at", "TIMESTAMPTZ NOT NULL"),
];

/// Reject synonym sequences holding nested arrays or objects
fn check_synonyms(index: usize, record: &RawRecord) -> Result<()> {
    if let Some(SynonymField::Sequence(values)) = &record.synonyms {
        if let Some(bad) = values.iter().find(|v| matches!(v, Value::Array(_) | Value::Object(_))) {
            return Err(IngestError::Schema(format!(
                "record {} ({:?}): synonym element {} is not a scalar",
                index, record.doc_id, bad
            )));
        }
    }
    Ok(())
}

/// Build typed rows for one source from raw adapter records
///
/// Every record is normalized, stamped with `ingested_at` and checked against
/// the fixed schema: `doc_id` must be present and unique within the batch and
/// synonym elements must be scalars.
pub fn build_rows(
    records: Vec<RawRecord>,
    source_value: &str,
    ingested_at: DateTime<Utc>,
) -> Result<Vec<DocumentRow>> {
    for (index, record) in records.iter().enumerate() {
        check_synonyms(index, record)?;
    }

    let mut seen = HashSet::new();
    let mut rows = Vec::with_capacity(records.len());

    for doc in standardize(records, source_value) {
        let row = DocumentRow::from_standard(doc, ingested_at)?;
        if !seen.insert(row.doc_id.clone()) {
            return Err(IngestError::Schema(format!(
                "duplicate doc_id {} for source {}",
                row.doc_id, source_value
            )));
        }
        rows.push(row);
    }

    Ok(rows)
}
