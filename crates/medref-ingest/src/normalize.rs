//! Document normalizer
//!
//! The single place that turns adapter output into the canonical column set.
//! Adapters stay free to emit whatever shape is natural for their upstream
//! format (a delimited synonym string, a list, missing fields) and the writer
//! only ever sees [`StandardDocument`]s.

use serde_json::Value;

use crate::models::{RawRecord, StandardDocument, SynonymField};

/// Coerce a synonym field into an ordered list of strings
///
/// - absent: `None`
/// - a sequence: each element as a string (`null` elements are dropped,
///   non-string scalars use their JSON text)
/// - a scalar string: `;` is treated as `,`, the string is split on `,` and
///   each element is trimmed
pub fn coerce_synonyms(field: Option<SynonymField>) -> Option<Vec<String>> {
    match field? {
        SynonymField::Sequence(values) => Some(
            values
                .into_iter()
                .filter_map(|value| match value {
                    Value::Null => None,
                    Value::String(s) => Some(s),
                    other => Some(other.to_string()),
                })
                .collect(),
        ),
        SynonymField::Delimited(text) => Some(
            text.replace(';', ",")
                .split(',')
                .map(|part| part.trim().to_string())
                .collect(),
        ),
    }
}

/// Project one record onto the fixed column order and tag it with its source
pub fn standardize_record(record: RawRecord, source_value: &str) -> StandardDocument {
    StandardDocument {
        doc_id: record.doc_id,
        category: record.category,
        title: record.title,
        synonyms: coerce_synonyms(record.synonyms),
        url: record.url,
        raw_text: record.raw_text,
        meta_json: record.meta_json,
        source: source_value.to_string(),
    }
}

/// Normalize a batch of adapter records for `source_value`
///
/// The ingestion timestamp is left to the writer.
pub fn standardize(records: Vec<RawRecord>, source_value: &str) -> Vec<StandardDocument> {
    records
        .into_iter()
        .map(|record| standardize_record(record, source_value))
        .collect()
}
