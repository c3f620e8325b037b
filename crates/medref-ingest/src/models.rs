//! Record shapes flowing from source adapters to the destination table
//!
//! - [`RawRecord`]: what an adapter emits; every field may be absent
//! - [`StandardDocument`]: the normalizer's fixed projection plus the source tag
//! - [`DocumentRow`]: a typed table row stamped with its ingestion time

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{IngestError, Result};

/// Category tag for health-topic documents
pub const CATEGORY_CONDITION: &str = "condition";

/// Category tag for drug-label documents
pub const CATEGORY_DRUG: &str = "drug";

/// The seven logical fields every record exposes, in output order
pub const LOGICAL_FIELDS: [&str; 7] = [
    "doc_id",
    "category",
    "title",
    "synonyms",
    "url",
    "raw_text",
    "meta_json",
];

/// Synonyms as an adapter supplies them
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SynonymField {
    /// A single string using `;` and/or `,` as delimiters
    Delimited(String),
    /// Already split; elements are coerced to strings during normalization
    Sequence(Vec<serde_json::Value>),
}

impl From<&str> for SynonymField {
    fn from(value: &str) -> Self {
        SynonymField::Delimited(value.to_string())
    }
}

impl From<Vec<String>> for SynonymField {
    fn from(values: Vec<String>) -> Self {
        SynonymField::Sequence(values.into_iter().map(serde_json::Value::String).collect())
    }
}

/// A flat record produced by a source adapter
///
/// Serializing a record always emits all seven logical keys, with `null` for
/// absent values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawRecord {
    pub doc_id: Option<String>,
    pub category: Option<String>,
    pub title: Option<String>,
    pub synonyms: Option<SynonymField>,
    pub url: Option<String>,
    pub raw_text: Option<String>,
    pub meta_json: Option<String>,
}

impl RawRecord {
    /// Build a record from a JSON object, rejecting unknown keys and mistyped values
    pub fn from_json(value: serde_json::Value) -> Result<Self> {
        serde_json::from_value(value).map_err(|e| IngestError::Schema(e.to_string()))
    }

    /// Parse a JSON array of records, e.g. a saved adapter dump
    pub fn list_from_json(text: &str) -> Result<Vec<Self>> {
        let values: Vec<serde_json::Value> = serde_json::from_str(text)?;
        values
            .into_iter()
            .enumerate()
            .map(|(i, v)| {
                Self::from_json(v)
                    .map_err(|e| IngestError::Schema(format!("record {}: {}", i, e)))
            })
            .collect()
    }
}

/// A record after column enforcement and synonym coercion
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StandardDocument {
    pub doc_id: Option<String>,
    pub category: Option<String>,
    pub title: Option<String>,
    pub synonyms: Option<Vec<String>>,
    pub url: Option<String>,
    pub raw_text: Option<String>,
    pub meta_json: Option<String>,
    pub source: String,
}

impl From<StandardDocument> for RawRecord {
    fn from(doc: StandardDocument) -> Self {
        RawRecord {
            doc_id: doc.doc_id,
            category: doc.category,
            title: doc.title,
            synonyms: doc.synonyms.map(SynonymField::from),
            url: doc.url,
            raw_text: doc.raw_text,
            meta_json: doc.meta_json,
        }
    }
}

/// One row of the destination table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentRow {
    pub doc_id: String,
    pub category: Option<String>,
    pub source: String,
    pub title: Option<String>,
    pub synonyms: Option<Vec<String>>,
    pub url: Option<String>,
    pub raw_text: Option<String>,
    pub meta_json: Option<String>,
    pub ingested_at: DateTime<Utc>,
}

impl DocumentRow {
    /// Stamp a standardized document; `doc_id` is the only non-nullable column
    pub fn from_standard(doc: StandardDocument, ingested_at: DateTime<Utc>) -> Result<Self> {
        let doc_id = match doc.doc_id {
            Some(id) if !id.trim().is_empty() => id,
            _ => {
                return Err(IngestError::Schema(format!(
                    "doc_id is required (source {}, title {:?})",
                    doc.source, doc.title
                )))
            },
        };

        Ok(Self {
            doc_id,
            category: doc.category,
            source: doc.source,
            title: doc.title,
            synonyms: doc.synonyms,
            url: doc.url,
            raw_text: doc.raw_text,
            meta_json: doc.meta_json,
            ingested_at,
        })
    }

    /// The row with its timestamp removed, for comparing table states
    pub fn without_timestamp(&self) -> StandardDocument {
        StandardDocument {
            doc_id: Some(self.doc_id.clone()),
            category: self.category.clone(),
            title: self.title.clone(),
            synonyms: self.synonyms.clone(),
            url: self.url.clone(),
            raw_text: self.raw_text.clone(),
            meta_json: self.meta_json.clone(),
            source: self.source.clone(),
        }
    }
}

/// How a batch is written to the destination table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadMode {
    /// Replace the source's slice
    #[default]
    Overwrite,
    /// Add rows without removing any, for first-time bulk loads
    Append,
}

impl std::str::FromStr for LoadMode {
    type Err = IngestError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "overwrite" => Ok(LoadMode::Overwrite),
            "append" => Ok(LoadMode::Append),
            _ => Err(IngestError::Parse(format!("Invalid load mode: {}", s))),
        }
    }
}

/// Result of loading one source's records
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum LoadOutcome {
    /// No records were supplied; the table was not touched
    Skipped { source: String },
    /// The batch was written
    Written {
        source: String,
        rows: usize,
        mode: LoadMode,
    },
}

impl LoadOutcome {
    pub fn rows(&self) -> usize {
        match self {
            LoadOutcome::Skipped { .. } => 0,
            LoadOutcome::Written { rows, .. } => *rows,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_serialized_record_exposes_every_field() {
        let record = RawRecord {
            doc_id: Some("medline_1".to_string()),
            ..RawRecord::default()
        };
        let value = serde_json::to_value(&record).unwrap();
        let object = value.as_object().unwrap();

        assert_eq!(object.len(), LOGICAL_FIELDS.len());
        for field in LOGICAL_FIELDS {
            assert!(object.contains_key(field), "missing {}", field);
        }
        assert!(object["url"].is_null());
    }

    #[test]
    fn test_from_json_fills_absent_fields() {
        let record = RawRecord::from_json(json!({"doc_id": "x_1", "synonyms": "a; b"})).unwrap();
        assert_eq!(record.doc_id.as_deref(), Some("x_1"));
        assert_eq!(record.synonyms, Some(SynonymField::Delimited("a; b".to_string())));
        assert_eq!(record.title, None);
    }

    #[test]
    fn test_from_json_accepts_synonym_sequence() {
        let record = RawRecord::from_json(json!({"doc_id": "x_1", "synonyms": ["a", 2]})).unwrap();
        assert_eq!(
            record.synonyms,
            Some(SynonymField::Sequence(vec![json!("a"), json!(2)]))
        );
    }

    #[test]
    fn test_from_json_rejects_unknown_keys() {
        let err = RawRecord::from_json(json!({"doc_id": "x_1", "author": "nobody"})).unwrap_err();
        assert!(matches!(err, IngestError::Schema(_)));
    }

    #[test]
    fn test_from_json_rejects_mistyped_values() {
        let err = RawRecord::from_json(json!({"doc_id": 12})).unwrap_err();
        assert!(matches!(err, IngestError::Schema(_)));
    }

    #[test]
    fn test_row_requires_doc_id() {
        let doc = StandardDocument {
            doc_id: None,
            category: None,
            title: Some("Asthma".to_string()),
            synonyms: None,
            url: None,
            raw_text: None,
            meta_json: None,
            source: "medlineplus".to_string(),
        };
        let err = DocumentRow::from_standard(doc, Utc::now()).unwrap_err();
        assert!(matches!(err, IngestError::Schema(_)));
    }

    #[test]
    fn test_load_mode_from_str() {
        assert_eq!("APPEND".parse::<LoadMode>().unwrap(), LoadMode::Append);
        assert_eq!("overwrite".parse::<LoadMode>().unwrap(), LoadMode::Overwrite);
        assert!("merge".parse::<LoadMode>().is_err());
    }
}
