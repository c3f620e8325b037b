//! Table writer behaviour against the in-memory table

#![allow(clippy::unwrap_used, clippy::expect_used)]

use async_trait::async_trait;
use medref_ingest::models::{LoadMode, LoadOutcome, RawRecord, StandardDocument, SynonymField};
use medref_ingest::pipeline::{run_source, run_source_with, RunOptions};
use medref_ingest::sources::DocumentSource;
use medref_ingest::storage::{DocumentTable, InMemoryDocumentTable};
use medref_ingest::writer::TableWriter;
use medref_ingest::{IngestError, Result};
use serde_json::json;
use std::sync::Arc;

fn record(id: &str, title: &str, synonyms: Option<&str>) -> RawRecord {
    RawRecord {
        doc_id: Some(id.to_string()),
        category: Some("drug".to_string()),
        title: Some(title.to_string()),
        synonyms: synonyms.map(SynonymField::from),
        ..RawRecord::default()
    }
}

async fn setup() -> (Arc<InMemoryDocumentTable>, TableWriter) {
    let table = Arc::new(InMemoryDocumentTable::new("med.raw_data"));
    let writer = TableWriter::new(table.clone());
    writer.ensure_table_exists().await.unwrap();
    (table, writer)
}

async fn snapshot(table: &InMemoryDocumentTable, source: &str) -> Vec<StandardDocument> {
    let mut docs: Vec<_> = table
        .rows_for_source(source)
        .await
        .iter()
        .map(|row| row.without_timestamp())
        .collect();
    docs.sort_by(|a, b| a.doc_id.cmp(&b.doc_id));
    docs
}

/// A source returning a fixed batch
struct StaticSource {
    name: &'static str,
    records: Vec<RawRecord>,
}

#[async_trait]
impl DocumentSource for StaticSource {
    fn source_name(&self) -> &str {
        self.name
    }

    async fn fetch_records(&self) -> Result<Vec<RawRecord>> {
        Ok(self.records.clone())
    }
}

// ============================================================================
// Load Tests
// ============================================================================

#[tokio::test]
async fn test_loading_zero_records_performs_no_write() {
    let (table, writer) = setup().await;
    writer
        .load(vec![record("openfda_1", "Advil", None)], "openfda")
        .await
        .unwrap();

    let outcome = writer.load(Vec::new(), "openfda").await.unwrap();

    assert_eq!(
        outcome,
        LoadOutcome::Skipped {
            source: "openfda".to_string()
        }
    );
    assert_eq!(outcome.rows(), 0);
    assert_eq!(table.write_count().await, 1);
    assert_eq!(table.rows_for_source("openfda").await.len(), 1);
}

#[tokio::test]
async fn test_empty_load_does_not_need_table() {
    let table = Arc::new(InMemoryDocumentTable::default());
    let writer = TableWriter::new(table.clone());

    let outcome = writer.load(Vec::new(), "medlineplus").await.unwrap();
    assert_eq!(outcome.rows(), 0);
    assert!(!table.exists().await);
}

#[tokio::test]
async fn test_load_normalizes_synonyms_and_stamps_rows() {
    let (table, writer) = setup().await;

    let outcome = writer
        .load(vec![record("openfda_1", "Advil", Some("Advil; ibuprofen,IBU"))], "openfda")
        .await
        .unwrap();
    assert_eq!(outcome.rows(), 1);

    let rows = table.rows().await;
    assert_eq!(rows[0].source, "openfda");
    assert_eq!(
        rows[0].synonyms,
        Some(vec!["Advil".to_string(), "ibuprofen".to_string(), "IBU".to_string()])
    );
}

#[tokio::test]
async fn test_overwrite_twice_is_idempotent() {
    let (table, writer) = setup().await;
    let batch = vec![
        record("openfda_1", "Advil", Some("Advil; ibuprofen")),
        record("openfda_2", "Tylenol", None),
    ];

    writer.load(batch.clone(), "openfda").await.unwrap();
    let first = snapshot(&table, "openfda").await;

    writer.load(batch, "openfda").await.unwrap();
    let second = snapshot(&table, "openfda").await;

    assert_eq!(first, second);
    assert_eq!(table.rows().await.len(), 2);
}

#[tokio::test]
async fn test_overwrite_leaves_other_sources_untouched() {
    let (table, writer) = setup().await;
    writer
        .load(vec![record("medline_1", "Asthma", None)], "medlineplus")
        .await
        .unwrap();
    let medline_before = snapshot(&table, "medlineplus").await;

    writer
        .load(vec![record("openfda_1", "Advil", None)], "openfda")
        .await
        .unwrap();
    writer
        .load(vec![record("openfda_2", "Aleve", None)], "openfda")
        .await
        .unwrap();

    assert_eq!(snapshot(&table, "medlineplus").await, medline_before);
    let openfda = snapshot(&table, "openfda").await;
    assert_eq!(openfda.len(), 1);
    assert_eq!(openfda[0].doc_id.as_deref(), Some("openfda_2"));
}

#[tokio::test]
async fn test_schema_violation_writes_nothing() {
    let (table, writer) = setup().await;
    writer
        .load(vec![record("openfda_1", "Advil", None)], "openfda")
        .await
        .unwrap();

    let mut nested = record("openfda_3", "Bad", None);
    nested.synonyms = Some(SynonymField::Sequence(vec![json!(["nested"])]));
    let missing_id = RawRecord {
        title: Some("No id".to_string()),
        ..RawRecord::default()
    };

    for bad_batch in [
        vec![record("openfda_2", "Aleve", None), missing_id],
        vec![nested],
        vec![record("openfda_4", "A", None), record("openfda_4", "B", None)],
    ] {
        let err = writer.load(bad_batch, "openfda").await.unwrap_err();
        assert!(matches!(err, IngestError::Schema(_)), "unexpected error: {err}");
    }

    assert_eq!(table.write_count().await, 1);
    let rows = snapshot(&table, "openfda").await;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].doc_id.as_deref(), Some("openfda_1"));
}

#[tokio::test]
async fn test_append_mode_keeps_existing_rows() {
    let (table, writer) = setup().await;
    writer
        .load_with_mode(vec![record("openfda_1", "Advil", None)], "openfda", LoadMode::Append)
        .await
        .unwrap();
    let outcome = writer
        .load_with_mode(vec![record("openfda_2", "Aleve", None)], "openfda", LoadMode::Append)
        .await
        .unwrap();

    assert!(matches!(outcome, LoadOutcome::Written { mode: LoadMode::Append, rows: 1, .. }));
    assert_eq!(table.count_by_source().await.unwrap().get("openfda"), Some(&2));
}

#[tokio::test]
async fn test_append_mode_rejects_stored_key() {
    let (table, writer) = setup().await;
    writer
        .load_with_mode(vec![record("openfda_1", "Advil", None)], "openfda", LoadMode::Append)
        .await
        .unwrap();

    let err = writer
        .load_with_mode(
            vec![record("openfda_2", "Aleve", None), record("openfda_1", "Advil", None)],
            "openfda",
            LoadMode::Append,
        )
        .await
        .unwrap_err();

    assert!(matches!(err, IngestError::DuplicateKey(_)), "unexpected error: {err}");
    assert_eq!(table.write_count().await, 1);
    assert_eq!(snapshot(&table, "openfda").await.len(), 1);
}

// ============================================================================
// Pipeline Tests
// ============================================================================

#[tokio::test]
async fn test_run_source_loads_under_source_name() {
    let (table, writer) = setup().await;
    let source = StaticSource {
        name: "medlineplus",
        records: vec![
            record("medline_1", "Asthma", Some("Bronchial asthma")),
            record("medline_2", "Flu", None),
        ],
    };

    let outcome = run_source(&source, &writer, LoadMode::Overwrite).await.unwrap();
    assert_eq!(outcome.rows(), 2);
    assert_eq!(table.count_by_source().await.unwrap().get("medlineplus"), Some(&2));
}

#[tokio::test]
async fn test_run_source_with_empty_source_is_skipped() {
    let (table, writer) = setup().await;
    let source = StaticSource {
        name: "openfda",
        records: Vec::new(),
    };

    let outcome = run_source(&source, &writer, LoadMode::Overwrite).await.unwrap();
    assert!(matches!(outcome, LoadOutcome::Skipped { .. }));
    assert_eq!(table.write_count().await, 0);
}

#[tokio::test]
async fn test_dumped_records_reload_identically() {
    let dir = tempfile::tempdir().unwrap();
    let (table, writer) = setup().await;
    let source = StaticSource {
        name: "openfda",
        records: vec![
            record("openfda_1", "Advil", Some("Advil; ibuprofen")),
            record("openfda_2", "Tylenol", None),
        ],
    };

    let options = RunOptions {
        mode: LoadMode::Overwrite,
        dump_dir: Some(dir.path().to_path_buf()),
    };
    run_source_with(&source, &writer, &options).await.unwrap();
    let loaded = snapshot(&table, "openfda").await;

    let dumped = medref_ingest::pipeline::read_records(&dir.path().join("openfda.json"))
        .await
        .unwrap();
    assert_eq!(dumped, source.records);

    writer.load(dumped, "openfda").await.unwrap();
    assert_eq!(snapshot(&table, "openfda").await, loaded);
}
