// PostgreSQL document table

use async_trait::async_trait;
use medref_common::config::{DatabaseConfig, TableName};
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Postgres, QueryBuilder, Row, Transaction};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, info};

use super::{check_rows_match_source, DocumentTable, DEFAULT_BATCH_SIZE};
use crate::error::{IngestError, Result};
use crate::models::DocumentRow;
use crate::schema::TABLE_COLUMNS;

/// SQLSTATE for `undefined_table`
const UNDEFINED_TABLE: &str = "42P01";
/// SQLSTATE for `unique_violation`
const UNIQUE_VIOLATION: &str = "23505";

/// Documents stored in a PostgreSQL table
pub struct PgDocumentTable {
    db: PgPool,
    table: TableName,
    batch_size: usize,
}

impl PgDocumentTable {
    pub fn new(db: PgPool, table: TableName) -> Self {
        Self {
            db,
            table,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    /// Create a table handle with a custom insert batch size
    pub fn with_batch_size(db: PgPool, table: TableName, batch_size: usize) -> Self {
        Self {
            db,
            table,
            batch_size: batch_size.max(1),
        }
    }

    /// Open a connection pool from configuration
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        config.validate()?;

        let db = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
            .connect(&config.url)
            .await?;

        debug!(table = %config.table, "Connected to PostgreSQL");
        Ok(Self::new(db, config.table.clone()))
    }

    pub fn pool(&self) -> &PgPool {
        &self.db
    }

    /// Statements creating the schema and table
    ///
    /// Lookups by source use the primary key, whose leading column is `source`.
    pub fn ddl(&self) -> Vec<String> {
        let columns = TABLE_COLUMNS
            .iter()
            .map(|(name, ty)| format!("{} {}", name, ty))
            .collect::<Vec<_>>()
            .join(",\n    ");

        let mut statements = Vec::new();
        if let Some(schema) = self.table.schema() {
            statements.push(format!("CREATE SCHEMA IF NOT EXISTS {}", schema));
        }
        statements.push(format!(
            "CREATE TABLE IF NOT EXISTS {} (\n    {},\n    PRIMARY KEY (source, doc_id)\n)",
            self.table, columns
        ));
        statements
    }

    /// Rows of one source ordered by `doc_id`
    pub async fn fetch_source(&self, source: &str) -> Result<Vec<DocumentRow>> {
        let sql = format!(
            "SELECT doc_id, category, source, title, synonyms, url, raw_text, meta_json, ingested_at \
             FROM {} WHERE source = $1 ORDER BY doc_id",
            self.table
        );

        let rows = sqlx::query(&sql)
            .bind(source)
            .fetch_all(&self.db)
            .await
            .map_err(|e| self.map_db_error(e))?;

        rows.into_iter()
            .map(|row| -> Result<DocumentRow> {
                Ok(DocumentRow {
                    doc_id: row.try_get("doc_id")?,
                    category: row.try_get("category")?,
                    source: row.try_get("source")?,
                    title: row.try_get("title")?,
                    synonyms: row.try_get("synonyms")?,
                    url: row.try_get("url")?,
                    raw_text: row.try_get("raw_text")?,
                    meta_json: row.try_get("meta_json")?,
                    ingested_at: row.try_get("ingested_at")?,
                })
            })
            .collect()
    }

    fn map_db_error(&self, err: sqlx::Error) -> IngestError {
        let code = err
            .as_database_error()
            .and_then(|db| db.code())
            .map(|code| code.into_owned());

        match code.as_deref() {
            Some(UNDEFINED_TABLE) => IngestError::TableMissing(self.table.qualified()),
            Some(UNIQUE_VIOLATION) => IngestError::DuplicateKey(conflict_detail(&err)),
            _ => IngestError::Database(err),
        }
    }

    async fn insert_all(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        rows: &[DocumentRow],
    ) -> Result<usize> {
        let total_chunks = rows.len().div_ceil(self.batch_size);
        let mut stored = 0;

        for (chunk_idx, chunk) in rows.chunks(self.batch_size).enumerate() {
            debug!(
                "Inserting chunk {} / {} ({} rows)",
                chunk_idx + 1,
                total_chunks,
                chunk.len()
            );
            self.batch_insert(tx, chunk).await?;
            stored += chunk.len();
        }

        Ok(stored)
    }

    async fn batch_insert(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        rows: &[DocumentRow],
    ) -> Result<()> {
        let mut query_builder: QueryBuilder<Postgres> = QueryBuilder::new(format!(
            "INSERT INTO {} (doc_id, category, source, title, synonyms, url, raw_text, meta_json, ingested_at) ",
            self.table
        ));

        query_builder.push_values(rows, |mut b, row| {
            b.push_bind(&row.doc_id)
                .push_bind(&row.category)
                .push_bind(&row.source)
                .push_bind(&row.title)
                .push_bind(&row.synonyms)
                .push_bind(&row.url)
                .push_bind(&row.raw_text)
                .push_bind(&row.meta_json)
                .push_bind(row.ingested_at);
        });

        query_builder
            .build()
            .execute(&mut **tx)
            .await
            .map_err(|e| self.map_db_error(e))?;

        Ok(())
    }
}

/// Conflicting key as reported by the server, e.g. `Key (source, doc_id)=(a, 1) already exists.`
fn conflict_detail(err: &sqlx::Error) -> String {
    match err.as_database_error() {
        Some(db) => db
            .try_downcast_ref::<sqlx::postgres::PgDatabaseError>()
            .and_then(|pg| pg.detail())
            .unwrap_or_else(|| db.message())
            .to_string(),
        None => err.to_string(),
    }
}

#[async_trait]
impl DocumentTable for PgDocumentTable {
    fn table_name(&self) -> String {
        self.table.qualified()
    }

    async fn ensure_table_exists(&self) -> Result<()> {
        for statement in self.ddl() {
            sqlx::query(&statement).execute(&self.db).await?;
        }
        info!(table = %self.table, "Destination table ready");
        Ok(())
    }

    async fn append(&self, rows: &[DocumentRow]) -> Result<usize> {
        info!("Appending {} rows to {}", rows.len(), self.table);

        let mut tx = self.db.begin().await?;
        let stored = self.insert_all(&mut tx, rows).await?;
        tx.commit().await?;

        Ok(stored)
    }

    async fn overwrite_source(&self, rows: &[DocumentRow], source: &str) -> Result<usize> {
        check_rows_match_source(rows, source)?;
        info!(
            "Replacing source {} in {} with {} rows",
            source,
            self.table,
            rows.len()
        );

        let mut tx = self.db.begin().await?;

        let deleted = sqlx::query(&format!("DELETE FROM {} WHERE source = $1", self.table))
            .bind(source)
            .execute(&mut *tx)
            .await
            .map_err(|e| self.map_db_error(e))?
            .rows_affected();

        let stored = self.insert_all(&mut tx, rows).await?;
        tx.commit().await?;

        info!(source, deleted, stored, "Source slice replaced");
        Ok(stored)
    }

    async fn count_by_source(&self) -> Result<BTreeMap<String, i64>> {
        let sql = format!(
            "SELECT source, COUNT(*) FROM {} GROUP BY source ORDER BY source",
            self.table
        );

        let counts: Vec<(String, i64)> = sqlx::query_as(&sql)
            .fetch_all(&self.db)
            .await
            .map_err(|e| self.map_db_error(e))?;

        Ok(counts.into_iter().collect())
    }
}
