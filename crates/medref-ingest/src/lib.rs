//! medref Ingest Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Ingests medical reference documents into one shared table.
//!
//! # Supported Data Sources
//!
//! - **MedlinePlus**: health topics from the compressed XML feed
//! - **openFDA**: drug labels from the label search API
//!
//! Each source implements [`sources::DocumentSource`]. Its records pass
//! through [`normalize::standardize`] and are written by
//! [`writer::TableWriter`], which replaces only that source's rows.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use medref_ingest::config::OpenFdaConfig;
//! use medref_ingest::models::LoadMode;
//! use medref_ingest::pipeline::run_source;
//! use medref_ingest::sources::OpenFdaSource;
//! use medref_ingest::storage::InMemoryDocumentTable;
//! use medref_ingest::writer::TableWriter;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> anyhow::Result<()> {
//!     let writer = TableWriter::new(Arc::new(InMemoryDocumentTable::default()));
//!     writer.ensure_table_exists().await?;
//!
//!     let source = OpenFdaSource::new(OpenFdaConfig::default())?;
//!     let outcome = run_source(&source, &writer, LoadMode::Overwrite).await?;
//!     println!("{} rows", outcome.rows());
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod models;
pub mod normalize;
pub mod pipeline;
pub mod schema;
pub mod sources;
pub mod storage;
pub mod writer;

pub use error::{IngestError, Result};
