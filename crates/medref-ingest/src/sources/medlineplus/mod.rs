//! MedlinePlus health-topic feed adapter
//!
//! The feed is published as a zip archive linked from an index page:
//! 1. [`discovery::locate_latest_archive`] finds the archive link
//! 2. [`archive::download_archive`] fetches it
//! 3. [`archive::extract_primary_document`] pulls out the XML document
//! 4. [`parser::parse_topics`] turns English topics into records

pub mod archive;
pub mod discovery;
pub mod parser;

use async_trait::async_trait;
use reqwest::Client;
use tracing::info;

use super::{http_client, DocumentSource, MEDLINEPLUS_SOURCE};
use crate::config::MedlinePlusConfig;
use crate::error::Result;
use crate::models::RawRecord;

pub use archive::{download_archive, extract_primary_document};
pub use discovery::locate_latest_archive;
pub use parser::parse_topics;

/// Health-topic adapter
pub struct MedlinePlusSource {
    config: MedlinePlusConfig,
    client: Client,
}

impl MedlinePlusSource {
    pub fn new(config: MedlinePlusConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            client: http_client()?,
        })
    }

    pub fn config(&self) -> &MedlinePlusConfig {
        &self.config
    }
}

#[async_trait]
impl DocumentSource for MedlinePlusSource {
    fn source_name(&self) -> &str {
        MEDLINEPLUS_SOURCE
    }

    async fn fetch_records(&self) -> Result<Vec<RawRecord>> {
        let url = locate_latest_archive(&self.client, &self.config).await?;
        let archive = download_archive(&self.client, &url, self.config.archive_timeout_secs).await?;
        let document = extract_primary_document(&archive)?;
        let records = parse_topics(&document)?;

        info!(
            count = records.len(),
            "Parsed {} MedlinePlus health topics",
            records.len()
        );
        Ok(records)
    }
}
