//! Archive download and extraction

use reqwest::Client;
use std::io::{Cursor, Read};
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

use crate::error::{IngestError, Result};

/// Extension of the document extracted from the archive
pub const DOCUMENT_EXTENSION: &str = ".xml";

/// Download the archive at `url`
pub async fn download_archive(client: &Client, url: &Url, timeout_secs: u64) -> Result<Vec<u8>> {
    info!("Downloading MedlinePlus archive from: {}", url);

    let response = client
        .get(url.clone())
        .timeout(Duration::from_secs(timeout_secs))
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        return Err(IngestError::Status {
            url: url.to_string(),
            status,
        });
    }

    let bytes = response.bytes().await?;
    info!(size = bytes.len(), "Downloaded MedlinePlus archive");
    Ok(bytes.to_vec())
}

/// Return the contents of the first `.xml` entry in a zip archive
pub fn extract_primary_document(data: &[u8]) -> Result<Vec<u8>> {
    let mut archive = zip::ZipArchive::new(Cursor::new(data))?;

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        if entry.is_dir() || !entry.name().ends_with(DOCUMENT_EXTENSION) {
            continue;
        }

        let name = entry.name().to_string();
        let mut contents = Vec::new();
        entry
            .read_to_end(&mut contents)
            .map_err(|e| IngestError::Extraction(format!("failed to read {}: {}", name, e)))?;

        debug!("Extracted {} ({} bytes)", name, contents.len());
        return Ok(contents);
    }

    Err(IngestError::Extraction(format!(
        "no {} entry in archive ({} entries)",
        DOCUMENT_EXTENSION,
        archive.len()
    )))
}
