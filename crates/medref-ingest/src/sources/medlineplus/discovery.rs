//! Archive link discovery on the MedlinePlus XML index page

use reqwest::Client;
use scraper::{Html, Selector};
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

use crate::config::MedlinePlusConfig;
use crate::error::{IngestError, Result};

/// Fetch the index page and return the URL of the compressed health-topic archive
pub async fn locate_latest_archive(client: &Client, config: &MedlinePlusConfig) -> Result<Url> {
    debug!("Fetching MedlinePlus index from: {}", config.index_url);

    let response = client
        .get(&config.index_url)
        .timeout(Duration::from_secs(config.index_timeout_secs))
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        return Err(IngestError::Status {
            url: config.index_url.clone(),
            status,
        });
    }

    let html = response.text().await?;
    let base = Url::parse(&config.index_url)?;
    let url = find_archive_link(&html, &base, &config.archive_label)?;

    info!(url = %url, "Located MedlinePlus health-topic archive");
    Ok(url)
}

/// Return the first link whose anchor text contains `label`
///
/// Absolute `http(s)` links are returned as-is; anything else is taken as a
/// path from the root of `base`'s host, whatever page `base` points at.
pub fn find_archive_link(html: &str, base: &Url, label: &str) -> Result<Url> {
    let document = Html::parse_document(html);
    let selector = Selector::parse("a[href]")
        .map_err(|e| IngestError::Discovery(format!("invalid link selector: {}", e)))?;

    for anchor in document.select(&selector) {
        let text: String = anchor.text().map(str::trim).collect();
        if !text.contains(label) {
            continue;
        }

        let Some(href) = anchor.value().attr("href") else {
            continue;
        };
        let href = href.trim();

        let url = if href.starts_with("http") {
            Url::parse(href)?
        } else {
            base.join(&format!("/{}", href.trim_start_matches('/')))?
        };
        return Ok(url);
    }

    Err(IngestError::Discovery(format!(
        "no link labelled '{}' found on {}",
        label, base
    )))
}
