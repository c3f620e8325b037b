//! openFDA drug-label adapter
//!
//! Pages through the label search endpoint with `skip`/`limit` and flattens
//! each result into one record. A 404 marks the end of the result set.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::time::Duration;
use tracing::{debug, info};

use super::{http_client, DocumentSource, OPENFDA_SOURCE};
use crate::config::OpenFdaConfig;
use crate::error::{IngestError, Result};
use crate::models::{RawRecord, SynonymField, CATEGORY_DRUG};

/// Title used when a label carries neither brand nor generic names
pub const UNKNOWN_TITLE: &str = "Unknown";

/// Drug-label adapter
pub struct OpenFdaSource {
    config: OpenFdaConfig,
    client: Client,
}

impl OpenFdaSource {
    pub fn new(config: OpenFdaConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            client: http_client()?,
        })
    }

    pub fn config(&self) -> &OpenFdaConfig {
        &self.config
    }
}

#[async_trait]
impl DocumentSource for OpenFdaSource {
    fn source_name(&self) -> &str {
        OPENFDA_SOURCE
    }

    async fn fetch_records(&self) -> Result<Vec<RawRecord>> {
        fetch_labels(&self.client, &self.config).await
    }
}

/// Fetch up to `max_pages` pages of labels matching `config.search`
///
/// Stops early on a 404 or an empty page and returns what was collected so
/// far. Any other error status aborts the fetch.
pub async fn fetch_labels(client: &Client, config: &OpenFdaConfig) -> Result<Vec<RawRecord>> {
    let mut records = Vec::new();
    let mut skip = 0usize;
    let limit = config.page_size.to_string();

    for page in 0..config.max_pages {
        let skip_param = skip.to_string();
        let response = client
            .get(&config.url)
            .query(&[
                ("search", config.search.as_str()),
                ("limit", limit.as_str()),
                ("skip", skip_param.as_str()),
            ])
            .timeout(Duration::from_secs(config.timeout_secs))
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            debug!(page, skip, "openFDA returned 404, end of results");
            break;
        }
        if !status.is_success() {
            return Err(IngestError::Status {
                url: response.url().to_string(),
                status,
            });
        }

        let body = response.bytes().await?;
        let data: Value = serde_json::from_slice(&body)?;

        let results = match data.get("results").and_then(Value::as_array) {
            Some(results) if !results.is_empty() => results,
            _ => {
                debug!(page, skip, "openFDA returned an empty page");
                break;
            },
        };

        for result in results {
            records.push(label_to_record(result, &config.fields)?);
        }

        info!(
            page = page + 1,
            fetched = results.len(),
            total = records.len(),
            "Fetched openFDA page"
        );

        skip += config.page_size;
    }

    Ok(records)
}

/// Join the string elements of a name list with `", "`
fn joined_names(product: Option<&Map<String, Value>>, key: &str) -> String {
    match product.and_then(|p| p.get(key)) {
        Some(Value::Array(names)) => names
            .iter()
            .filter_map(Value::as_str)
            .collect::<Vec<_>>()
            .join(", "),
        Some(Value::String(name)) => name.clone(),
        _ => String::new(),
    }
}

/// Concatenate the configured text sections, skipping absent or non-text values
fn section_text(result: &Value, fields: &[String]) -> Option<String> {
    let mut sections: Vec<&str> = Vec::new();

    for field in fields {
        match result.get(field) {
            Some(Value::Array(values)) => sections.extend(values.iter().filter_map(Value::as_str)),
            Some(Value::String(value)) => sections.push(value),
            _ => {},
        }
    }

    if sections.is_empty() {
        None
    } else {
        Some(sections.join("\n\n"))
    }
}

/// Flatten one label search result
pub fn label_to_record(result: &Value, fields: &[String]) -> Result<RawRecord> {
    let product = result.get("openfda").and_then(Value::as_object);
    let brand = joined_names(product, "brand_name");
    let generic = joined_names(product, "generic_name");

    let title = [&brand, &generic]
        .into_iter()
        .find(|name| !name.is_empty())
        .cloned()
        .unwrap_or_else(|| UNKNOWN_TITLE.to_string());

    let names: BTreeSet<&str> = [brand.as_str(), generic.as_str()]
        .into_iter()
        .filter(|name| !name.is_empty())
        .collect();
    let synonyms = if names.is_empty() {
        None
    } else {
        Some(SynonymField::Delimited(
            names.into_iter().collect::<Vec<_>>().join("; "),
        ))
    };

    let doc_id = match result.get("id") {
        Some(Value::String(id)) => Some(format!("openfda_{}", id)),
        Some(Value::Null) | None => None,
        Some(other) => Some(format!("openfda_{}", other)),
    };

    Ok(RawRecord {
        doc_id,
        category: Some(CATEGORY_DRUG.to_string()),
        title: Some(title),
        synonyms,
        url: None,
        raw_text: section_text(result, fields),
        meta_json: Some(serde_json::to_string(result)?),
    })
}
