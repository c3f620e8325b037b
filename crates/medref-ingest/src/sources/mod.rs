//! Source adapters
//!
//! Each upstream origin implements [`DocumentSource`] and emits flat
//! [`RawRecord`]s; shaping them into table rows is left to the normalizer.

pub mod medlineplus;
pub mod openfda;

use async_trait::async_trait;
use reqwest::Client;

use crate::config::USER_AGENT;
use crate::error::Result;
use crate::models::RawRecord;

pub use medlineplus::MedlinePlusSource;
pub use openfda::OpenFdaSource;

/// Source tag for MedlinePlus health topics
pub const MEDLINEPLUS_SOURCE: &str = "medlineplus";

/// Source tag for openFDA drug labels
pub const OPENFDA_SOURCE: &str = "openfda";

/// An upstream origin whose records share one overwrite partition
#[async_trait]
pub trait DocumentSource: Send + Sync {
    /// Value written to the `source` column
    fn source_name(&self) -> &str;

    /// Fetch every record currently published by the source
    async fn fetch_records(&self) -> Result<Vec<RawRecord>>;
}

/// HTTP client shared by the adapters; timeouts are set per request
pub fn http_client() -> Result<Client> {
    let client = Client::builder().user_agent(USER_AGENT).build()?;
    Ok(client)
}
