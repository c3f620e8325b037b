//! Error types for the ingestion pipeline

use thiserror::Error;

/// Result type alias for ingestion operations
pub type Result<T> = std::result::Result<T, IngestError>;

/// Errors raised by source adapters, the normalizer and the table writer
#[derive(Error, Debug)]
pub enum IngestError {
    /// An expected link or element was not found on an index page
    #[error("Discovery error: {0}")]
    Discovery(String),

    /// An HTTP request failed with a status other than the end-of-pages signal
    #[error("HTTP {status} from {url}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },

    /// The request never produced a usable response
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// An expected file was missing from (or unreadable in) a downloaded archive
    #[error("Extraction error: {0}")]
    Extraction(String),

    /// A record violates the fixed table schema
    #[error("Schema error: {0}")]
    Schema(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A row's `(source, doc_id)` is already stored
    #[error("Duplicate key: {0}")]
    DuplicateKey(String),

    #[error("Table {0} does not exist")]
    TableMissing(String),

    #[error("Configuration error: {0}")]
    Config(#[from] medref_common::MedrefError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl IngestError {
    /// True for failures of the HTTP exchange itself
    pub fn is_transport(&self) -> bool {
        matches!(self, IngestError::Status { .. } | IngestError::Transport(_))
    }
}

impl From<quick_xml::Error> for IngestError {
    fn from(err: quick_xml::Error) -> Self {
        IngestError::Parse(err.to_string())
    }
}

impl From<quick_xml::events::attributes::AttrError> for IngestError {
    fn from(err: quick_xml::events::attributes::AttrError) -> Self {
        IngestError::Parse(err.to_string())
    }
}

impl From<zip::result::ZipError> for IngestError {
    fn from(err: zip::result::ZipError) -> Self {
        IngestError::Extraction(err.to_string())
    }
}

impl From<url::ParseError> for IngestError {
    fn from(err: url::ParseError) -> Self {
        IngestError::Discovery(err.to_string())
    }
}
