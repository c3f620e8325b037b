// Source adapter configuration

use medref_common::config::{env_parse, env_var, DatabaseConfig};
use medref_common::MedrefError;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// User agent sent with every outbound request
pub const USER_AGENT: &str = concat!("medref-ingest/", env!("CARGO_PKG_VERSION"));

/// Index page listing the downloadable MedlinePlus XML files
pub const DEFAULT_MEDLINEPLUS_INDEX_URL: &str = "https://medlineplus.gov/xml.html";

/// Anchor text of the compressed health-topic archive link
pub const MEDLINEPLUS_ARCHIVE_LABEL: &str = "MedlinePlus Compressed Health Topic XML";

pub const DEFAULT_OPENFDA_URL: &str = "https://api.fda.gov/drug/label.json";

pub const DEFAULT_OPENFDA_SEARCH: &str = "openfda.brand_name:*";

/// Label sections concatenated into `raw_text`
pub const DEFAULT_OPENFDA_FIELDS: [&str; 5] = [
    "indications_and_usage",
    "dosage_and_administration",
    "warnings",
    "adverse_reactions",
    "contraindications",
];

fn invalid(message: &str) -> MedrefError {
    MedrefError::Config(message.to_string())
}

/// Configuration for the MedlinePlus health-topic adapter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MedlinePlusConfig {
    /// Page scanned for the archive link
    pub index_url: String,

    /// Anchor text identifying the archive link
    pub archive_label: String,

    /// Timeout for the index page request in seconds
    pub index_timeout_secs: u64,

    /// Timeout for the archive download in seconds
    pub archive_timeout_secs: u64,
}

impl Default for MedlinePlusConfig {
    fn default() -> Self {
        Self {
            index_url: DEFAULT_MEDLINEPLUS_INDEX_URL.to_string(),
            archive_label: MEDLINEPLUS_ARCHIVE_LABEL.to_string(),
            index_timeout_secs: 30,
            archive_timeout_secs: 60,
        }
    }
}

impl MedlinePlusConfig {
    /// Load from `MEDLINEPLUS_INDEX_URL`, `MEDLINEPLUS_INDEX_TIMEOUT` and
    /// `MEDLINEPLUS_ARCHIVE_TIMEOUT`
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        let config = Self {
            index_url: env_var("MEDLINEPLUS_INDEX_URL").unwrap_or(defaults.index_url),
            archive_label: defaults.archive_label,
            index_timeout_secs: env_parse("MEDLINEPLUS_INDEX_TIMEOUT", defaults.index_timeout_secs)?,
            archive_timeout_secs: env_parse(
                "MEDLINEPLUS_ARCHIVE_TIMEOUT",
                defaults.archive_timeout_secs,
            )?,
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.index_url.is_empty() {
            return Err(invalid("MedlinePlus index URL cannot be empty").into());
        }

        if self.archive_label.is_empty() {
            return Err(invalid("MedlinePlus archive label cannot be empty").into());
        }

        if self.index_timeout_secs == 0 || self.archive_timeout_secs == 0 {
            return Err(invalid("MedlinePlus timeouts must be greater than 0").into());
        }

        Ok(())
    }
}

/// Configuration for the openFDA drug-label adapter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenFdaConfig {
    /// Search endpoint
    pub url: String,

    /// Upper bound on requests issued per fetch
    pub max_pages: usize,

    /// Results requested per page (`limit`)
    pub page_size: usize,

    /// Value of the `search` query parameter
    pub search: String,

    /// Label fields joined into `raw_text`
    pub fields: Vec<String>,

    /// Per-request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for OpenFdaConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_OPENFDA_URL.to_string(),
            max_pages: 20,
            page_size: 100,
            search: DEFAULT_OPENFDA_SEARCH.to_string(),
            fields: DEFAULT_OPENFDA_FIELDS.iter().map(|f| f.to_string()).collect(),
            timeout_secs: 60,
        }
    }
}

/// Split a comma-separated field list, dropping blanks
pub fn parse_field_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|f| !f.is_empty())
        .map(str::to_string)
        .collect()
}

impl OpenFdaConfig {
    /// Load from the `OPENFDA_*` variables
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        let config = Self {
            url: env_var("OPENFDA_URL").unwrap_or(defaults.url),
            max_pages: env_parse("OPENFDA_MAX_PAGES", defaults.max_pages)?,
            page_size: env_parse("OPENFDA_PAGE_SIZE", defaults.page_size)?,
            search: env_var("OPENFDA_SEARCH").unwrap_or(defaults.search),
            fields: env_var("OPENFDA_FIELDS")
                .map(|v| parse_field_list(&v))
                .unwrap_or(defaults.fields),
            timeout_secs: env_parse("OPENFDA_TIMEOUT", defaults.timeout_secs)?,
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.url.is_empty() {
            return Err(invalid("openFDA URL cannot be empty").into());
        }

        if self.page_size == 0 {
            return Err(invalid("openFDA page size must be greater than 0").into());
        }

        if self.timeout_secs == 0 {
            return Err(invalid("openFDA timeout must be greater than 0").into());
        }

        Ok(())
    }
}

/// Everything the ingest binary needs
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IngestConfig {
    pub database: DatabaseConfig,
    pub medlineplus: MedlinePlusConfig,
    pub openfda: OpenFdaConfig,
}

impl IngestConfig {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            database: DatabaseConfig::from_env()?,
            medlineplus: MedlinePlusConfig::from_env()?,
            openfda: OpenFdaConfig::from_env()?,
        })
    }

    pub fn validate(&self) -> Result<()> {
        self.database.validate()?;
        self.medlineplus.validate()?;
        self.openfda.validate()
    }
}
