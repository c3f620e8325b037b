//! Configuration management
//!
//! Settings are read from the process environment after an optional `.env`
//! file has been merged in. Every value has a default suitable for local
//! development.

use crate::error::{MedrefError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Database Configuration Constants
// ============================================================================

/// Default database URL for local development.
pub const DEFAULT_DATABASE_URL: &str = "postgresql://localhost/medref";

/// Default maximum database connections in the pool.
pub const DEFAULT_DATABASE_MAX_CONNECTIONS: u32 = 2;

/// Default database connection timeout in seconds.
pub const DEFAULT_DATABASE_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Default destination table for ingested documents.
pub const DEFAULT_TABLE: &str = "med.raw_data";

/// Merge a `.env` file into the environment if one exists.
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

/// Read an environment variable, treating unset and empty values alike.
pub fn env_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Read and parse an environment variable, falling back to `default` when unset.
pub fn env_parse<T: FromStr>(key: &str, default: T) -> Result<T> {
    match env_var(key) {
        Some(value) => value.trim().parse().map_err(|_| MedrefError::InvalidEnv {
            key: key.to_string(),
            value,
        }),
        None => Ok(default),
    }
}

/// A validated, optionally schema-qualified SQL table name.
///
/// Only ASCII letters, digits and underscores are accepted in each part, so
/// the name can be interpolated into DDL safely.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TableName {
    schema: Option<String>,
    table: String,
}

impl TableName {
    pub fn schema(&self) -> Option<&str> {
        self.schema.as_deref()
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Fully qualified name as used in SQL statements
    pub fn qualified(&self) -> String {
        self.to_string()
    }
}

fn is_identifier(part: &str) -> bool {
    let mut chars = part.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {},
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

impl FromStr for TableName {
    type Err = MedrefError;

    fn from_str(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.trim().split('.').collect();
        if parts.iter().any(|p| !is_identifier(p)) {
            return Err(MedrefError::InvalidIdentifier(s.to_string()));
        }

        match parts.as_slice() {
            [table] => Ok(Self {
                schema: None,
                table: table.to_string(),
            }),
            [schema, table] => Ok(Self {
                schema: Some(schema.to_string()),
                table: table.to_string(),
            }),
            _ => Err(MedrefError::InvalidIdentifier(s.to_string())),
        }
    }
}

impl TryFrom<String> for TableName {
    type Error = MedrefError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<TableName> for String {
    fn from(value: TableName) -> Self {
        value.to_string()
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.schema {
            Some(schema) => write!(f, "{}.{}", schema, self.table),
            None => write!(f, "{}", self.table),
        }
    }
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub connect_timeout_secs: u64,
    pub table: TableName,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_DATABASE_URL.to_string(),
            max_connections: DEFAULT_DATABASE_MAX_CONNECTIONS,
            connect_timeout_secs: DEFAULT_DATABASE_CONNECT_TIMEOUT_SECS,
            table: TableName {
                schema: Some("med".to_string()),
                table: "raw_data".to_string(),
            },
        }
    }
}

impl DatabaseConfig {
    /// Load database configuration from environment variables
    ///
    /// - `DATABASE_URL`
    /// - `DATABASE_MAX_CONNECTIONS`
    /// - `DATABASE_CONNECT_TIMEOUT`
    /// - `MEDREF_TABLE`
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        let config = Self {
            url: env_var("DATABASE_URL").unwrap_or(defaults.url),
            max_connections: env_parse("DATABASE_MAX_CONNECTIONS", defaults.max_connections)?,
            connect_timeout_secs: env_parse(
                "DATABASE_CONNECT_TIMEOUT",
                defaults.connect_timeout_secs,
            )?,
            table: match env_var("MEDREF_TABLE") {
                Some(name) => name.parse()?,
                None => defaults.table,
            },
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.url.is_empty() {
            return Err(MedrefError::Config("Database URL cannot be empty".to_string()));
        }

        if self.max_connections == 0 {
            return Err(MedrefError::Config(
                "Database max_connections must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}
