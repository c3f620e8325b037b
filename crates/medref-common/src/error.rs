//! Error types for medref

use thiserror::Error;

/// Result type alias for shared medref operations
pub type Result<T> = std::result::Result<T, MedrefError>;

/// Errors raised while loading configuration or setting up logging
#[derive(Error, Debug)]
pub enum MedrefError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid value for {key}: {value:?}")]
    InvalidEnv { key: String, value: String },

    #[error("Invalid table identifier: {0}")]
    InvalidIdentifier(String),

    #[error("Logging error: {0}")]
    Logging(String),
}
