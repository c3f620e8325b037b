//! medref Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared configuration, logging and error handling for the medref workspace.
//!
//! - **Error Handling**: [`MedrefError`] and the [`Result`] alias
//! - **Configuration**: environment-backed settings shared by every binary
//! - **Logging**: `tracing` subscriber setup
//!
//! # Example
//!
//! ```no_run
//! use medref_common::config::DatabaseConfig;
//! use medref_common::logging::{init_logging, LogConfig};
//!
//! fn main() -> medref_common::Result<()> {
//!     medref_common::config::load_dotenv();
//!     let _guard = init_logging(&LogConfig::from_env()?)?;
//!     let db = DatabaseConfig::from_env()?;
//!     tracing::info!(table = %db.table, "configuration loaded");
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod logging;

pub use error::{MedrefError, Result};
