//! Scenario Tester Common Library
//!
//! Persisted data model, the SQLite result store and runtime settings shared
//! by the engine, the web API and the CLI.

pub mod config;
pub mod db;
pub mod error;
pub mod types;

// Re-export commonly used types
pub use config::{Credentials, EnvironmentConfig, Settings};
pub use db::Database;
pub use error::{Error, Result};
pub use types::*;

/// Scenario tester version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default settings file, relative to the working directory
pub fn default_config_path() -> std::path::PathBuf {
    std::path::PathBuf::from("scenario-tester.toml")
}

/// Default database path
pub fn default_db_path() -> std::path::PathBuf {
    std::path::PathBuf::from("scenario-tester.db")
}
