//! Error handling for the BeToCQ CLI

use thiserror::Error;

/// CLI-specific error types
#[derive(Error, Debug)]
pub enum CliError {
    #[error("BeToCQ core error: {0}")]
    Core(#[from] betocq_core::BetocqError),

    #[error("Device setup failed: {0}")]
    Device(#[from] betocq_snippet::SnippetError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("TOML serialization error: {0}")]
    TomlSerialization(#[from] toml::ser::Error),

    #[error("{failed} of {total} scenarios failed")]
    ScenariosFailed { failed: usize, total: usize },
}

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;
