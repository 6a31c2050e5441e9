//! Error types for the Bookshelf library.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Main error type for Bookshelf operations.
#[derive(Debug, Error)]
pub enum BookshelfError {
    /// Error reading or accessing a file.
    #[error("IO error for '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Error from the CSV library.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP client error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Empty sheet or no rows to work with.
    #[error("Empty data: {0}")]
    EmptyData(String),

    /// A column the operation depends on is absent from the header.
    #[error("Missing column '{role}' in {table}")]
    MissingColumn { role: String, table: String },

    /// Neither the sheet API nor the CSV files could be loaded.
    #[error("Data source unavailable: {0}")]
    SourceUnavailable(String),

    /// A required configuration value is not set.
    #[error("Missing configuration: {0}")]
    ConfigMissing(String),

    /// A relay request failed on the wire.
    #[error("Transport failure: {0}")]
    Transport(String),

    /// A relay request exceeded its deadline.
    #[error("Request timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    /// The backend answered with an explicit error.
    #[error("Backend error: {0}")]
    Backend(String),

    /// Invalid configuration value.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Error saving or loading settings.
    #[error("Persistence error: {0}")]
    Persistence(String),
}

impl BookshelfError {
    /// Build a [`BookshelfError::MissingColumn`].
    pub fn missing_column(role: impl Into<String>, table: impl Into<String>) -> Self {
        Self::MissingColumn {
            role: role.into(),
            table: table.into(),
        }
    }
}

/// Result type alias for Bookshelf operations.
pub type Result<T> = std::result::Result<T, BookshelfError>;
