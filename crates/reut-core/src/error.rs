//! Error types shared by the schema model and the connection layer.

use std::path::PathBuf;

/// Errors raised while building definitions, loading configuration or
/// connecting to the database.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// A table definition without columns cannot produce creation SQL.
    #[error("Table '{table}' has no columns; refusing to generate CREATE TABLE")]
    EmptyTable {
        /// Name of the offending table.
        table: String,
    },

    /// A column type could not be parsed.
    #[error("Unknown column type '{0}'")]
    InvalidType(String),

    /// The schema registry file is malformed.
    #[error("Invalid schema file '{path}': {message}")]
    Registry {
        /// Path to the schema file.
        path: PathBuf,
        /// What went wrong.
        message: String,
    },

    /// The database configuration is unusable.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The database could not be reached.
    #[error("Failed to connect to database: {0}")]
    Connection(#[source] sqlx::Error),

    /// Database error after a connection was established.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// IO error (reading schema files).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
