//! Error types for the migration engine.

use reut_core::CoreError;
use serde::{Deserialize, Serialize};

/// Errors that can occur while inspecting, diffing or applying migrations.
#[derive(Debug, thiserror::Error)]
pub enum MigrateError {
    /// The database could not be reached. Fatal for a run.
    #[error("Connection failed: {0}")]
    Connection(#[source] CoreError),

    /// A DDL statement was rejected by the database.
    #[error("DDL failed for '{operation}': {source}")]
    Ddl {
        /// Name of the operation whose SQL failed.
        operation: String,
        /// Database error.
        #[source]
        source: sqlx::Error,
    },

    /// A table definition cannot be migrated as written.
    #[error("Invalid table definition: {0}")]
    Validation(#[source] CoreError),

    /// DDL was applied but the ledger entry could not be written.
    #[error("Failed to record '{name}' in the ledger: {source}")]
    LedgerWrite {
        /// Ledger record name.
        name: String,
        /// Database error.
        #[source]
        source: sqlx::Error,
    },

    /// Database error while reading the catalog or the ledger.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Configuration, registry or connection-layer error.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Invalid runner state.
    #[error("Invalid runner state: {0}")]
    InvalidState(String),
}

impl MigrateError {
    /// Classifies the error so callers can branch without matching on text.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Connection(_) => ErrorKind::Connection,
            Self::Ddl { .. } => ErrorKind::Ddl,
            Self::Validation(_) => ErrorKind::Validation,
            Self::LedgerWrite { .. } => ErrorKind::LedgerWrite,
            Self::Database(_) | Self::InvalidState(_) => ErrorKind::Database,
            Self::Core(core) => match core {
                CoreError::Connection(_) => ErrorKind::Connection,
                CoreError::Database(_) => ErrorKind::Database,
                CoreError::EmptyTable { .. } | CoreError::InvalidType(_) => ErrorKind::Validation,
                CoreError::Config(_) | CoreError::Registry { .. } | CoreError::Io(_) => {
                    ErrorKind::Config
                }
            },
        }
    }

    /// Returns whether the error ends a run rather than a single table.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self.kind(), ErrorKind::Connection | ErrorKind::Config)
    }
}

/// Coarse error classification carried by reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Database unreachable.
    Connection,
    /// A DDL statement failed.
    Ddl,
    /// A table definition is invalid.
    Validation,
    /// A ledger entry could not be written.
    LedgerWrite,
    /// Any other database error.
    Database,
    /// Invalid configuration or schema file.
    Config,
}

/// Result type for migration operations.
pub type Result<T> = std::result::Result<T, MigrateError>;
