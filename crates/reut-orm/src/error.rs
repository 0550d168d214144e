//! Error types for the data access layer.

use thiserror::Error;

/// Data access errors.
#[derive(Debug, Error)]
pub enum OrmError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A record or criteria key is not a column of the table.
    #[error("unknown column '{column}' for table '{table}'")]
    UnknownColumn {
        /// Table name.
        table: String,
        /// Offending key.
        column: String,
    },

    /// Validation error.
    #[error("validation error: {0}")]
    Validation(String),

    /// One row of a bulk operation failed; the whole batch was rolled back.
    #[error("bulk operation failed at row {index}: {source}")]
    Bulk {
        /// Zero-based index of the failing row.
        index: usize,
        /// Why the row failed.
        #[source]
        source: Box<OrmError>,
    },
}

impl OrmError {
    /// Wraps an error with the index of the bulk row that caused it.
    #[must_use]
    pub fn at_row(self, index: usize) -> Self {
        Self::Bulk {
            index,
            source: Box::new(self),
        }
    }
}

/// Result type alias for data access operations.
pub type Result<T> = std::result::Result<T, OrmError>;
