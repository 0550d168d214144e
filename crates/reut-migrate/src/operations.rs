//! Migration operations.
//!
//! An operation is one DDL statement the engine intends to run, together with
//! the table it touches and the name it is recorded under in the ledger.

use std::fmt;

use chrono::{DateTime, Utc};
use reut_core::{ColumnDefinition, CoreError, Dialect, TableDefinition};
use serde::{Deserialize, Serialize};

/// Timestamp suffix appended to operation names in the ledger.
pub const RECORD_TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";

/// A single schema change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MigrationOperation {
    /// Create a table that does not exist yet.
    CreateTable {
        /// Table name.
        table: String,
        /// `CREATE TABLE IF NOT EXISTS ...` statement.
        sql: String,
    },

    /// Add a column missing from a live table.
    AddColumn {
        /// Table name.
        table: String,
        /// Column name.
        column: String,
        /// `ALTER TABLE ... ADD ...` statement.
        sql: String,
    },

    /// Drop a live column the definition no longer has.
    DropColumn {
        /// Table name.
        table: String,
        /// Column name.
        column: String,
        /// `ALTER TABLE ... DROP COLUMN ...` statement.
        sql: String,
    },

    /// Drop a live table with no definition. Only produced on request.
    DropTable {
        /// Table name.
        table: String,
        /// `DROP TABLE IF EXISTS ...` statement.
        sql: String,
    },
}

impl MigrationOperation {
    /// Creates a `CreateTable` operation from a definition, rendered for
    /// `dialect`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::EmptyTable`] when the definition has no columns.
    pub fn create_table(
        definition: &TableDefinition,
        dialect: &dyn Dialect,
    ) -> Result<Self, CoreError> {
        Ok(Self::CreateTable {
            table: definition.name().to_string(),
            sql: definition.create_table_sql_for(dialect)?,
        })
    }

    /// Creates an `AddColumn` operation, rendered for `dialect`.
    #[must_use]
    pub fn add_column(
        table: &str,
        column: &str,
        definition: &ColumnDefinition,
        dialect: &dyn Dialect,
    ) -> Self {
        Self::AddColumn {
            table: table.to_string(),
            column: column.to_string(),
            sql: format!("ALTER TABLE {table} ADD {column} {}", definition.to_sql_for(dialect)),
        }
    }

    /// Creates a `DropColumn` operation.
    #[must_use]
    pub fn drop_column(table: &str, column: &str) -> Self {
        Self::DropColumn {
            table: table.to_string(),
            column: column.to_string(),
            sql: format!("ALTER TABLE {table} DROP COLUMN {column}"),
        }
    }

    /// Creates a `DropTable` operation.
    #[must_use]
    pub fn drop_table(table: &str) -> Self {
        Self::DropTable {
            table: table.to_string(),
            sql: format!("DROP TABLE IF EXISTS {table}"),
        }
    }

    /// Returns the table this operation touches.
    #[must_use]
    pub fn table(&self) -> &str {
        match self {
            Self::CreateTable { table, .. }
            | Self::AddColumn { table, .. }
            | Self::DropColumn { table, .. }
            | Self::DropTable { table, .. } => table,
        }
    }

    /// Returns the SQL statement.
    #[must_use]
    pub fn sql(&self) -> &str {
        match self {
            Self::CreateTable { sql, .. }
            | Self::AddColumn { sql, .. }
            | Self::DropColumn { sql, .. }
            | Self::DropTable { sql, .. } => sql,
        }
    }

    /// Returns the operation name, e.g. `add_email_to_users_table`.
    #[must_use]
    pub fn name(&self) -> String {
        match self {
            Self::CreateTable { table, .. } => format!("create_{table}_table"),
            Self::AddColumn { table, column, .. } => format!("add_{column}_to_{table}_table"),
            Self::DropColumn { table, column, .. } => {
                format!("drop_{column}_from_{table}_table")
            }
            Self::DropTable { table, .. } => format!("drop_{table}_table"),
        }
    }

    /// Returns the ledger record name: the operation name plus a UTC
    /// timestamp.
    #[must_use]
    pub fn record_name(&self, at: DateTime<Utc>) -> String {
        format!("{}_{}", self.name(), at.format(RECORD_TIMESTAMP_FORMAT))
    }

    /// Returns a short human-readable description.
    #[must_use]
    pub fn description(&self) -> String {
        match self {
            Self::CreateTable { table, .. } => format!("Create table {table}"),
            Self::AddColumn { table, column, .. } => format!("Add column {column} to {table}"),
            Self::DropColumn { table, column, .. } => {
                format!("Drop column {column} from {table}")
            }
            Self::DropTable { table, .. } => format!("Drop table {table}"),
        }
    }

    /// Returns whether this operation removes data.
    #[must_use]
    pub fn is_destructive(&self) -> bool {
        matches!(self, Self::DropColumn { .. } | Self::DropTable { .. })
    }
}

impl fmt::Display for MigrationOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.description())
    }
}
