//! SQLite dialect.
//!
//! Used for embedded databases. Catalog lookups use the `pragma_table_list`
//! and `pragma_table_info` table-valued functions (SQLite 3.37+), scoped to
//! the `main` schema unless configured otherwise.
//!
//! `AUTO_INCREMENT` is spelled `AUTOINCREMENT` and is only valid on an
//! `INTEGER PRIMARY KEY`.

use crate::schema::{ColumnDefinition, SqlType};

use super::Dialect;

/// SQLite dialect.
#[derive(Debug, Clone, Default)]
pub struct SqliteDialect;

impl SqliteDialect {
    /// Creates a new SQLite dialect.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Dialect for SqliteDialect {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn default_schema(&self) -> Option<&'static str> {
        Some("main")
    }

    fn create_ledger_sql(&self) -> &'static str {
        r"
CREATE TABLE IF NOT EXISTS migrations (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name VARCHAR(255) NOT NULL UNIQUE,
    sql_text TEXT NOT NULL,
    batch INTEGER NOT NULL,
    applied_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
)
"
    }

    fn insert_ledger_sql(&self) -> &'static str {
        "INSERT OR IGNORE INTO migrations (name, sql_text, batch) VALUES (?, ?, ?)"
    }

    fn max_batch_sql(&self) -> &'static str {
        "SELECT COALESCE(MAX(batch), 0) FROM migrations"
    }

    fn select_ledger_sql(&self) -> &'static str {
        "SELECT id, name, sql_text, batch, applied_at FROM migrations ORDER BY batch, id"
    }

    fn table_exists_sql(&self) -> &'static str {
        "SELECT COUNT(*) FROM pragma_table_list WHERE schema = ? AND name = ? AND type = 'table'"
    }

    fn table_columns_sql(&self) -> &'static str {
        "SELECT p.name FROM pragma_table_list AS t \
         JOIN pragma_table_info(t.name, t.schema) AS p \
         WHERE t.schema = ? AND t.name = ? AND t.type = 'table' ORDER BY p.cid"
    }

    fn list_tables_sql(&self) -> &'static str {
        "SELECT name FROM pragma_table_list \
         WHERE schema = ? AND type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name"
    }

    fn auto_increment_keyword(&self, column: &ColumnDefinition) -> Option<&'static str> {
        let rowid_alias = column.is_primary_key() && *column.sql_type() == SqlType::Integer;
        rowid_alias.then_some("AUTOINCREMENT")
    }

    fn select_expr(&self, column: &str, sql_type: &SqlType) -> String {
        match sql_type {
            SqlType::Boolean => format!("CAST({column} AS INTEGER) AS {column}"),
            SqlType::Date => format!("CAST({column} AS TEXT) AS {column}"),
            SqlType::Integer | SqlType::Varchar(_) | SqlType::Text | SqlType::References { .. } => {
                column.to_string()
            }
        }
    }
}
