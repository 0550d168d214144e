//! MySQL / MariaDB dialect.
//!
//! Catalog lookups go through `information_schema`, which reports columns in
//! the same ordinal order as `DESCRIBE`. Text-like catalog values are cast to
//! `CHAR` because MySQL 8 reports several of them as binary strings.

use crate::schema::{ColumnDefinition, SqlType};

use super::Dialect;

/// MySQL dialect.
#[derive(Debug, Clone, Default)]
pub struct MySqlDialect;

impl MySqlDialect {
    /// Creates a new MySQL dialect.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Dialect for MySqlDialect {
    fn name(&self) -> &'static str {
        "mysql"
    }

    fn create_ledger_sql(&self) -> &'static str {
        r"
CREATE TABLE IF NOT EXISTS migrations (
    id INTEGER PRIMARY KEY AUTO_INCREMENT,
    name VARCHAR(255) NOT NULL UNIQUE,
    sql_text TEXT NOT NULL,
    batch INT NOT NULL,
    applied_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
)
"
    }

    fn insert_ledger_sql(&self) -> &'static str {
        "INSERT IGNORE INTO migrations (name, sql_text, batch) VALUES (?, ?, ?)"
    }

    fn max_batch_sql(&self) -> &'static str {
        "SELECT CAST(COALESCE(MAX(batch), 0) AS SIGNED) FROM migrations"
    }

    fn select_ledger_sql(&self) -> &'static str {
        "SELECT CAST(id AS SIGNED), CAST(name AS CHAR), CAST(sql_text AS CHAR), \
         CAST(batch AS SIGNED), CAST(applied_at AS CHAR) \
         FROM migrations ORDER BY batch, id"
    }

    fn table_exists_sql(&self) -> &'static str {
        "SELECT COUNT(*) FROM information_schema.tables \
         WHERE table_schema = ? AND table_name = ? AND table_type = 'BASE TABLE'"
    }

    fn table_columns_sql(&self) -> &'static str {
        "SELECT CAST(column_name AS CHAR) FROM information_schema.columns \
         WHERE table_schema = ? AND table_name = ? ORDER BY ordinal_position"
    }

    fn list_tables_sql(&self) -> &'static str {
        "SELECT CAST(table_name AS CHAR) FROM information_schema.tables \
         WHERE table_schema = ? AND table_type = 'BASE TABLE' ORDER BY table_name"
    }

    fn auto_increment_keyword(&self, _column: &ColumnDefinition) -> Option<&'static str> {
        Some("AUTO_INCREMENT")
    }

    fn select_expr(&self, column: &str, sql_type: &SqlType) -> String {
        match sql_type {
            SqlType::Integer | SqlType::Boolean => format!("CAST({column} AS SIGNED) AS {column}"),
            SqlType::Text | SqlType::Date => format!("CAST({column} AS CHAR) AS {column}"),
            SqlType::Varchar(_) | SqlType::References { .. } => column.to_string(),
        }
    }
}
