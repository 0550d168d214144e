//! Database dialect implementations.
//!
//! Generated DDL follows [`crate::schema`] for every backend except the
//! auto-increment clause. A dialect supplies that clause together with the
//! catalog queries, the ledger statements and the column projections.

mod mysql;
mod sqlite;

use std::fmt;
use std::sync::Arc;

pub use mysql::MySqlDialect;
pub use sqlite::SqliteDialect;

use crate::error::{CoreError, Result};
use crate::schema::{ColumnDefinition, SqlType};

/// Name of the table that records applied migrations.
pub const LEDGER_TABLE: &str = "migrations";

/// Trait for database-specific SQL.
///
/// Catalog queries bind `(schema, table)` in that order; `list_tables_sql`
/// binds only the schema. The ledger insert binds `(name, sql_text, batch)`.
pub trait Dialect: Send + Sync + fmt::Debug {
    /// Returns the dialect name.
    fn name(&self) -> &'static str;

    /// Schema name to use when the connection URL does not name one.
    fn default_schema(&self) -> Option<&'static str> {
        None
    }

    /// Idempotent creation of the ledger table.
    fn create_ledger_sql(&self) -> &'static str;

    /// Insert-or-ignore into the ledger.
    fn insert_ledger_sql(&self) -> &'static str;

    /// Single `BIGINT` value: highest batch number, or 0 when empty.
    fn max_batch_sql(&self) -> &'static str;

    /// `(id, name, sql_text, batch, applied_at)` ordered by batch then id,
    /// with `applied_at` as text.
    fn select_ledger_sql(&self) -> &'static str;

    /// Single `BIGINT` count of base tables named `table` in `schema`.
    fn table_exists_sql(&self) -> &'static str;

    /// Column names of a table in ordinal order.
    fn table_columns_sql(&self) -> &'static str;

    /// Names of all base tables in a schema.
    fn list_tables_sql(&self) -> &'static str;

    /// Auto-increment keyword for `column`, or `None` when the engine takes
    /// no clause for that column.
    fn auto_increment_keyword(&self, column: &ColumnDefinition) -> Option<&'static str>;

    /// Projection for one column in a `SELECT` list, aliased back to the
    /// column name, so every value decodes as an integer or a string.
    fn select_expr(&self, column: &str, sql_type: &SqlType) -> String;
}

/// Picks the dialect matching a connection URL's scheme.
///
/// # Errors
///
/// Returns [`CoreError::Config`] for unsupported schemes.
pub fn dialect_for_url(url: &str) -> Result<Arc<dyn Dialect>> {
    let scheme = url.split(':').next().unwrap_or_default().to_ascii_lowercase();
    match scheme.as_str() {
        "mysql" | "mariadb" => Ok(Arc::new(MySqlDialect::new())),
        "sqlite" => Ok(Arc::new(SqliteDialect::new())),
        _ => Err(CoreError::Config(format!(
            "unsupported database URL scheme '{scheme}' (expected mysql:// or sqlite:)"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dialect_for_url() {
        assert_eq!(dialect_for_url("mysql://root@localhost/app").unwrap().name(), "mysql");
        assert_eq!(dialect_for_url("MariaDB://db/app").unwrap().name(), "mysql");
        assert_eq!(dialect_for_url("sqlite::memory:").unwrap().name(), "sqlite");
        assert!(matches!(
            dialect_for_url("postgres://localhost/app"),
            Err(CoreError::Config(_))
        ));
    }

    #[test]
    fn test_auto_increment_keyword() {
        let id = ColumnDefinition::integer().primary_key().auto_increment();
        let counter = ColumnDefinition::integer().auto_increment();

        assert_eq!(MySqlDialect::new().auto_increment_keyword(&id), Some("AUTO_INCREMENT"));
        assert_eq!(MySqlDialect::new().auto_increment_keyword(&counter), Some("AUTO_INCREMENT"));
        assert_eq!(SqliteDialect::new().auto_increment_keyword(&id), Some("AUTOINCREMENT"));
        assert_eq!(SqliteDialect::new().auto_increment_keyword(&counter), None);
    }

    #[test]
    fn test_select_expr_casts() {
        let mysql = MySqlDialect::new();
        assert_eq!(mysql.select_expr("name", &SqlType::Varchar(10)), "name");
        assert_eq!(
            mysql.select_expr("born", &SqlType::Date),
            "CAST(born AS CHAR) AS born"
        );
        assert_eq!(
            mysql.select_expr("active", &SqlType::Boolean),
            "CAST(active AS SIGNED) AS active"
        );

        let sqlite = SqliteDialect::new();
        assert_eq!(sqlite.select_expr("id", &SqlType::Integer), "id");
        assert_eq!(
            sqlite.select_expr("born", &SqlType::Date),
            "CAST(born AS TEXT) AS born"
        );
    }
}
