//! Live schema inspection.
//!
//! Every call goes to the database catalog; nothing is cached, so a rerun
//! always sees the effects of the previous one.

use reut_core::{Database, Dialect};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;

/// What the database currently holds for one table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "columns", rename_all = "snake_case")]
pub enum LiveTable {
    /// The table does not exist.
    Absent,
    /// The table exists with these columns, in ordinal order.
    Columns(Vec<String>),
}

impl LiveTable {
    /// Returns whether the table exists.
    #[must_use]
    pub fn exists(&self) -> bool {
        matches!(self, Self::Columns(_))
    }
}

/// Reads table and column metadata from the database catalog.
#[derive(Debug, Clone)]
pub struct SchemaInspector {
    db: Database,
}

impl SchemaInspector {
    /// Creates an inspector over a connected database.
    #[must_use]
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Returns the dialect of the inspected database.
    #[must_use]
    pub fn dialect(&self) -> &dyn Dialect {
        self.db.dialect()
    }

    /// Checks whether a base table exists in the configured schema.
    ///
    /// # Errors
    ///
    /// Returns [`MigrateError::Database`](crate::error::MigrateError::Database) when the catalog
    /// query fails.
    pub async fn table_exists(&self, table: &str) -> Result<bool> {
        let count: i64 = sqlx::query_scalar(self.db.dialect().table_exists_sql())
            .bind(self.db.schema())
            .bind(table)
            .fetch_one(self.db.pool())
            .await?;
        Ok(count > 0)
    }

    /// Returns the live column names of a table in ordinal order.
    ///
    /// A missing table yields an empty list.
    ///
    /// # Errors
    ///
    /// Returns [`MigrateError::Database`](crate::error::MigrateError::Database) when the catalog
    /// query fails.
    pub async fn describe_columns(&self, table: &str) -> Result<Vec<String>> {
        let columns: Vec<String> = sqlx::query_scalar(self.db.dialect().table_columns_sql())
            .bind(self.db.schema())
            .bind(table)
            .fetch_all(self.db.pool())
            .await?;
        Ok(columns)
    }

    /// Returns the live state of one table.
    ///
    /// # Errors
    ///
    /// Returns [`MigrateError::Database`](crate::error::MigrateError::Database) when the catalog
    /// query fails.
    pub async fn snapshot(&self, table: &str) -> Result<LiveTable> {
        if !self.table_exists(table).await? {
            debug!(table = %table, "Table absent");
            return Ok(LiveTable::Absent);
        }
        let columns = self.describe_columns(table).await?;
        debug!(table = %table, columns = columns.len(), "Table inspected");
        Ok(LiveTable::Columns(columns))
    }

    /// Returns the names of all base tables in the configured schema.
    ///
    /// # Errors
    ///
    /// Returns [`MigrateError::Database`](crate::error::MigrateError::Database) when the catalog
    /// query fails.
    pub async fn list_tables(&self) -> Result<Vec<String>> {
        let tables: Vec<String> = sqlx::query_scalar(self.db.dialect().list_tables_sql())
            .bind(self.db.schema())
            .fetch_all(self.db.pool())
            .await?;
        Ok(tables)
    }
}

#[cfg(test)]
mod tests {
    use reut_core::DatabaseConfig;

    use super::*;

    async fn memory_db() -> Database {
        let config = DatabaseConfig::new("sqlite::memory:").unwrap();
        Database::connect(&config).await.unwrap()
    }

    #[tokio::test]
    async fn test_snapshot_absent_and_present() {
        let db = memory_db().await;
        let inspector = SchemaInspector::new(db.clone());

        assert_eq!(inspector.snapshot("users").await.unwrap(), LiveTable::Absent);
        assert!(inspector.describe_columns("users").await.unwrap().is_empty());

        sqlx::query("CREATE TABLE users (id INTEGER, email TEXT, name TEXT)")
            .execute(db.pool())
            .await
            .unwrap();

        assert!(inspector.table_exists("users").await.unwrap());
        assert_eq!(
            inspector.snapshot("users").await.unwrap(),
            LiveTable::Columns(vec!["id".into(), "email".into(), "name".into()])
        );
    }

    #[tokio::test]
    async fn test_list_tables_skips_internal_tables() {
        let db = memory_db().await;
        sqlx::query("CREATE TABLE b (id INTEGER PRIMARY KEY AUTOINCREMENT)")
            .execute(db.pool())
            .await
            .unwrap();
        sqlx::query("CREATE TABLE a (id INTEGER)")
            .execute(db.pool())
            .await
            .unwrap();
        sqlx::query("CREATE VIEW v AS SELECT id FROM a")
            .execute(db.pool())
            .await
            .unwrap();

        let inspector = SchemaInspector::new(db);
        assert_eq!(inspector.list_tables().await.unwrap(), vec!["a", "b"]);
        assert!(!inspector.table_exists("v").await.unwrap());
    }
}
