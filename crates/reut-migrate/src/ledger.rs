//! Ledger of applied migrations.
//!
//! This module manages the `migrations` table. Records are only ever
//! inserted; the engine never updates or deletes them.

use chrono::{DateTime, NaiveDateTime, Utc};
use reut_core::{Database, LEDGER_TABLE};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{MigrateError, Result};

/// A record of an applied operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationRecord {
    /// Row id in the ledger table.
    pub id: i64,
    /// Unique record name (operation name plus timestamp).
    pub name: String,
    /// SQL that was executed.
    pub sql_text: String,
    /// Batch the record belongs to.
    pub batch: i64,
    /// When the record was written, if the database reported a timestamp.
    pub applied_at: Option<DateTime<Utc>>,
}

/// Reads and writes the ledger table.
#[derive(Debug, Clone)]
pub struct MigrationLedger {
    db: Database,
}

impl MigrationLedger {
    /// Creates a ledger over a connected database.
    #[must_use]
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Ensures the ledger table exists.
    ///
    /// # Errors
    ///
    /// Returns [`MigrateError::Database`] when the table cannot be created.
    pub async fn ensure_table(&self) -> Result<()> {
        sqlx::query(self.db.dialect().create_ledger_sql())
            .execute(self.db.pool())
            .await?;
        Ok(())
    }

    /// Checks whether the ledger table exists, without creating it.
    ///
    /// # Errors
    ///
    /// Returns [`MigrateError::Database`] when the catalog query fails.
    pub async fn exists(&self) -> Result<bool> {
        let count: i64 = sqlx::query_scalar(self.db.dialect().table_exists_sql())
            .bind(self.db.schema())
            .bind(LEDGER_TABLE)
            .fetch_one(self.db.pool())
            .await?;
        Ok(count > 0)
    }

    /// Returns the batch number for a new run: one past the highest recorded
    /// batch, or 1 for an empty ledger.
    ///
    /// # Errors
    ///
    /// Returns [`MigrateError::Database`] when the ledger cannot be read.
    pub async fn current_batch(&self) -> Result<i64> {
        let max: i64 = sqlx::query_scalar(self.db.dialect().max_batch_sql())
            .fetch_one(self.db.pool())
            .await?;
        Ok(max + 1)
    }

    /// Records an applied operation.
    ///
    /// Returns `false` when a record with the same name already exists; the
    /// insert is ignored in that case.
    ///
    /// # Errors
    ///
    /// Returns [`MigrateError::LedgerWrite`] when the insert fails.
    pub async fn record(&self, name: &str, sql: &str, batch: i64) -> Result<bool> {
        let result = sqlx::query(self.db.dialect().insert_ledger_sql())
            .bind(name)
            .bind(sql)
            .bind(batch)
            .execute(self.db.pool())
            .await
            .map_err(|source| MigrateError::LedgerWrite {
                name: name.to_string(),
                source,
            })?;

        let inserted = result.rows_affected() > 0;
        if inserted {
            debug!(name = %name, batch, "Recorded migration");
        } else {
            warn!(name = %name, "Ledger already holds a record with this name");
        }
        Ok(inserted)
    }

    /// Returns every record ordered by batch, then id.
    ///
    /// # Errors
    ///
    /// Returns [`MigrateError::Database`] when the ledger cannot be read.
    pub async fn records(&self) -> Result<Vec<MigrationRecord>> {
        let rows: Vec<(i64, String, String, i64, Option<String>)> =
            sqlx::query_as(self.db.dialect().select_ledger_sql())
                .fetch_all(self.db.pool())
                .await?;

        Ok(rows
            .into_iter()
            .map(|(id, name, sql_text, batch, applied_at)| MigrationRecord {
                id,
                name,
                sql_text,
                batch,
                applied_at: applied_at.as_deref().and_then(parse_timestamp),
            })
            .collect())
    }
}

fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S")
                .map(|dt| dt.and_utc())
                .ok()
        })
}

#[cfg(test)]
mod tests {
    use reut_core::DatabaseConfig;

    use super::*;

    async fn ledger() -> MigrationLedger {
        let config = DatabaseConfig::new("sqlite::memory:").unwrap();
        MigrationLedger::new(Database::connect(&config).await.unwrap())
    }

    #[tokio::test]
    async fn test_ensure_table_is_idempotent() {
        let ledger = ledger().await;
        assert!(!ledger.exists().await.unwrap());
        ledger.ensure_table().await.unwrap();
        ledger.ensure_table().await.unwrap();
        assert!(ledger.exists().await.unwrap());
        assert_eq!(ledger.current_batch().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_record_ignores_duplicates() {
        let ledger = ledger().await;
        ledger.ensure_table().await.unwrap();

        assert!(ledger
            .record("create_users_table_20240101000000", "CREATE TABLE users", 1)
            .await
            .unwrap());
        assert!(!ledger
            .record("create_users_table_20240101000000", "CREATE TABLE users", 2)
            .await
            .unwrap());

        let records = ledger.records().await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].batch, 1);
        assert!(records[0].applied_at.is_some());
    }

    #[tokio::test]
    async fn test_batches_increase() {
        let ledger = ledger().await;
        ledger.ensure_table().await.unwrap();

        ledger.record("b", "SELECT 1", 2).await.unwrap();
        ledger.record("a", "SELECT 1", 1).await.unwrap();
        ledger.record("c", "SELECT 1", 2).await.unwrap();
        assert_eq!(ledger.current_batch().await.unwrap(), 3);

        let names: Vec<String> = ledger
            .records()
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.name)
            .collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_record_without_table_is_ledger_write_error() {
        let ledger = ledger().await;
        let err = ledger.record("x", "SELECT 1", 1).await.unwrap_err();
        assert!(matches!(err, MigrateError::LedgerWrite { ref name, .. } if name == "x"));
    }

    #[test]
    fn test_parse_timestamp() {
        let ts = parse_timestamp("2024-05-01 12:30:00").unwrap();
        assert_eq!(ts.to_rfc3339(), "2024-05-01T12:30:00+00:00");
        assert!(parse_timestamp("yesterday").is_none());
    }
}
