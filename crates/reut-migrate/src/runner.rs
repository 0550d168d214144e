//! Migration runner.
//!
//! The runner drives one convergence cycle:
//!
//! ```text
//! Init -> Connected -> LedgerReady -> Diffing -> Applying -> Done
//!   \________\____________\_____________\__________\-----> Failed
//! ```
//!
//! Only connection and ledger setup failures end a run. Inspection, DDL and
//! ledger-write failures are captured per table in the returned
//! [`MigrationReport`] and the remaining tables are still processed. Every
//! run recomputes its plan from the live schema, so rerunning after a
//! partial failure picks up where the previous run stopped.

use chrono::Utc;
use reut_core::{Database, DatabaseConfig, TableDefinition, LEDGER_TABLE};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::diff::{diff_table, find_orphans};
use crate::error::{MigrateError, Result};
use crate::inspector::SchemaInspector;
use crate::ledger::MigrationLedger;
use crate::operations::MigrationOperation;
use crate::report::{
    MigrationReport, OperationReport, OperationStatus, ReportError, StatusReport, TablePlan,
    TableReport,
};

/// Runner lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    /// Not connected yet.
    Init,
    /// Connection established.
    Connected,
    /// Ledger table present and batch number known.
    LedgerReady,
    /// Computing per-table plans.
    Diffing,
    /// Executing DDL.
    Applying,
    /// Every table was attempted.
    Done,
    /// An unrecoverable error ended the run.
    Failed,
}

/// Orders definitions for processing: tables without relationships first in
/// the given order, then the others by ascending relationship count. The
/// sort is stable.
#[must_use]
pub fn dependency_order(definitions: &[TableDefinition]) -> Vec<&TableDefinition> {
    let (mut dependent, independent): (Vec<&TableDefinition>, Vec<&TableDefinition>) =
        definitions.iter().partition(|def| def.has_relationships());
    dependent.sort_by_key(|def| def.relationship_count());
    independent.into_iter().chain(dependent).collect()
}

/// Applies table definitions to a database.
#[derive(Debug)]
pub struct MigrationRunner {
    config: Option<DatabaseConfig>,
    db: Option<Database>,
    state: RunState,
    drop_orphans: bool,
}

impl MigrationRunner {
    /// Creates a runner that connects on first use.
    #[must_use]
    pub fn new(config: DatabaseConfig) -> Self {
        Self {
            config: Some(config),
            db: None,
            state: RunState::Init,
            drop_orphans: false,
        }
    }

    /// Creates a runner over an existing connection.
    #[must_use]
    pub fn from_database(db: Database) -> Self {
        Self {
            config: None,
            db: Some(db),
            state: RunState::Connected,
            drop_orphans: false,
        }
    }

    /// Drops live tables that have no definition at the end of a run.
    #[must_use]
    pub fn drop_orphans(mut self, enabled: bool) -> Self {
        self.drop_orphans = enabled;
        self
    }

    /// Returns the current state.
    #[must_use]
    pub fn state(&self) -> RunState {
        self.state
    }

    /// Returns the connection, if established.
    #[must_use]
    pub fn database(&self) -> Option<&Database> {
        self.db.as_ref()
    }

    /// Connects to the database if not already connected.
    ///
    /// # Errors
    ///
    /// Returns [`MigrateError::Connection`] when the database is unreachable;
    /// the runner is then `Failed`.
    pub async fn connect(&mut self) -> Result<Database> {
        if let Some(db) = &self.db {
            return Ok(db.clone());
        }
        let Some(config) = &self.config else {
            self.state = RunState::Failed;
            return Err(MigrateError::InvalidState(
                "runner has neither a connection nor a configuration".to_string(),
            ));
        };

        match Database::connect(config).await {
            Ok(db) => {
                info!(url = %config.display_url(), schema = %db.schema(), "Connected");
                self.db = Some(db.clone());
                self.state = RunState::Connected;
                Ok(db)
            }
            Err(err) => {
                self.state = RunState::Failed;
                Err(MigrateError::Connection(err))
            }
        }
    }

    /// Runs one full convergence cycle.
    ///
    /// # Errors
    ///
    /// Returns an error only for failures that prevent any work: connection,
    /// ledger setup and the catalog listing used for orphan detection.
    pub async fn run(&mut self, definitions: &[TableDefinition]) -> Result<MigrationReport> {
        let db = self.connect().await?;
        let inspector = SchemaInspector::new(db.clone());
        let ledger = MigrationLedger::new(db.clone());

        let batch = match prepare_ledger(&ledger).await {
            Ok(batch) => batch,
            Err(err) => return Err(self.fail(err)),
        };
        self.state = RunState::LedgerReady;
        info!(batch, tables = definitions.len(), "Ledger ready");

        self.state = RunState::Diffing;
        let plans = plan_tables(&inspector, definitions).await;
        let orphans = match inspector.list_tables().await {
            Ok(live) => find_orphans(definitions, &live, LEDGER_TABLE),
            Err(err) => return Err(self.fail(err)),
        };
        for orphan in &orphans {
            warn!(table = %orphan, "Table has no definition");
        }

        self.state = RunState::Applying;
        let mut tables = Vec::with_capacity(plans.len() + orphans.len());
        for plan in plans {
            tables.push(apply_plan(&db, &ledger, plan, batch).await);
        }
        if self.drop_orphans {
            for orphan in &orphans {
                let plan = TablePlan {
                    table: orphan.clone(),
                    operations: vec![MigrationOperation::drop_table(orphan)],
                    error: None,
                };
                tables.push(apply_plan(&db, &ledger, plan, batch).await);
            }
        }

        self.state = RunState::Done;
        let report = MigrationReport {
            batch,
            tables,
            orphans,
            orphans_dropped: self.drop_orphans,
        };
        info!(
            batch,
            applied = report.count(OperationStatus::Applied),
            failed = report.count(OperationStatus::Failed),
            skipped = report.count(OperationStatus::Skipped),
            unrecorded = report.count(OperationStatus::Unrecorded),
            "Migration run finished"
        );
        Ok(report)
    }

    /// Computes per-table plans without applying anything.
    ///
    /// # Errors
    ///
    /// Returns [`MigrateError::Connection`] when the database is unreachable.
    pub async fn plan(&mut self, definitions: &[TableDefinition]) -> Result<Vec<TablePlan>> {
        let db = self.connect().await?;
        Ok(plan_tables(&SchemaInspector::new(db), definitions).await)
    }

    /// Reports ledger contents, pending operations and orphans. Read-only:
    /// the ledger table is not created when missing.
    ///
    /// # Errors
    ///
    /// Returns an error when the database is unreachable or the catalog
    /// cannot be read.
    pub async fn status(&mut self, definitions: &[TableDefinition]) -> Result<StatusReport> {
        let db = self.connect().await?;
        let inspector = SchemaInspector::new(db.clone());
        let ledger = MigrationLedger::new(db);

        let ledger_exists = ledger.exists().await?;
        let records = if ledger_exists {
            ledger.records().await?
        } else {
            Vec::new()
        };

        let pending = plan_tables(&inspector, definitions)
            .await
            .into_iter()
            .filter(|plan| !plan.is_converged())
            .collect();
        let orphans = find_orphans(definitions, &inspector.list_tables().await?, LEDGER_TABLE);

        Ok(StatusReport {
            ledger_exists,
            records,
            pending,
            orphans,
        })
    }

    fn fail(&mut self, err: MigrateError) -> MigrateError {
        self.state = RunState::Failed;
        err
    }
}

async fn prepare_ledger(ledger: &MigrationLedger) -> Result<i64> {
    ledger.ensure_table().await?;
    ledger.current_batch().await
}

async fn plan_tables(inspector: &SchemaInspector, definitions: &[TableDefinition]) -> Vec<TablePlan> {
    let mut plans = Vec::with_capacity(definitions.len());
    for definition in dependency_order(definitions) {
        let table = definition.name().to_string();
        let planned = match inspector.snapshot(&table).await {
            Ok(live) => diff_table(definition, &live, inspector.dialect()),
            Err(err) => Err(err),
        };
        let plan = match planned {
            Ok(operations) => {
                debug!(table = %table, operations = operations.len(), "Planned table");
                TablePlan {
                    table,
                    operations,
                    error: None,
                }
            }
            Err(err) => {
                warn!(table = %table, error = %err, "Could not plan table");
                TablePlan {
                    table,
                    operations: Vec::new(),
                    error: Some(ReportError::from(&err)),
                }
            }
        };
        plans.push(plan);
    }
    plans
}

async fn apply_plan(
    db: &Database,
    ledger: &MigrationLedger,
    plan: TablePlan,
    batch: i64,
) -> TableReport {
    let mut operations = Vec::with_capacity(plan.operations.len());
    let mut failed = false;

    for operation in plan.operations {
        let name = operation.record_name(Utc::now());
        if failed {
            operations.push(OperationReport {
                name,
                operation,
                status: OperationStatus::Skipped,
                error: None,
            });
            continue;
        }

        info!(table = %plan.table, operation = %operation.name(), "Applying operation");
        debug!(sql = %operation.sql(), "Executing SQL");
        if let Err(source) = sqlx::raw_sql(operation.sql()).execute(db.pool()).await {
            let err = MigrateError::Ddl {
                operation: operation.name(),
                source,
            };
            warn!(table = %plan.table, error = %err, "Operation failed, skipping rest of table");
            failed = true;
            operations.push(OperationReport {
                name,
                operation,
                status: OperationStatus::Failed,
                error: Some(ReportError::from(&err)),
            });
            continue;
        }

        let (status, error) = match ledger.record(&name, operation.sql(), batch).await {
            Ok(_) => (OperationStatus::Applied, None),
            Err(err) => {
                warn!(name = %name, error = %err, "Operation applied but not recorded");
                (OperationStatus::Unrecorded, Some(ReportError::from(&err)))
            }
        };
        operations.push(OperationReport {
            name,
            operation,
            status,
            error,
        });
    }

    TableReport {
        table: plan.table,
        operations,
        error: plan.error,
    }
}

#[cfg(test)]
mod tests {
    use reut_core::ColumnDefinition;

    use super::*;

    async fn memory_runner() -> MigrationRunner {
        let config = DatabaseConfig::new("sqlite::memory:").unwrap();
        let mut runner = MigrationRunner::new(config);
        assert_eq!(runner.state(), RunState::Init);
        runner.connect().await.unwrap();
        assert_eq!(runner.state(), RunState::Connected);
        runner
    }

    fn table(name: &str, relationships: u32) -> TableDefinition {
        TableDefinition::new(name)
            .column("id", ColumnDefinition::integer())
            .relationships(relationships)
    }

    #[test]
    fn test_dependency_order() {
        let defs = vec![
            table("comments", 2),
            table("users", 0),
            table("posts", 1),
            table("tags", 0),
            table("likes", 1),
        ];
        let order: Vec<&str> = dependency_order(&defs).iter().map(|d| d.name()).collect();
        assert_eq!(order, vec!["users", "tags", "posts", "likes", "comments"]);
    }

    #[tokio::test]
    async fn test_run_reaches_done() {
        let mut runner = memory_runner().await;
        let defs = vec![table("users", 0)];

        let report = runner.run(&defs).await.unwrap();
        assert_eq!(runner.state(), RunState::Done);
        assert_eq!(report.batch, 1);
        assert_eq!(report.count(OperationStatus::Applied), 1);
        assert!(!report.has_failures());
    }

    #[tokio::test]
    async fn test_plan_does_not_apply() {
        let mut runner = memory_runner().await;
        let defs = vec![table("users", 0)];

        let plans = runner.plan(&defs).await.unwrap();
        assert_eq!(plans.len(), 1);
        assert_eq!(plans[0].operations[0].name(), "create_users_table");

        let again = runner.plan(&defs).await.unwrap();
        assert_eq!(plans, again);
    }

    #[tokio::test]
    async fn test_status_is_read_only() {
        let mut runner = memory_runner().await;
        let status = runner.status(&[table("users", 0)]).await.unwrap();
        assert!(!status.ledger_exists);
        assert!(status.records.is_empty());
        assert_eq!(status.pending.len(), 1);
        assert!(!status.is_up_to_date());

        let status = runner.status(&[]).await.unwrap();
        assert!(!status.ledger_exists);
    }

    #[tokio::test]
    async fn test_connection_failure_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}", dir.path().join("nope").join("x.db").display());
        let mut runner = MigrationRunner::new(DatabaseConfig::new(url).unwrap());

        let err = runner.run(&[table("users", 0)]).await.unwrap_err();
        assert!(matches!(err, MigrateError::Connection(_)));
        assert!(err.is_fatal());
        assert_eq!(runner.state(), RunState::Failed);
    }
}
