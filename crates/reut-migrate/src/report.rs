//! Structured results of a run.
//!
//! The runner returns these instead of printing; the CLI renders them as
//! ASCII tables or JSON.

use serde::{Deserialize, Serialize};

use crate::error::{ErrorKind, MigrateError};
use crate::ledger::MigrationRecord;
use crate::operations::MigrationOperation;

/// An error captured in a report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportError {
    /// Error classification.
    pub kind: ErrorKind,
    /// Display text of the error.
    pub message: String,
}

impl From<&MigrateError> for ReportError {
    fn from(err: &MigrateError) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

/// Operations planned for one table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TablePlan {
    /// Table name.
    pub table: String,
    /// Operations in execution order.
    pub operations: Vec<MigrationOperation>,
    /// Set when the table could not be inspected or diffed.
    pub error: Option<ReportError>,
}

impl TablePlan {
    /// Returns whether the table is already converged.
    #[must_use]
    pub fn is_converged(&self) -> bool {
        self.operations.is_empty() && self.error.is_none()
    }
}

/// Outcome of one operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationStatus {
    /// DDL executed and recorded in the ledger.
    Applied,
    /// DDL executed but the ledger write failed.
    Unrecorded,
    /// DDL rejected by the database.
    Failed,
    /// Not attempted because an earlier operation on the table failed.
    Skipped,
}

impl OperationStatus {
    /// Returns the lowercase label used in reports.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Applied => "applied",
            Self::Unrecorded => "unrecorded",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
        }
    }
}

/// One executed (or skipped) operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationReport {
    /// Ledger record name.
    pub name: String,
    /// The operation.
    pub operation: MigrationOperation,
    /// What happened.
    pub status: OperationStatus,
    /// Error for `Failed` and `Unrecorded` operations.
    pub error: Option<ReportError>,
}

/// Everything that happened to one table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableReport {
    /// Table name.
    pub table: String,
    /// Operations in execution order.
    pub operations: Vec<OperationReport>,
    /// Set when the table could not be planned.
    pub error: Option<ReportError>,
}

impl TableReport {
    /// Returns whether anything on this table went wrong.
    #[must_use]
    pub fn has_failures(&self) -> bool {
        self.error.is_some()
            || self
                .operations
                .iter()
                .any(|op| op.status != OperationStatus::Applied)
    }
}

/// Result of a full migration run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationReport {
    /// Batch number shared by every record of this run.
    pub batch: i64,
    /// Per-table results in processing order.
    pub tables: Vec<TableReport>,
    /// Live tables with no definition.
    pub orphans: Vec<String>,
    /// Whether orphans were dropped (their results are in `tables`).
    pub orphans_dropped: bool,
}

impl MigrationReport {
    /// Iterates over every operation report.
    pub fn operations(&self) -> impl Iterator<Item = &OperationReport> {
        self.tables.iter().flat_map(|table| table.operations.iter())
    }

    /// Number of operations with the given status.
    #[must_use]
    pub fn count(&self, status: OperationStatus) -> usize {
        self.operations().filter(|op| op.status == status).count()
    }

    /// Returns whether the run changed nothing.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.operations().next().is_none()
    }

    /// Returns whether any table or operation failed.
    #[must_use]
    pub fn has_failures(&self) -> bool {
        self.tables.iter().any(TableReport::has_failures)
    }
}

/// Read-only view of the ledger and the pending work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusReport {
    /// Whether the ledger table exists.
    pub ledger_exists: bool,
    /// Ledger records ordered by batch, then id.
    pub records: Vec<MigrationRecord>,
    /// Plans for tables that are not converged.
    pub pending: Vec<TablePlan>,
    /// Live tables with no definition.
    pub orphans: Vec<String>,
}

impl StatusReport {
    /// Returns whether the database matches the definitions.
    #[must_use]
    pub fn is_up_to_date(&self) -> bool {
        self.pending.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn op_report(status: OperationStatus) -> OperationReport {
        OperationReport {
            name: "drop_c_from_t_table_20240101000000".to_string(),
            operation: MigrationOperation::drop_column("t", "c"),
            status,
            error: None,
        }
    }

    #[test]
    fn test_report_counts() {
        let report = MigrationReport {
            batch: 3,
            tables: vec![
                TableReport {
                    table: "t".to_string(),
                    operations: vec![
                        op_report(OperationStatus::Applied),
                        op_report(OperationStatus::Failed),
                        op_report(OperationStatus::Skipped),
                    ],
                    error: None,
                },
                TableReport {
                    table: "u".to_string(),
                    operations: Vec::new(),
                    error: None,
                },
            ],
            orphans: Vec::new(),
            orphans_dropped: false,
        };

        assert_eq!(report.count(OperationStatus::Applied), 1);
        assert_eq!(report.count(OperationStatus::Skipped), 1);
        assert!(report.has_failures());
        assert!(!report.is_noop());
        assert!(!report.tables[1].has_failures());
    }

    #[test]
    fn test_status_serializes_lowercase() {
        let json = serde_json::to_value(op_report(OperationStatus::Unrecorded)).unwrap();
        assert_eq!(json["status"], "unrecorded");
        assert_eq!(OperationStatus::Unrecorded.as_str(), "unrecorded");
    }
}
