//! Diffing table definitions against live tables.
//!
//! Only column presence is compared. Type, nullability and default changes
//! on an existing column are not detected.

use reut_core::{Dialect, TableDefinition};

use crate::error::{MigrateError, Result};
use crate::inspector::LiveTable;
use crate::operations::MigrationOperation;

/// Computes the operations that bring `live` in line with `definition`.
///
/// An absent table yields a single `CreateTable`. An existing table yields
/// one `AddColumn` per missing column in declared order, followed by one
/// `DropColumn` per extra live column in database order. Foreign-key entries
/// are never compared. Column SQL is rendered for `dialect`.
///
/// # Errors
///
/// Returns [`MigrateError::Validation`] when a table has to be created from a
/// definition without columns.
pub fn diff_table(
    definition: &TableDefinition,
    live: &LiveTable,
    dialect: &dyn Dialect,
) -> Result<Vec<MigrationOperation>> {
    let table = definition.name();

    let live_columns = match live {
        LiveTable::Absent => {
            let op = MigrationOperation::create_table(definition, dialect)
                .map_err(MigrateError::Validation)?;
            return Ok(vec![op]);
        }
        LiveTable::Columns(columns) => columns,
    };

    let mut operations: Vec<MigrationOperation> = definition
        .model_columns()
        .filter(|(name, _)| !live_columns.iter().any(|live| live.as_str() == *name))
        .map(|(name, column)| MigrationOperation::add_column(table, name, column, dialect))
        .collect();

    operations.extend(
        live_columns
            .iter()
            .filter(|live| !definition.has_column(live))
            .map(|live| MigrationOperation::drop_column(table, live)),
    );

    Ok(operations)
}

/// Returns the live tables that no definition describes, in database order.
/// The ledger table is never an orphan.
#[must_use]
pub fn find_orphans(
    definitions: &[TableDefinition],
    live_tables: &[String],
    ledger_table: &str,
) -> Vec<String> {
    live_tables
        .iter()
        .filter(|table| table.as_str() != ledger_table)
        .filter(|table| !definitions.iter().any(|def| def.name() == table.as_str()))
        .cloned()
        .collect()
}
