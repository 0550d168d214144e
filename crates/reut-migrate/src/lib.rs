//! Convergent schema migrations.
//!
//! `reut-migrate` compares declarative [`TableDefinition`]s against the live
//! database and applies the difference:
//!
//! - Missing tables are created
//! - Missing columns are added, in declared order
//! - Columns the definition no longer has are dropped
//!
//! Every applied statement is recorded in the `migrations` ledger under a
//! per-run batch number. There are no migration files: rerunning simply
//! recomputes the difference from the live schema, so a converged database
//! produces no work.
//!
//! # Architecture
//!
//! - **Inspector** - reads tables and columns from the database catalog
//! - **Diff** - pure comparison of a definition with a live table
//! - **Ledger** - the `migrations` table
//! - **Runner** - the state machine tying the above together
//! - **Render** - ASCII output for reports
//!
//! # Example
//!
//! ```rust,ignore
//! use reut_migrate::prelude::*;
//!
//! let users = TableDefinition::new("users")
//!     .column("id", ColumnDefinition::integer().not_null().primary_key().auto_increment())
//!     .column("email", ColumnDefinition::varchar(255).not_null());
//!
//! let config = DatabaseConfig::new("mysql://root@localhost/app")?;
//! let mut runner = MigrationRunner::new(config);
//! let report = runner.run(&[users]).await?;
//! println!("{}", render_run(&report));
//! ```
//!
//! # CLI Usage
//!
//! ```bash
//! # Create the database if needed, then migrate
//! reut create
//!
//! # Apply pending changes, dropping tables with no definition
//! reut migrate --drop-orphans
//!
//! # Show the ledger and what would change
//! reut status --format json
//! ```
//!
//! [`TableDefinition`]: reut_core::TableDefinition

pub mod diff;
pub mod error;
pub mod inspector;
pub mod ledger;
pub mod operations;
pub mod render;
pub mod report;
pub mod runner;

/// Prelude for convenient imports.
pub mod prelude {
    pub use reut_core::prelude::*;

    pub use crate::diff::{diff_table, find_orphans};
    pub use crate::error::{ErrorKind, MigrateError};
    pub use crate::inspector::{LiveTable, SchemaInspector};
    pub use crate::ledger::{MigrationLedger, MigrationRecord};
    pub use crate::operations::MigrationOperation;
    pub use crate::render::{render_run, render_status, render_table};
    pub use crate::report::{
        MigrationReport, OperationReport, OperationStatus, ReportError, StatusReport, TablePlan,
        TableReport,
    };
    pub use crate::runner::{dependency_order, MigrationRunner, RunState};
}
