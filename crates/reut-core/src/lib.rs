//! Declarative table definitions for reut.
//!
//! This crate holds the pieces shared by the migration engine
//! (`reut-migrate`) and the data access layer (`reut-orm`):
//!
//! - **Schema** - [`TableDefinition`] and [`ColumnDefinition`], the in-code
//!   description of what a table should look like
//! - **Registry** - loading an ordered list of definitions from a TOML file
//! - **Dialect** - the catalog and ledger SQL that differs between MySQL and
//!   SQLite
//! - **Config** - [`DatabaseConfig`] and the connected [`Database`] handle
//!
//! # Example
//!
//! ```rust
//! use reut_core::prelude::*;
//!
//! let accounts = TableDefinition::new("Accounts")
//!     .column(
//!         "id",
//!         ColumnDefinition::integer().not_null().primary_key().auto_increment(),
//!     )
//!     .column("name", ColumnDefinition::varchar(255).not_null());
//!
//! assert_eq!(
//!     accounts.create_table_sql().unwrap(),
//!     "CREATE TABLE IF NOT EXISTS accounts (\n  \
//!      id INTEGER NOT NULL PRIMARY KEY AUTO_INCREMENT,\n  \
//!      name VARCHAR(255) NOT NULL\n);"
//! );
//! ```

pub mod config;
pub mod dialect;
pub mod error;
pub mod registry;
pub mod schema;

pub use config::{ensure_database_exists, Database, DatabaseConfig};
pub use dialect::{dialect_for_url, Dialect, MySqlDialect, SqliteDialect, LEDGER_TABLE};
pub use error::{CoreError, Result};
pub use registry::{load_schema, parse_schema};
pub use schema::{
    is_foreign_key_entry, ColumnDefinition, DefaultValue, SqlType, TableDefinition,
    FOREIGN_KEY_MARKER,
};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::config::{Database, DatabaseConfig};
    pub use crate::dialect::Dialect;
    pub use crate::error::{CoreError, Result};
    pub use crate::schema::{ColumnDefinition, DefaultValue, SqlType, TableDefinition};
}
