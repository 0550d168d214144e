//! Table data access for reut.
//!
//! A [`Repository`] wraps one [`TableDefinition`] and a connected
//! [`Database`]. Rows travel as JSON maps ([`Row`]) keyed by column name:
//!
//! - `find_all`, `find_one`, `search` and `find_page` read rows
//! - `add_one`, `update` and `delete` write one statement each
//! - `add_many`, `update_many` and `delete_many` run in a single transaction
//!   and roll back entirely on the first failure
//!
//! Record and criteria keys are checked against the definition before any SQL
//! is built; values are always bound as parameters.
//!
//! # Example
//!
//! ```rust,ignore
//! use reut_orm::prelude::*;
//! use serde_json::json;
//!
//! let people = TableDefinition::new("people")
//!     .column("id", ColumnDefinition::integer().not_null().primary_key())
//!     .column("name", ColumnDefinition::varchar(100).not_null());
//!
//! let repo = Repository::new(db, people);
//! let mut ada = Row::new();
//! ada.insert("name".into(), json!("Ada"));
//! repo.add_one(&ada).await?;
//!
//! let page = repo.find_page(1, 20).await?;
//! ```
//!
//! [`TableDefinition`]: reut_core::TableDefinition
//! [`Database`]: reut_core::Database

pub mod error;
pub mod page;
pub mod repository;
pub mod value;

pub use error::{OrmError, Result};
pub use page::{paginate, Page};
pub use repository::Repository;
pub use value::{Row, SqlParam};

/// Prelude for convenient imports.
pub mod prelude {
    pub use reut_core::prelude::{
        ColumnDefinition, Database, DatabaseConfig, DefaultValue, SqlType, TableDefinition,
    };

    pub use crate::error::OrmError;
    pub use crate::page::{paginate, Page};
    pub use crate::repository::Repository;
    pub use crate::value::{Row, SqlParam};
}
