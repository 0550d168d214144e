//! Schema registry files.
//!
//! The registry is the explicit, ordered list of table definitions handed to
//! the migration engine. Applications can build it in code; the CLI loads it
//! from a TOML file:
//!
//! ```toml
//! [[tables]]
//! name = "users"
//!
//! [[tables.columns]]
//! name = "id"
//! type = "integer"
//! nullable = false
//! primary_key = true
//! auto_increment = true
//!
//! [[tables.columns]]
//! name = "email"
//! type = "varchar(255)"
//! nullable = false
//!
//! [[tables]]
//! name = "posts"
//!
//! [[tables.columns]]
//! name = "user_id"
//! type = "integer"
//!
//! [[tables.foreign_keys]]
//! column = "user_id"
//! references = "users"
//! ```
//!
//! Column order in the file is the declared column order. Foreign keys are
//! appended after the columns.

use std::path::Path;

use serde::Deserialize;

use crate::error::{CoreError, Result};
use crate::schema::{ColumnDefinition, DefaultValue, SqlType, TableDefinition};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SchemaFile {
    #[serde(default)]
    tables: Vec<TableSpec>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct TableSpec {
    name: String,
    #[serde(default)]
    columns: Vec<ColumnSpec>,
    #[serde(default)]
    foreign_keys: Vec<ForeignKeySpec>,
    relationships: Option<u32>,
    has_relationships: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ColumnSpec {
    name: String,
    #[serde(rename = "type")]
    sql_type: String,
    #[serde(default = "default_nullable")]
    nullable: bool,
    #[serde(default)]
    primary_key: bool,
    #[serde(default)]
    auto_increment: bool,
    default: Option<toml::Value>,
    default_expr: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ForeignKeySpec {
    column: String,
    references: String,
    #[serde(default = "default_reference_column")]
    reference_column: String,
}

const fn default_nullable() -> bool {
    true
}

fn default_reference_column() -> String {
    "id".to_string()
}

/// Loads table definitions from a TOML schema file.
///
/// # Errors
///
/// Returns [`CoreError::Io`] when the file cannot be read and
/// [`CoreError::Registry`] when it is malformed.
pub fn load_schema(path: impl AsRef<Path>) -> Result<Vec<TableDefinition>> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)?;
    parse_schema(&text, path)
}

/// Parses table definitions from TOML text. `origin` is only used in error
/// messages.
///
/// # Errors
///
/// Returns [`CoreError::Registry`] when the text is malformed.
pub fn parse_schema(text: &str, origin: impl AsRef<Path>) -> Result<Vec<TableDefinition>> {
    let origin = origin.as_ref();
    let registry_error = |message: String| CoreError::Registry {
        path: origin.to_path_buf(),
        message,
    };

    let file: SchemaFile = toml::from_str(text).map_err(|e| registry_error(e.to_string()))?;

    let mut tables = Vec::with_capacity(file.tables.len());
    for spec in file.tables {
        let table = build_table(spec).map_err(registry_error)?;
        if tables
            .iter()
            .any(|existing: &TableDefinition| existing.name() == table.name())
        {
            return Err(registry_error(format!(
                "table '{}' is defined more than once",
                table.name()
            )));
        }
        tables.push(table);
    }
    Ok(tables)
}

/// Builds one table. Errors are plain messages; the caller adds the file.
fn build_table(spec: TableSpec) -> std::result::Result<TableDefinition, String> {
    let mut table = TableDefinition::new(&spec.name);

    for column in spec.columns {
        let name = column.name.clone();
        let definition = build_column(column).map_err(|e| format!("{}.{name}: {e}", spec.name))?;
        table.add_column(name, definition);
    }

    for fk in spec.foreign_keys {
        table = table.foreign_key(&fk.column, &fk.references, fk.reference_column);
    }

    if let Some(count) = spec.relationships {
        table = table.relationships(count);
    }
    if let Some(flag) = spec.has_relationships {
        table = table.with_has_relationships(flag);
    }

    Ok(table)
}

fn build_column(spec: ColumnSpec) -> std::result::Result<ColumnDefinition, String> {
    let sql_type: SqlType = spec.sql_type.parse().map_err(|e: CoreError| e.to_string())?;
    let mut column = ColumnDefinition::new(sql_type);
    if !spec.nullable {
        column = column.not_null();
    }
    if spec.primary_key {
        column = column.primary_key();
    }
    if spec.auto_increment {
        column = column.auto_increment();
    }

    let default = match (spec.default, spec.default_expr) {
        (Some(_), Some(_)) => {
            return Err("set either `default` or `default_expr`, not both".to_string())
        }
        (Some(value), None) => Some(default_from_toml(value)?),
        (None, Some(expr)) => Some(DefaultValue::Expression(expr)),
        (None, None) => None,
    };
    if let Some(default) = default {
        column = column.default(default);
    }

    Ok(column)
}

fn default_from_toml(value: toml::Value) -> std::result::Result<DefaultValue, String> {
    match value {
        toml::Value::String(s) => Ok(DefaultValue::Literal(s)),
        toml::Value::Integer(i) => Ok(DefaultValue::Integer(i)),
        toml::Value::Boolean(b) => Ok(DefaultValue::Bool(b)),
        other => Err(format!(
            "unsupported default value `{other}` (use default_expr for SQL expressions)"
        )),
    }
}
