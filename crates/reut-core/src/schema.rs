//! Declarative table definitions.
//!
//! A [`TableDefinition`] describes what the application expects a table to
//! look like: an ordered list of named [`ColumnDefinition`]s plus the
//! relationship metadata used to order table creation. Definitions are built
//! by the caller and only ever read by the migration engine and the data
//! access layer.

use std::fmt;
use std::str::FromStr;

use crate::dialect::Dialect;
use crate::error::{CoreError, Result};

/// Marker carried by the names of foreign-key pseudo-entries.
///
/// Entries whose name contains this marker are table constraints, not
/// columns: they render inside `CREATE TABLE` but are ignored when comparing
/// against live columns.
pub const FOREIGN_KEY_MARKER: &str = "FOREIGN KEY";

/// SQL column types.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SqlType {
    /// `INTEGER`.
    Integer,
    /// `VARCHAR(n)`.
    Varchar(u32),
    /// `TEXT`.
    Text,
    /// `BOOLEAN`.
    Boolean,
    /// `DATE`.
    Date,
    /// `REFERENCES table(column)`, only used by foreign-key entries.
    References {
        /// Referenced table.
        table: String,
        /// Referenced column.
        column: String,
    },
}

impl SqlType {
    /// Returns the SQL rendering of this type.
    #[must_use]
    pub fn to_sql(&self) -> String {
        match self {
            Self::Integer => "INTEGER".to_string(),
            Self::Varchar(len) => format!("VARCHAR({len})"),
            Self::Text => "TEXT".to_string(),
            Self::Boolean => "BOOLEAN".to_string(),
            Self::Date => "DATE".to_string(),
            Self::References { table, column } => format!("REFERENCES {table}({column})"),
        }
    }
}

impl fmt::Display for SqlType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_sql())
    }
}

impl FromStr for SqlType {
    type Err = CoreError;

    /// Parses `integer`, `int`, `varchar(n)`, `varchar` (255), `text`,
    /// `boolean`, `bool` and `date`, ignoring case and surrounding spaces.
    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "integer" | "int" => Ok(Self::Integer),
            "varchar" => Ok(Self::Varchar(255)),
            "text" => Ok(Self::Text),
            "boolean" | "bool" => Ok(Self::Boolean),
            "date" => Ok(Self::Date),
            other => {
                let len = other
                    .strip_prefix("varchar(")
                    .and_then(|rest| rest.strip_suffix(')'))
                    .and_then(|len| len.trim().parse::<u32>().ok())
                    .filter(|len| *len > 0)
                    .ok_or_else(|| CoreError::InvalidType(s.to_string()))?;
                Ok(Self::Varchar(len))
            }
        }
    }
}

/// Default value for a column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DefaultValue {
    /// String literal, rendered quoted.
    Literal(String),
    /// Integer literal.
    Integer(i64),
    /// Boolean literal, rendered as `1` or `0`.
    Bool(bool),
    /// Raw SQL expression (e.g. `CURRENT_TIMESTAMP`).
    Expression(String),
}

impl DefaultValue {
    /// Returns the SQL representation of this default value.
    #[must_use]
    pub fn to_sql(&self) -> String {
        match self {
            Self::Literal(s) => format!("'{}'", s.replace('\'', "''")),
            Self::Integer(i) => i.to_string(),
            Self::Bool(b) => if *b { "1" } else { "0" }.to_string(),
            Self::Expression(expr) => expr.clone(),
        }
    }
}

/// The SQL shape of one column.
///
/// Built with a consuming builder and immutable afterwards. The column name
/// is not part of the definition: it is the key under which the definition
/// is stored in its [`TableDefinition`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDefinition {
    sql_type: SqlType,
    nullable: bool,
    primary_key: bool,
    auto_increment: bool,
    default: Option<DefaultValue>,
}

impl ColumnDefinition {
    /// Creates a nullable column of the given type with no constraints.
    #[must_use]
    pub fn new(sql_type: SqlType) -> Self {
        Self {
            sql_type,
            nullable: true,
            primary_key: false,
            auto_increment: false,
            default: None,
        }
    }

    /// `INTEGER` column.
    #[must_use]
    pub fn integer() -> Self {
        Self::new(SqlType::Integer)
    }

    /// `VARCHAR(len)` column.
    #[must_use]
    pub fn varchar(len: u32) -> Self {
        Self::new(SqlType::Varchar(len))
    }

    /// `TEXT` column.
    #[must_use]
    pub fn text() -> Self {
        Self::new(SqlType::Text)
    }

    /// `BOOLEAN` column.
    #[must_use]
    pub fn boolean() -> Self {
        Self::new(SqlType::Boolean)
    }

    /// `DATE` column.
    #[must_use]
    pub fn date() -> Self {
        Self::new(SqlType::Date)
    }

    /// Sets the column as NOT NULL.
    #[must_use]
    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    /// Sets the column as nullable.
    #[must_use]
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Marks the column as the primary key.
    ///
    /// Nullability is left as configured; rendering reflects exactly the
    /// flags that were set.
    #[must_use]
    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    /// Sets the column to auto-increment.
    #[must_use]
    pub fn auto_increment(mut self) -> Self {
        self.auto_increment = true;
        self
    }

    /// Sets the default value.
    #[must_use]
    pub fn default(mut self, value: DefaultValue) -> Self {
        self.default = Some(value);
        self
    }

    /// Returns the column type.
    #[must_use]
    pub fn sql_type(&self) -> &SqlType {
        &self.sql_type
    }

    /// Returns whether the column accepts NULL.
    #[must_use]
    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    /// Returns whether the column is the primary key.
    #[must_use]
    pub fn is_primary_key(&self) -> bool {
        self.primary_key
    }

    /// Returns whether the column auto-increments.
    #[must_use]
    pub fn is_auto_increment(&self) -> bool {
        self.auto_increment
    }

    /// Returns the default value, if any.
    #[must_use]
    pub fn default_value(&self) -> Option<&DefaultValue> {
        self.default.as_ref()
    }

    /// Renders `<TYPE>[ NOT NULL][ PRIMARY KEY][ AUTO_INCREMENT][ DEFAULT <value>]`.
    #[must_use]
    pub fn to_sql(&self) -> String {
        self.render(self.auto_increment.then_some("AUTO_INCREMENT"))
    }

    /// Renders the column for a specific engine. Only the auto-increment
    /// clause differs from [`to_sql`](Self::to_sql).
    #[must_use]
    pub fn to_sql_for(&self, dialect: &dyn Dialect) -> String {
        let keyword = if self.auto_increment {
            dialect.auto_increment_keyword(self)
        } else {
            None
        };
        self.render(keyword)
    }

    fn render(&self, auto_increment: Option<&str>) -> String {
        let mut sql = self.sql_type.to_sql();
        if !self.nullable {
            sql.push_str(" NOT NULL");
        }
        if self.primary_key {
            sql.push_str(" PRIMARY KEY");
        }
        if let Some(keyword) = auto_increment {
            sql.push(' ');
            sql.push_str(keyword);
        }
        if let Some(default) = &self.default {
            sql.push_str(" DEFAULT ");
            sql.push_str(&default.to_sql());
        }
        sql
    }
}

/// Declarative description of one table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableDefinition {
    name: String,
    columns: Vec<(String, ColumnDefinition)>,
    relationships: u32,
    has_relationships: bool,
}

impl TableDefinition {
    /// Creates an empty definition. The table name is normalized to lowercase.
    #[must_use]
    pub fn new(name: impl AsRef<str>) -> Self {
        Self {
            name: name.as_ref().to_lowercase(),
            columns: Vec::new(),
            relationships: 0,
            has_relationships: false,
        }
    }

    /// Adds a column, builder style.
    #[must_use]
    pub fn column(mut self, name: impl Into<String>, definition: ColumnDefinition) -> Self {
        self.add_column(name, definition);
        self
    }

    /// Adds a foreign-key constraint on `column` referencing
    /// `ref_table(ref_column)`, builder style.
    ///
    /// Each foreign key counts as one relationship.
    #[must_use]
    pub fn foreign_key(
        mut self,
        column: impl AsRef<str>,
        ref_table: impl AsRef<str>,
        ref_column: impl Into<String>,
    ) -> Self {
        let entry = format!("{FOREIGN_KEY_MARKER} ({})", column.as_ref());
        self.add_column(
            entry,
            ColumnDefinition::new(SqlType::References {
                table: ref_table.as_ref().to_lowercase(),
                column: ref_column.into(),
            }),
        );
        self.relationships += 1;
        self.has_relationships = true;
        self
    }

    /// Sets the relationship count explicitly; `has_relationships` follows it.
    #[must_use]
    pub fn relationships(mut self, count: u32) -> Self {
        self.relationships = count;
        self.has_relationships = count > 0;
        self
    }

    /// Overrides the `has_relationships` flag.
    #[must_use]
    pub fn with_has_relationships(mut self, has_relationships: bool) -> Self {
        self.has_relationships = has_relationships;
        self
    }

    /// Appends a column. A duplicate name replaces the earlier definition in
    /// place (last write wins, position kept).
    pub fn add_column(&mut self, name: impl Into<String>, definition: ColumnDefinition) {
        let name = name.into();
        match self.columns.iter_mut().find(|(existing, _)| *existing == name) {
            Some(slot) => slot.1 = definition,
            None => self.columns.push((name, definition)),
        }
    }

    /// Returns the (lowercase) table name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns every entry in declared order, foreign-key entries included.
    #[must_use]
    pub fn columns(&self) -> &[(String, ColumnDefinition)] {
        &self.columns
    }

    /// Returns the entries that are real columns, in declared order.
    pub fn model_columns(&self) -> impl Iterator<Item = (&str, &ColumnDefinition)> {
        self.columns
            .iter()
            .filter(|(name, _)| !is_foreign_key_entry(name))
            .map(|(name, def)| (name.as_str(), def))
    }

    /// Looks up a real column by name.
    #[must_use]
    pub fn column_definition(&self, name: &str) -> Option<&ColumnDefinition> {
        self.model_columns()
            .find(|(column, _)| *column == name)
            .map(|(_, def)| def)
    }

    /// Returns whether `name` is a real column of this table.
    #[must_use]
    pub fn has_column(&self, name: &str) -> bool {
        self.column_definition(name).is_some()
    }

    /// Number of relationships (foreign keys) this table carries.
    #[must_use]
    pub fn relationship_count(&self) -> u32 {
        self.relationships
    }

    /// Whether the table depends on other tables.
    #[must_use]
    pub fn has_relationships(&self) -> bool {
        self.has_relationships
    }

    /// Returns whether the definition has no entries at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Generates `CREATE TABLE IF NOT EXISTS` SQL in declared column order.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::EmptyTable`] when the definition has no entries.
    pub fn create_table_sql(&self) -> Result<String> {
        self.render_create(ColumnDefinition::to_sql)
    }

    /// Like [`create_table_sql`](Self::create_table_sql), with columns
    /// rendered for `dialect`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::EmptyTable`] when the definition has no entries.
    pub fn create_table_sql_for(&self, dialect: &dyn Dialect) -> Result<String> {
        self.render_create(|def| def.to_sql_for(dialect))
    }

    fn render_create(&self, render: impl Fn(&ColumnDefinition) -> String) -> Result<String> {
        if self.columns.is_empty() {
            return Err(CoreError::EmptyTable {
                table: self.name.clone(),
            });
        }

        let definitions: Vec<String> = self
            .columns
            .iter()
            .map(|(name, def)| format!("  {name} {}", render(def)))
            .collect();

        Ok(format!(
            "CREATE TABLE IF NOT EXISTS {} (\n{}\n);",
            self.name,
            definitions.join(",\n")
        ))
    }
}

/// Returns whether an entry name denotes a foreign-key pseudo-entry.
#[must_use]
pub fn is_foreign_key_entry(name: &str) -> bool {
    name.contains(FOREIGN_KEY_MARKER)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::{MySqlDialect, SqliteDialect};

    fn accounts() -> TableDefinition {
        TableDefinition::new("Accounts")
            .column(
                "id",
                ColumnDefinition::integer()
                    .not_null()
                    .primary_key()
                    .auto_increment(),
            )
            .column("name", ColumnDefinition::varchar(255).not_null())
    }

    #[test]
    fn test_column_rendering_order() {
        let col = ColumnDefinition::integer()
            .default(DefaultValue::Integer(0))
            .auto_increment()
            .primary_key()
            .not_null();
        assert_eq!(
            col.to_sql(),
            "INTEGER NOT NULL PRIMARY KEY AUTO_INCREMENT DEFAULT 0"
        );
    }

    #[test]
    fn test_column_rendering_omits_unset_clauses() {
        assert_eq!(ColumnDefinition::text().to_sql(), "TEXT");
        assert_eq!(ColumnDefinition::date().not_null().to_sql(), "DATE NOT NULL");
        assert_eq!(
            ColumnDefinition::boolean()
                .default(DefaultValue::Bool(true))
                .to_sql(),
            "BOOLEAN DEFAULT 1"
        );
    }

    #[test]
    fn test_default_literal_is_quoted() {
        let col = ColumnDefinition::varchar(20).default(DefaultValue::Literal("it's".into()));
        assert_eq!(col.to_sql(), "VARCHAR(20) DEFAULT 'it''s'");

        let col = ColumnDefinition::date().default(DefaultValue::Expression("CURRENT_DATE".into()));
        assert_eq!(col.to_sql(), "DATE DEFAULT CURRENT_DATE");
    }

    #[test]
    fn test_create_table_sql_accounts() {
        assert_eq!(
            accounts().create_table_sql().unwrap(),
            "CREATE TABLE IF NOT EXISTS accounts (\n  id INTEGER NOT NULL PRIMARY KEY AUTO_INCREMENT,\n  name VARCHAR(255) NOT NULL\n);"
        );
    }

    #[test]
    fn test_create_table_sql_per_dialect() {
        assert_eq!(
            accounts().create_table_sql_for(&MySqlDialect::new()).unwrap(),
            accounts().create_table_sql().unwrap()
        );
        assert_eq!(
            accounts().create_table_sql_for(&SqliteDialect::new()).unwrap(),
            "CREATE TABLE IF NOT EXISTS accounts (\n  id INTEGER NOT NULL PRIMARY KEY AUTOINCREMENT,\n  name VARCHAR(255) NOT NULL\n);"
        );
    }

    #[test]
    fn test_sqlite_drops_auto_increment_off_integer_primary_key() {
        let col = ColumnDefinition::integer().not_null().auto_increment();
        assert_eq!(col.to_sql_for(&SqliteDialect::new()), "INTEGER NOT NULL");
        assert_eq!(
            col.to_sql_for(&MySqlDialect::new()),
            "INTEGER NOT NULL AUTO_INCREMENT"
        );
    }

    #[test]
    fn test_create_table_sql_empty_fails() {
        let err = TableDefinition::new("empty").create_table_sql().unwrap_err();
        assert!(matches!(err, CoreError::EmptyTable { table } if table == "empty"));
    }

    #[test]
    fn test_duplicate_column_overwrites_in_place() {
        let table = TableDefinition::new("t")
            .column("a", ColumnDefinition::integer())
            .column("b", ColumnDefinition::text())
            .column("a", ColumnDefinition::varchar(10));

        let names: Vec<&str> = table.columns().iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(
            table.column_definition("a").unwrap().sql_type(),
            &SqlType::Varchar(10)
        );
    }

    #[test]
    fn test_foreign_key_entries() {
        let posts = TableDefinition::new("posts")
            .column("id", ColumnDefinition::integer().primary_key())
            .column("user_id", ColumnDefinition::integer())
            .foreign_key("user_id", "Users", "id");

        assert!(posts.has_relationships());
        assert_eq!(posts.relationship_count(), 1);
        assert_eq!(posts.columns().len(), 3);
        let model: Vec<&str> = posts.model_columns().map(|(n, _)| n).collect();
        assert_eq!(model, vec!["id", "user_id"]);
        assert!(!posts.has_column("FOREIGN KEY (user_id)"));
        assert!(posts
            .create_table_sql()
            .unwrap()
            .contains("  FOREIGN KEY (user_id) REFERENCES users(id)\n);"));
    }

    #[test]
    fn test_relationships_flag() {
        let t = TableDefinition::new("t").relationships(2);
        assert!(t.has_relationships());
        let t = t.with_has_relationships(false);
        assert!(!t.has_relationships());
        assert_eq!(t.relationship_count(), 2);
    }

    #[test]
    fn test_sql_type_parse() {
        assert_eq!("INTEGER".parse::<SqlType>().unwrap(), SqlType::Integer);
        assert_eq!(" varchar(120) ".parse::<SqlType>().unwrap(), SqlType::Varchar(120));
        assert_eq!("varchar".parse::<SqlType>().unwrap(), SqlType::Varchar(255));
        assert_eq!("Bool".parse::<SqlType>().unwrap(), SqlType::Boolean);
        assert!("varchar(0)".parse::<SqlType>().is_err());
        assert!("blob".parse::<SqlType>().is_err());
    }
}
