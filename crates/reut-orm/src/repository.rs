//! Generic CRUD over one table.
//!
//! Identifiers in generated SQL come only from the [`TableDefinition`]: every
//! key of a caller-supplied record or criteria map is checked against the
//! table's columns, and every value is bound as a parameter.

use reut_core::{Database, TableDefinition};
use sqlx::any::AnyRow;
use tracing::{debug, error, warn};

use crate::error::{OrmError, Result};
use crate::page::{paginate, Page};
use crate::value::{bind_param, decode_cell, Row, SqlParam};

/// How criteria values are compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Match {
    Equal,
    Contains,
}

/// A SQL statement with its parameters.
#[derive(Debug, Clone)]
struct Statement {
    sql: String,
    params: Vec<SqlParam>,
}

impl Statement {
    fn query(&self) -> sqlx::query::Query<'_, sqlx::Any, sqlx::any::AnyArguments<'_>> {
        self.params
            .iter()
            .fold(sqlx::query(&self.sql), |query, param| bind_param(query, param))
    }
}

/// Data access for one table.
#[derive(Debug, Clone)]
pub struct Repository {
    db: Database,
    table: TableDefinition,
    select_list: String,
}

impl Repository {
    /// Creates a repository for `table`.
    #[must_use]
    pub fn new(db: Database, table: TableDefinition) -> Self {
        let select_list = table
            .model_columns()
            .map(|(name, column)| db.dialect().select_expr(name, column.sql_type()))
            .collect::<Vec<_>>()
            .join(", ");
        Self {
            db,
            table,
            select_list,
        }
    }

    /// Returns the table definition.
    #[must_use]
    pub fn table(&self) -> &TableDefinition {
        &self.table
    }

    /// Returns every row, ordered by primary key when the table has one.
    ///
    /// # Errors
    ///
    /// Returns [`OrmError::Database`] when the query fails.
    pub async fn find_all(&self) -> Result<Vec<Row>> {
        let statement = Statement {
            sql: format!("{}{}", self.select_sql(), self.order_by()),
            params: Vec::new(),
        };
        self.fetch(&statement).await
    }

    /// Returns the first row matching every criterion, if any.
    ///
    /// # Errors
    ///
    /// Returns [`OrmError::UnknownColumn`] for a criterion that is not a
    /// column, or [`OrmError::Database`] when the query fails.
    pub async fn find_one(&self, criteria: &Row) -> Result<Option<Row>> {
        let (clause, params) = self.where_clause(criteria, Match::Equal)?;
        let statement = Statement {
            sql: format!("{}{clause}{} LIMIT 1", self.select_sql(), self.order_by()),
            params,
        };
        Ok(self.fetch(&statement).await?.into_iter().next())
    }

    /// Inserts one row. Returns the number of rows affected.
    ///
    /// # Errors
    ///
    /// Returns [`OrmError::Validation`] for an empty record,
    /// [`OrmError::UnknownColumn`] for a key that is not a column, or
    /// [`OrmError::Database`] when the insert fails.
    pub async fn add_one(&self, record: &Row) -> Result<u64> {
        let statement = self.insert_statement(record)?;
        self.execute(&statement).await
    }

    /// Updates the rows matching every criterion. Returns the number of rows
    /// affected.
    ///
    /// # Errors
    ///
    /// Returns [`OrmError::Validation`] for an empty patch or empty criteria.
    pub async fn update(&self, patch: &Row, criteria: &Row) -> Result<u64> {
        let statement = self.update_statement(patch, criteria)?;
        self.execute(&statement).await
    }

    /// Deletes the rows matching every criterion. Returns the number of rows
    /// affected.
    ///
    /// # Errors
    ///
    /// Returns [`OrmError::Validation`] for empty criteria.
    pub async fn delete(&self, criteria: &Row) -> Result<u64> {
        let statement = self.delete_statement(criteria)?;
        self.execute(&statement).await
    }

    /// Returns the rows where every criterion's column contains its value.
    ///
    /// # Errors
    ///
    /// Returns [`OrmError::UnknownColumn`] for a criterion that is not a
    /// column, or [`OrmError::Database`] when the query fails.
    pub async fn search(&self, criteria: &Row) -> Result<Vec<Row>> {
        let (clause, params) = self.where_clause(criteria, Match::Contains)?;
        let statement = Statement {
            sql: format!("{}{clause}{}", self.select_sql(), self.order_by()),
            params,
        };
        self.fetch(&statement).await
    }

    /// Fetches every row and returns one page of them.
    ///
    /// # Errors
    ///
    /// Returns [`OrmError::Validation`] when `limit` is 0, or
    /// [`OrmError::Database`] when the query fails.
    pub async fn find_page(&self, page: usize, limit: usize) -> Result<Page> {
        paginate(self.find_all().await?, page, limit)
    }

    /// Inserts several rows in one transaction.
    ///
    /// # Errors
    ///
    /// Returns [`OrmError::Bulk`] with the index of the first failing row;
    /// nothing is written in that case.
    pub async fn add_many(&self, records: &[Row]) -> Result<u64> {
        let statements = records
            .iter()
            .enumerate()
            .map(|(index, record)| self.insert_statement(record).map_err(|e| e.at_row(index)))
            .collect::<Result<Vec<_>>>()?;
        self.execute_all(&statements).await
    }

    /// Applies several `(patch, criteria)` updates in one transaction.
    ///
    /// # Errors
    ///
    /// Returns [`OrmError::Bulk`] with the index of the first failing update;
    /// nothing is written in that case.
    pub async fn update_many(&self, updates: &[(Row, Row)]) -> Result<u64> {
        let statements = updates
            .iter()
            .enumerate()
            .map(|(index, (patch, criteria))| {
                self.update_statement(patch, criteria)
                    .map_err(|e| e.at_row(index))
            })
            .collect::<Result<Vec<_>>>()?;
        self.execute_all(&statements).await
    }

    /// Runs several deletes in one transaction.
    ///
    /// # Errors
    ///
    /// Returns [`OrmError::Bulk`] with the index of the first failing delete;
    /// nothing is written in that case.
    pub async fn delete_many(&self, criteria: &[Row]) -> Result<u64> {
        let statements = criteria
            .iter()
            .enumerate()
            .map(|(index, criteria)| self.delete_statement(criteria).map_err(|e| e.at_row(index)))
            .collect::<Result<Vec<_>>>()?;
        self.execute_all(&statements).await
    }

    fn select_sql(&self) -> String {
        format!("SELECT {} FROM {}", self.select_list, self.table.name())
    }

    fn order_by(&self) -> String {
        self.table
            .model_columns()
            .find(|(_, column)| column.is_primary_key())
            .map(|(name, _)| format!(" ORDER BY {name}"))
            .unwrap_or_default()
    }

    fn check_column(&self, column: &str) -> Result<()> {
        if self.table.has_column(column) {
            Ok(())
        } else {
            Err(OrmError::UnknownColumn {
                table: self.table.name().to_string(),
                column: column.to_string(),
            })
        }
    }

    fn where_clause(&self, criteria: &Row, mode: Match) -> Result<(String, Vec<SqlParam>)> {
        if criteria.is_empty() {
            return Ok((String::new(), Vec::new()));
        }

        let mut conditions = Vec::with_capacity(criteria.len());
        let mut params = Vec::with_capacity(criteria.len());
        for (column, value) in criteria {
            self.check_column(column)?;
            let param = SqlParam::try_from(value)?;
            if param.is_null() {
                conditions.push(format!("{column} IS NULL"));
                continue;
            }
            match mode {
                Match::Equal => {
                    conditions.push(format!("{column} = ?"));
                    params.push(param);
                }
                Match::Contains => {
                    conditions.push(format!("{column} LIKE ?"));
                    params.push(SqlParam::Text(format!("%{}%", param.to_text())));
                }
            }
        }

        Ok((format!(" WHERE {}", conditions.join(" AND ")), params))
    }

    fn required_where(&self, criteria: &Row) -> Result<(String, Vec<SqlParam>)> {
        if criteria.is_empty() {
            return Err(OrmError::Validation(format!(
                "refusing to modify every row of '{}' without criteria",
                self.table.name()
            )));
        }
        self.where_clause(criteria, Match::Equal)
    }

    fn insert_statement(&self, record: &Row) -> Result<Statement> {
        if record.is_empty() {
            return Err(OrmError::Validation("record has no columns".to_string()));
        }

        let mut columns = Vec::with_capacity(record.len());
        let mut params = Vec::with_capacity(record.len());
        for (column, value) in record {
            self.check_column(column)?;
            columns.push(column.as_str());
            params.push(SqlParam::try_from(value)?);
        }

        Ok(Statement {
            sql: format!(
                "INSERT INTO {} ({}) VALUES ({})",
                self.table.name(),
                columns.join(", "),
                vec!["?"; columns.len()].join(", ")
            ),
            params,
        })
    }

    fn update_statement(&self, patch: &Row, criteria: &Row) -> Result<Statement> {
        if patch.is_empty() {
            return Err(OrmError::Validation("update has no columns".to_string()));
        }

        let mut assignments = Vec::with_capacity(patch.len());
        let mut params = Vec::with_capacity(patch.len() + criteria.len());
        for (column, value) in patch {
            self.check_column(column)?;
            assignments.push(format!("{column} = ?"));
            params.push(SqlParam::try_from(value)?);
        }
        let (clause, where_params) = self.required_where(criteria)?;
        params.extend(where_params);

        Ok(Statement {
            sql: format!(
                "UPDATE {} SET {}{clause}",
                self.table.name(),
                assignments.join(", ")
            ),
            params,
        })
    }

    fn delete_statement(&self, criteria: &Row) -> Result<Statement> {
        let (clause, params) = self.required_where(criteria)?;
        Ok(Statement {
            sql: format!("DELETE FROM {}{clause}", self.table.name()),
            params,
        })
    }

    async fn fetch(&self, statement: &Statement) -> Result<Vec<Row>> {
        debug!(sql = %statement.sql, "Executing query");
        let rows = statement.query().fetch_all(self.db.pool()).await?;
        rows.iter().map(|row| self.decode_row(row)).collect()
    }

    async fn execute(&self, statement: &Statement) -> Result<u64> {
        debug!(sql = %statement.sql, "Executing statement");
        let result = statement.query().execute(self.db.pool()).await?;
        Ok(result.rows_affected())
    }

    async fn execute_all(&self, statements: &[Statement]) -> Result<u64> {
        let mut tx = self.db.pool().begin().await?;
        let mut affected = 0;

        for (index, statement) in statements.iter().enumerate() {
            debug!(sql = %statement.sql, index, "Executing bulk statement");
            match statement.query().execute(&mut *tx).await {
                Ok(result) => affected += result.rows_affected(),
                Err(err) => {
                    warn!(
                        table = %self.table.name(),
                        index,
                        error = %err,
                        "Bulk operation failed, rolling back"
                    );
                    if let Err(rollback) = tx.rollback().await {
                        error!(
                            table = %self.table.name(),
                            error = %rollback,
                            "Rollback failed"
                        );
                    }
                    return Err(OrmError::Database(err).at_row(index));
                }
            }
        }

        tx.commit().await?;
        Ok(affected)
    }

    fn decode_row(&self, row: &AnyRow) -> Result<Row> {
        self.table
            .model_columns()
            .enumerate()
            .map(|(index, (name, column))| {
                Ok((name.to_string(), decode_cell(row, index, column.sql_type())?))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use reut_core::{ColumnDefinition, DatabaseConfig};
    use serde_json::json;

    use super::*;

    fn people() -> TableDefinition {
        TableDefinition::new("people")
            .column("id", ColumnDefinition::integer().not_null().primary_key())
            .column("name", ColumnDefinition::varchar(100).not_null())
            .column("team_id", ColumnDefinition::integer())
            .foreign_key("team_id", "teams", "id")
    }

    async fn repository() -> Repository {
        let db = Database::connect(&DatabaseConfig::new("sqlite::memory:").unwrap())
            .await
            .unwrap();
        Repository::new(db, people())
    }

    fn row(value: serde_json::Value) -> Row {
        match value {
            serde_json::Value::Object(map) => map,
            other => panic!("not an object: {other}"),
        }
    }

    #[tokio::test]
    async fn test_statements_use_only_known_columns() {
        let repo = repository().await;

        let insert = repo
            .insert_statement(&row(json!({"name": "Ada", "team_id": 2})))
            .unwrap();
        assert_eq!(insert.sql, "INSERT INTO people (name, team_id) VALUES (?, ?)");
        assert_eq!(insert.params.len(), 2);

        let update = repo
            .update_statement(&row(json!({"name": "Grace"})), &row(json!({"id": 1, "team_id": null})))
            .unwrap();
        assert_eq!(
            update.sql,
            "UPDATE people SET name = ? WHERE id = ? AND team_id IS NULL"
        );
        assert_eq!(update.params, vec![SqlParam::Text("Grace".into()), SqlParam::Int(1)]);

        let err = repo
            .insert_statement(&row(json!({"name": "x", "name; DROP TABLE people": 1})))
            .unwrap_err();
        assert!(matches!(err, OrmError::UnknownColumn { .. }));

        let err = repo
            .insert_statement(&row(json!({"FOREIGN KEY (team_id)": 1})))
            .unwrap_err();
        assert!(matches!(err, OrmError::UnknownColumn { .. }));
    }

    #[tokio::test]
    async fn test_search_builds_like_patterns() {
        let repo = repository().await;
        let (clause, params) = repo
            .where_clause(&row(json!({"name": "da"})), Match::Contains)
            .unwrap();
        assert_eq!(clause, " WHERE name LIKE ?");
        assert_eq!(params, vec![SqlParam::Text("%da%".into())]);
    }

    #[tokio::test]
    async fn test_modifications_require_criteria() {
        let repo = repository().await;
        assert!(matches!(
            repo.delete_statement(&Row::new()),
            Err(OrmError::Validation(_))
        ));
        assert!(matches!(
            repo.update_statement(&row(json!({"name": "x"})), &Row::new()),
            Err(OrmError::Validation(_))
        ));
        assert!(matches!(
            repo.insert_statement(&Row::new()),
            Err(OrmError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_select_list_and_order() {
        let repo = repository().await;
        assert_eq!(repo.select_sql(), "SELECT id, name, team_id FROM people");
        assert_eq!(repo.order_by(), " ORDER BY id");
    }
}
