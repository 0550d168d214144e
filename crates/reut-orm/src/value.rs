//! Conversion between JSON values and SQL parameters and results.

use reut_core::SqlType;
use serde_json::{Map, Number, Value};
use sqlx::any::{AnyArguments, AnyRow};
use sqlx::query::Query;
use sqlx::{Any, Row as _};

use crate::error::{OrmError, Result};

/// A row or a set of criteria: column name to value, in insertion order.
pub type Row = Map<String, Value>;

/// A value that can be bound as a query parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlParam {
    /// SQL NULL.
    Null,
    /// Boolean.
    Bool(bool),
    /// 64-bit integer.
    Int(i64),
    /// Double-precision float.
    Float(f64),
    /// Text.
    Text(String),
}

impl SqlParam {
    /// Returns whether this is NULL.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Renders the value as text, for `LIKE` patterns.
    #[must_use]
    pub fn to_text(&self) -> String {
        match self {
            Self::Null => String::new(),
            Self::Bool(b) => if *b { "1" } else { "0" }.to_string(),
            Self::Int(i) => i.to_string(),
            Self::Float(f) => f.to_string(),
            Self::Text(s) => s.clone(),
        }
    }
}

impl TryFrom<&Value> for SqlParam {
    type Error = OrmError;

    fn try_from(value: &Value) -> Result<Self> {
        match value {
            Value::Null => Ok(Self::Null),
            Value::Bool(b) => Ok(Self::Bool(*b)),
            Value::Number(n) => n
                .as_i64()
                .map(Self::Int)
                .or_else(|| n.as_f64().map(Self::Float))
                .ok_or_else(|| OrmError::Validation(format!("number {n} is out of range"))),
            Value::String(s) => Ok(Self::Text(s.clone())),
            Value::Array(_) | Value::Object(_) => Err(OrmError::Validation(
                "arrays and objects cannot be stored in a column".to_string(),
            )),
        }
    }
}

/// Binds a parameter to a query.
pub fn bind_param<'q>(
    query: Query<'q, Any, AnyArguments<'q>>,
    param: &SqlParam,
) -> Query<'q, Any, AnyArguments<'q>> {
    match param {
        SqlParam::Null => query.bind(Option::<String>::None),
        SqlParam::Bool(b) => query.bind(*b),
        SqlParam::Int(i) => query.bind(*i),
        SqlParam::Float(f) => query.bind(*f),
        SqlParam::Text(s) => query.bind(s.clone()),
    }
}

/// Decodes one column of a result row into a JSON value.
///
/// Booleans arrive as integers and are turned back into JSON booleans.
///
/// # Errors
///
/// Returns [`OrmError::Database`] when the value has no supported
/// representation.
pub fn decode_cell(row: &AnyRow, index: usize, sql_type: &SqlType) -> Result<Value> {
    let value = decode_raw(row, index)?;
    Ok(match (sql_type, value) {
        (SqlType::Boolean, Value::Number(n)) => Value::Bool(n.as_i64().is_some_and(|v| v != 0)),
        (_, value) => value,
    })
}

fn decode_raw(row: &AnyRow, index: usize) -> Result<Value> {
    if let Ok(value) = row.try_get::<Option<i64>, _>(index) {
        return Ok(value.map_or(Value::Null, Value::from));
    }
    if let Ok(value) = row.try_get::<Option<bool>, _>(index) {
        return Ok(value.map_or(Value::Null, Value::Bool));
    }
    if let Ok(value) = row.try_get::<Option<f64>, _>(index) {
        return Ok(value
            .and_then(Number::from_f64)
            .map_or(Value::Null, Value::Number));
    }
    let value: Option<String> = row.try_get(index)?;
    Ok(value.map_or(Value::Null, Value::String))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_param_from_json() {
        assert_eq!(SqlParam::try_from(&json!(null)).unwrap(), SqlParam::Null);
        assert_eq!(SqlParam::try_from(&json!(true)).unwrap(), SqlParam::Bool(true));
        assert_eq!(SqlParam::try_from(&json!(42)).unwrap(), SqlParam::Int(42));
        assert_eq!(SqlParam::try_from(&json!(1.5)).unwrap(), SqlParam::Float(1.5));
        assert_eq!(
            SqlParam::try_from(&json!("x")).unwrap(),
            SqlParam::Text("x".to_string())
        );
        assert!(matches!(
            SqlParam::try_from(&json!([1, 2])),
            Err(OrmError::Validation(_))
        ));
    }

    #[test]
    fn test_param_text() {
        assert_eq!(SqlParam::Int(7).to_text(), "7");
        assert_eq!(SqlParam::Bool(true).to_text(), "1");
        assert_eq!(SqlParam::Text("abc".into()).to_text(), "abc");
    }
}
