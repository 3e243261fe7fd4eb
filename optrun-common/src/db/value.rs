//! Dynamically typed SQLite values
//!
//! Rows copied between stores have a shape that is only known at runtime, so
//! values travel as [`SqlValue`] rather than through compile-time row types.

use serde::{Deserialize, Serialize};
use sqlx::sqlite::{SqliteArguments, SqliteRow};
use sqlx::{Arguments, Row, TypeInfo, ValueRef};

/// One SQLite value in any storage class
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SqlValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl SqlValue {
    /// Read column `index` of `row`, following the value's storage class
    pub fn from_row(row: &SqliteRow, index: usize) -> sqlx::Result<Self> {
        let raw = row.try_get_raw(index)?;
        if raw.is_null() {
            return Ok(SqlValue::Null);
        }

        let storage = raw.type_info().name().to_string();
        let value = match storage.as_str() {
            "INTEGER" | "BOOLEAN" => SqlValue::Integer(row.try_get_unchecked::<i64, _>(index)?),
            "REAL" | "NUMERIC" => SqlValue::Real(row.try_get_unchecked::<f64, _>(index)?),
            "TEXT" => SqlValue::Text(row.try_get_unchecked::<String, _>(index)?),
            "BLOB" => SqlValue::Blob(row.try_get_unchecked::<Vec<u8>, _>(index)?),
            // Try common types
            _ => row
                .try_get::<String, _>(index)
                .map(SqlValue::Text)
                .or_else(|_| row.try_get::<i64, _>(index).map(SqlValue::Integer))
                .or_else(|_| row.try_get::<f64, _>(index).map(SqlValue::Real))?,
        };
        Ok(value)
    }

    /// Read every column of `row` in order
    pub fn row_values(row: &SqliteRow) -> sqlx::Result<Vec<Self>> {
        (0..row.len()).map(|i| Self::from_row(row, i)).collect()
    }
}

impl From<i64> for SqlValue {
    fn from(v: i64) -> Self {
        SqlValue::Integer(v)
    }
}

impl From<f64> for SqlValue {
    fn from(v: f64) -> Self {
        SqlValue::Real(v)
    }
}

impl From<&str> for SqlValue {
    fn from(v: &str) -> Self {
        SqlValue::Text(v.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(v: String) -> Self {
        SqlValue::Text(v)
    }
}

/// Positional arguments for `params`
///
/// Usable with both `sqlx::query_with` and `sqlx::query_scalar_with`.
pub fn arguments<'q>(params: &[SqlValue]) -> sqlx::Result<SqliteArguments<'q>> {
    let mut args = SqliteArguments::default();
    for param in params {
        let added = match param {
            SqlValue::Null => args.add(None::<i64>),
            SqlValue::Integer(v) => args.add(*v),
            SqlValue::Real(v) => args.add(*v),
            SqlValue::Text(v) => args.add(v.clone()),
            SqlValue::Blob(v) => args.add(v.clone()),
        };
        added.map_err(sqlx::Error::Encode)?;
    }
    Ok(args)
}

/// `?, ?, ...` with `count` placeholders
pub fn placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}
