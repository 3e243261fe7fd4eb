//! Schema introspection and table definitions
//!
//! Reads the actual layout of a store via `sqlite_master` and
//! `PRAGMA table_info`, and renders `CREATE TABLE` statements from
//! declarative column definitions.

use crate::db::identifier::Identifier;
use crate::db::store::Store;
use crate::db::value::SqlValue;
use crate::{Error, Result};
use sqlx::Row;

/// Column definition with SQL type
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDefinition {
    /// Column name
    pub name: Identifier,
    /// SQL type (e.g., "TEXT", "INTEGER", "DOUBLE")
    pub sql_type: String,
    /// PRIMARY KEY constraint
    pub primary_key: bool,
}

impl ColumnDefinition {
    /// Create new column definition
    pub fn new(name: Identifier, sql_type: impl Into<String>) -> Self {
        Self {
            name,
            sql_type: sql_type.into(),
            primary_key: false,
        }
    }

    /// Mark column as PRIMARY KEY
    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    fn render(&self) -> String {
        let mut sql = format!("{} {}", self.name.quoted(), self.sql_type);
        if self.primary_key {
            sql.push_str(" PRIMARY KEY");
        }
        sql
    }
}

/// `CREATE TABLE` statement for `table` with `columns` in order
pub fn create_table_sql(table: &Identifier, columns: &[ColumnDefinition]) -> String {
    let body = columns
        .iter()
        .map(ColumnDefinition::render)
        .collect::<Vec<_>>()
        .join(", ");
    format!("CREATE TABLE {} ({})", table.quoted(), body)
}

/// Schema introspection - read actual store schema
pub struct SchemaIntrospector;

impl SchemaIntrospector {
    /// Check if table exists
    pub async fn table_exists(store: &Store, table_name: &str) -> Result<bool> {
        let exists: Option<bool> = store
            .query_scalar(
                "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?)",
                &[SqlValue::from(table_name)],
            )
            .await?;

        Ok(exists.unwrap_or(false))
    }

    /// Column names of `table` in declaration order (by cid)
    pub async fn column_names(store: &Store, table: &Identifier) -> Result<Vec<String>> {
        let sql = format!("PRAGMA table_info({})", table.quoted());
        let mut columns: Vec<(i64, String)> = Vec::new();

        store
            .query(&sql, &[], |row| {
                let cid: i64 = row.try_get("cid").map_err(Error::store(&sql))?;
                let name: String = row.try_get("name").map_err(Error::store(&sql))?;
                columns.push((cid, name));
                Ok(true)
            })
            .await?;

        // Sort by cid to ensure consistent order
        columns.sort_by_key(|(cid, _)| *cid);

        Ok(columns.into_iter().map(|(_, name)| name).collect())
    }
}
