//! Canonical parameter and metadata schema
//!
//! The first source fixes the schema. Every other source must carry exactly
//! the same parameter names (as a set); metadata columns are checked only in
//! strict mode.

use crate::layout::{DATA_TABLE, METADATA_PREFIX, PARAMETERS_TABLE, PARAMETER_PREFIX};
use optrun_common::db::{Identifier, SchemaIntrospector, Store};
use optrun_common::{Error, Result};
use sqlx::Row;
use std::collections::BTreeSet;
use tracing::{debug, info};

/// One optimizer parameter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameter {
    /// Name as listed in the parameters table
    pub name: String,
    /// Prefixed column in `parameter_values` and in the output
    pub column: Identifier,
}

/// One free-form metadata column
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataColumn {
    /// Logical name (prefix stripped)
    pub name: String,
    /// Prefixed column in `data` and in the output
    pub column: Identifier,
}

/// Parameters and metadata columns shared by every source of a run
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ResolvedSchema {
    pub parameters: Vec<Parameter>,
    pub metadata: Vec<MetadataColumn>,
}

impl ResolvedSchema {
    /// Derive the schema from the reference source
    pub async fn resolve(store: &Store) -> Result<Self> {
        let parameters = parameter_names(store)
            .await?
            .into_iter()
            .map(|name| -> Result<Parameter> {
                let column = Identifier::prefixed(PARAMETER_PREFIX, &name)?;
                Ok(Parameter { name, column })
            })
            .collect::<Result<Vec<_>>>()?;

        let metadata = metadata_columns(store).await?;

        info!(
            "Resolved schema from {}: {} parameters, {} metadata columns",
            store.path().display(),
            parameters.len(),
            metadata.len()
        );

        Ok(Self {
            parameters,
            metadata,
        })
    }

    /// Prefixed parameter columns in canonical order
    pub fn parameter_columns(&self) -> Vec<Identifier> {
        self.parameters.iter().map(|p| p.column.clone()).collect()
    }

    /// Prefixed metadata columns in canonical order
    pub fn metadata_columns(&self) -> Vec<Identifier> {
        self.metadata.iter().map(|m| m.column.clone()).collect()
    }

    /// Fail with [`Error::SchemaMismatch`] unless `store` matches this schema
    pub async fn validate(&self, store: &Store, strict_metadata: bool) -> Result<()> {
        let expected: BTreeSet<String> = self.parameters.iter().map(|p| p.name.clone()).collect();
        let actual: BTreeSet<String> = parameter_names(store).await?.into_iter().collect();
        check_same_names(store, &expected, &actual)?;

        if strict_metadata {
            let expected: BTreeSet<String> =
                self.metadata.iter().map(|m| m.name.clone()).collect();
            let actual: BTreeSet<String> = metadata_columns(store)
                .await?
                .into_iter()
                .map(|m| m.name)
                .collect();
            check_same_names(store, &expected, &actual)?;
        }

        debug!("Schema of {} matches reference", store.path().display());
        Ok(())
    }
}

fn check_same_names(
    store: &Store,
    expected: &BTreeSet<String>,
    actual: &BTreeSet<String>,
) -> Result<()> {
    if expected == actual {
        return Ok(());
    }

    Err(Error::SchemaMismatch {
        path: store.path().to_path_buf(),
        missing: expected.difference(actual).cloned().collect(),
        extra: actual.difference(expected).cloned().collect(),
    })
}

/// Parameter names in discovery order
pub async fn parameter_names(store: &Store) -> Result<Vec<String>> {
    let sql = format!("SELECT \"name\" FROM \"{}\"", PARAMETERS_TABLE);
    let mut names = Vec::new();

    store
        .query(&sql, &[], |row| {
            names.push(row.try_get::<String, _>(0).map_err(Error::store(&sql))?);
            Ok(true)
        })
        .await?;

    Ok(names)
}

/// Metadata columns of the data table, in declaration order
pub async fn metadata_columns(store: &Store) -> Result<Vec<MetadataColumn>> {
    let table = Identifier::new(DATA_TABLE)?;

    SchemaIntrospector::column_names(store, &table)
        .await?
        .into_iter()
        .filter_map(|stored| {
            let name = stored.strip_prefix(METADATA_PREFIX)?.to_string();
            Some((name, stored))
        })
        .map(|(name, stored)| -> Result<MetadataColumn> {
            Ok(MetadataColumn {
                name,
                column: Identifier::new(stored)?,
            })
        })
        .collect()
}
