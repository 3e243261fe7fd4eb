//! Output store writer
//!
//! Creates `initial_population` (one DOUBLE column per parameter) and
//! `initial_population_data` (one TEXT column per metadata column), each with
//! its own `id INTEGER PRIMARY KEY`. Rows pair up across the two tables by
//! insertion order; both rows of a pick are written in one transaction.

use crate::layout::{
    DATA_TABLE, INDEX_COLUMN, ITERATION_COLUMN, OUTPUT_ID_COLUMN, OUTPUT_METADATA_TABLE,
    OUTPUT_PARAMETER_TABLE, PARAMETER_VALUES_TABLE,
};
use crate::schema::ResolvedSchema;
use crate::selector::CandidateRef;
use optrun_common::db::{
    arguments, column_list, create_table_sql, placeholders, ColumnDefinition, Identifier, SqlValue,
    Store, StoreOptions,
};
use optrun_common::{Error, Result};
use sqlx::SqliteConnection;
use std::path::Path;
use tracing::{debug, info};

/// Copy statements for one (source table, output table) pair
#[derive(Debug, Clone)]
struct CopyPlan {
    columns: Vec<Identifier>,
    select: String,
    insert: String,
}

impl CopyPlan {
    fn new(source_table: &str, output_table: &Identifier, columns: Vec<Identifier>) -> Self {
        let select = format!(
            "SELECT {} FROM \"{}\" WHERE \"{}\" = ? AND \"{}\" = ?",
            column_list(&columns),
            source_table,
            ITERATION_COLUMN,
            INDEX_COLUMN
        );

        let insert = if columns.is_empty() {
            format!("INSERT INTO {} DEFAULT VALUES", output_table.quoted())
        } else {
            format!(
                "INSERT INTO {} ({}) VALUES ({})",
                output_table.quoted(),
                column_list(&columns),
                placeholders(columns.len())
            )
        };

        Self {
            columns,
            select,
            insert,
        }
    }

    async fn insert_row(&self, conn: &mut SqliteConnection, values: &[SqlValue]) -> Result<()> {
        let args = arguments(values).map_err(Error::store(&self.insert))?;
        sqlx::query_with(&self.insert, args)
            .execute(conn)
            .await
            .map_err(Error::store(&self.insert))?;
        Ok(())
    }

    /// Values of `pick` in `source`, in column order
    async fn fetch(&self, source: &Store, pick: CandidateRef, what: &str) -> Result<Vec<SqlValue>> {
        if self.columns.is_empty() {
            return Ok(Vec::new());
        }

        source
            .query_first_row(
                &self.select,
                &[SqlValue::Integer(pick.iteration), SqlValue::Integer(pick.index)],
            )
            .await?
            .ok_or_else(|| {
                Error::NotFound(format!(
                    "{} of iteration {} index {} in {}",
                    what,
                    pick.iteration,
                    pick.index,
                    source.path().display()
                ))
            })
    }
}

pub struct MergeWriter {
    store: Store,
    parameters: CopyPlan,
    metadata: CopyPlan,
    rows: usize,
}

impl MergeWriter {
    /// Create the output store at `path` with both tables
    ///
    /// `path` must not exist yet.
    pub async fn create(path: &Path, schema: &ResolvedSchema, busy_timeout_ms: u64) -> Result<Self> {
        if path.exists() {
            return Err(Error::Precondition(format!(
                "The file `{}' already exists",
                path.display()
            )));
        }

        let parameter_table = Identifier::new(OUTPUT_PARAMETER_TABLE)?;
        let metadata_table = Identifier::new(OUTPUT_METADATA_TABLE)?;

        let store = match Store::open(path, &StoreOptions::output(busy_timeout_ms)).await {
            Ok(store) => store,
            Err(e) => {
                let _ = std::fs::remove_file(path);
                return Err(e);
            }
        };

        if let Err(e) = create_tables(&store, schema, &parameter_table, &metadata_table).await {
            store.close().await;
            let _ = std::fs::remove_file(path);
            return Err(e);
        }

        info!("Created output store {}", path.display());

        Ok(Self {
            store,
            parameters: CopyPlan::new(
                PARAMETER_VALUES_TABLE,
                &parameter_table,
                schema.parameter_columns(),
            ),
            metadata: CopyPlan::new(DATA_TABLE, &metadata_table, schema.metadata_columns()),
            rows: 0,
        })
    }

    /// Copy the parameter and metadata rows of `pick` from `source`
    pub async fn append_pick(&mut self, source: &Store, pick: CandidateRef) -> Result<()> {
        let parameter_values = self.parameters.fetch(source, pick, "parameter values").await?;
        let metadata_values = self.metadata.fetch(source, pick, "metadata").await?;

        let mut tx = self.store.pool().begin().await?;

        self.parameters.insert_row(&mut tx, &parameter_values).await?;
        self.metadata.insert_row(&mut tx, &metadata_values).await?;

        tx.commit().await?;

        self.rows += 1;
        debug!(
            "Appended iteration {} index {} from {}",
            pick.iteration,
            pick.index,
            source.path().display()
        );
        Ok(())
    }

    /// Row pairs written so far
    pub fn rows_written(&self) -> usize {
        self.rows
    }

    pub async fn close(self) {
        self.store.close().await;
    }
}

async fn create_tables(
    store: &Store,
    schema: &ResolvedSchema,
    parameter_table: &Identifier,
    metadata_table: &Identifier,
) -> Result<()> {
    let id = Identifier::new(OUTPUT_ID_COLUMN)?;

    let mut parameter_defs = vec![ColumnDefinition::new(id.clone(), "INTEGER").primary_key()];
    parameter_defs.extend(
        schema
            .parameter_columns()
            .into_iter()
            .map(|c| ColumnDefinition::new(c, "DOUBLE")),
    );

    let mut metadata_defs = vec![ColumnDefinition::new(id, "INTEGER").primary_key()];
    metadata_defs.extend(
        schema
            .metadata_columns()
            .into_iter()
            .map(|c| ColumnDefinition::new(c, "TEXT")),
    );

    store
        .execute(&create_table_sql(parameter_table, &parameter_defs), &[])
        .await?;
    store
        .execute(&create_table_sql(metadata_table, &metadata_defs), &[])
        .await?;

    Ok(())
}
