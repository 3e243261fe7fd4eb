//! Source store fixtures
//!
//! Builds optimizer result stores in a temporary directory. Parameter and
//! metadata values encode their (iteration, index) so tests can check which
//! candidate an output row came from:
//! - parameter `k` of (it, idx) = `it * 1000 + idx * 10 + k`
//! - metadata column `c` of (it, idx) = `"c@it/idx"`

#![allow(dead_code)]

use optrun_common::db::SqlValue;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct Candidate {
    pub iteration: i64,
    pub index: i64,
    pub fitness: f64,
    pub stage: Option<i64>,
}

/// Declarative description of one source store
#[derive(Debug, Clone, Default)]
pub struct SourceBuilder {
    parameters: Vec<String>,
    metadata: Vec<String>,
    optimizer: Option<String>,
    staged: bool,
    candidates: Vec<Candidate>,
}

impl SourceBuilder {
    pub fn new(parameters: &[&str]) -> Self {
        Self {
            parameters: parameters.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        }
    }

    pub fn metadata(mut self, columns: &[&str]) -> Self {
        self.metadata = columns.iter().map(|s| s.to_string()).collect();
        self
    }

    /// Name recorded in the job table (e.g. "PSO")
    pub fn optimizer(mut self, name: &str) -> Self {
        self.optimizer = Some(name.to_string());
        self
    }

    /// Enable the StagePSO extension
    pub fn staged(mut self) -> Self {
        self.staged = true;
        self
    }

    pub fn candidate(mut self, iteration: i64, index: i64, fitness: f64) -> Self {
        self.candidates.push(Candidate {
            iteration,
            index,
            fitness,
            stage: None,
        });
        self
    }

    pub fn staged_candidate(mut self, iteration: i64, index: i64, fitness: f64, stage: i64) -> Self {
        self.candidates.push(Candidate {
            iteration,
            index,
            fitness,
            stage: Some(stage),
        });
        self
    }

    /// Write the store to `path`
    pub async fn write(&self, path: &Path) -> PathBuf {
        let pool = connect(path, true).await;

        exec(&pool, "CREATE TABLE parameters (name TEXT)").await;
        for name in &self.parameters {
            sqlx::query("INSERT INTO parameters (name) VALUES (?)")
                .bind(name)
                .execute(&pool)
                .await
                .unwrap();
        }

        exec(
            &pool,
            "CREATE TABLE solution (iteration INTEGER, \"index\" INTEGER, fitness DOUBLE)",
        )
        .await;

        let param_defs: Vec<String> = self
            .parameters
            .iter()
            .map(|p| format!(", \"_p_{}\" DOUBLE", p))
            .collect();
        exec(
            &pool,
            &format!(
                "CREATE TABLE parameter_values (iteration INTEGER, \"index\" INTEGER{})",
                param_defs.concat()
            ),
        )
        .await;

        let mut data_columns = self.metadata.clone();
        if self.staged {
            data_columns.push("StagePSO::stage".to_string());
        }
        let data_defs: Vec<String> = data_columns
            .iter()
            .map(|c| format!(", \"_d_{}\" TEXT", c))
            .collect();
        exec(
            &pool,
            &format!(
                "CREATE TABLE data (iteration INTEGER, \"index\" INTEGER, extra TEXT{})",
                data_defs.concat()
            ),
        )
        .await;

        if let Some(optimizer) = &self.optimizer {
            exec(&pool, "CREATE TABLE job (name TEXT)").await;
            sqlx::query("INSERT INTO job (name) VALUES (?)")
                .bind(optimizer)
                .execute(&pool)
                .await
                .unwrap();
        }

        if self.staged {
            exec(&pool, "CREATE TABLE extensions (name TEXT)").await;
            exec(&pool, "INSERT INTO extensions (name) VALUES ('Noise')").await;
            exec(&pool, "INSERT INTO extensions (name) VALUES ('StagePSO')").await;
        }

        for c in &self.candidates {
            sqlx::query("INSERT INTO solution (iteration, \"index\", fitness) VALUES (?, ?, ?)")
                .bind(c.iteration)
                .bind(c.index)
                .bind(c.fitness)
                .execute(&pool)
                .await
                .unwrap();

            let mut query_text = String::from("INSERT INTO parameter_values VALUES (?, ?");
            query_text.push_str(&", ?".repeat(self.parameters.len()));
            query_text.push(')');
            let mut query = sqlx::query(&query_text).bind(c.iteration).bind(c.index);
            for k in 0..self.parameters.len() {
                query = query.bind(parameter_value(c.iteration, c.index, k));
            }
            query.execute(&pool).await.unwrap();

            let mut query_text = String::from("INSERT INTO data VALUES (?, ?, 'x'");
            query_text.push_str(&", ?".repeat(data_columns.len()));
            query_text.push(')');
            let mut query = sqlx::query(&query_text).bind(c.iteration).bind(c.index);
            for column in &self.metadata {
                query = query.bind(metadata_value(column, c.iteration, c.index));
            }
            if self.staged {
                query = query.bind(c.stage.map(|s| s.to_string()));
            }
            query.execute(&pool).await.unwrap();
        }

        pool.close().await;
        path.to_path_buf()
    }
}

pub fn parameter_value(iteration: i64, index: i64, k: usize) -> f64 {
    (iteration * 1000 + index * 10 + k as i64) as f64
}

pub fn metadata_value(column: &str, iteration: i64, index: i64) -> String {
    format!("{}@{}/{}", column, iteration, index)
}

async fn connect(path: &Path, create: bool) -> SqlitePool {
    SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(
            SqliteConnectOptions::new()
                .filename(path)
                .create_if_missing(create),
        )
        .await
        .unwrap()
}

async fn exec(pool: &SqlitePool, sql: &str) {
    sqlx::query(sql).execute(pool).await.unwrap();
}

/// Rows of `table` in id order, without the id column
pub async fn read_table(path: &Path, table: &str) -> Vec<Vec<SqlValue>> {
    let pool = connect(path, false).await;
    let rows = sqlx::query(&format!("SELECT * FROM \"{}\" ORDER BY id", table))
        .fetch_all(&pool)
        .await
        .unwrap();

    let values = rows
        .iter()
        .map(|row| {
            (1..row.len())
                .map(|i| SqlValue::from_row(row, i).unwrap())
                .collect()
        })
        .collect();

    pool.close().await;
    values
}

/// Column names of `table`
pub async fn read_columns(path: &Path, table: &str) -> Vec<String> {
    let pool = connect(path, false).await;
    let rows = sqlx::query(&format!("PRAGMA table_info(\"{}\")", table))
        .fetch_all(&pool)
        .await
        .unwrap();
    let names = rows.iter().map(|r| r.get::<String, _>("name")).collect();
    pool.close().await;
    names
}

/// (iteration, index) encoded in the first parameter value of an output row
pub fn decode_pick(row: &[SqlValue]) -> (i64, i64) {
    let value = match &row[0] {
        SqlValue::Real(v) => *v as i64,
        SqlValue::Integer(v) => *v,
        other => panic!("unexpected parameter value {:?}", other),
    };
    (value / 1000, (value % 1000) / 10)
}
