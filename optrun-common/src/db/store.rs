//! Parameterized query primitive over one SQLite store
//!
//! Each [`Store`] wraps a single-connection pool. Statements are awaited one
//! at a time; nothing here relies on concurrent access.

use crate::db::value::{arguments, SqlValue};
use crate::{Error, Result};
use futures::TryStreamExt;
use sqlx::sqlite::{
    SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow, SqliteSynchronous,
};
use sqlx::{Decode, Sqlite, Type};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Default bounded wait on a store locked by another process
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 15_000;

/// How a store is opened
#[derive(Debug, Clone)]
pub struct StoreOptions {
    /// Bounded wait before a locked store fails the statement
    pub busy_timeout: Duration,
    /// Create the file if missing (output stores only)
    pub create: bool,
    /// Reject writes (source stores)
    pub read_only: bool,
    /// Open with `PRAGMA synchronous = OFF`
    pub synchronous_off: bool,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            busy_timeout: Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS),
            create: false,
            read_only: false,
            synchronous_off: false,
        }
    }
}

impl StoreOptions {
    /// Options for reading an existing source store
    pub fn source(busy_timeout_ms: u64, synchronous_off: bool) -> Self {
        Self {
            busy_timeout: Duration::from_millis(busy_timeout_ms),
            create: false,
            read_only: true,
            synchronous_off,
        }
    }

    /// Options for creating a fresh output store
    pub fn output(busy_timeout_ms: u64) -> Self {
        Self {
            busy_timeout: Duration::from_millis(busy_timeout_ms),
            create: true,
            read_only: false,
            synchronous_off: false,
        }
    }
}

/// An open store
#[derive(Debug)]
pub struct Store {
    pool: SqlitePool,
    path: PathBuf,
}

impl Store {
    /// Open the store at `path`
    pub async fn open(path: &Path, options: &StoreOptions) -> Result<Self> {
        if !options.create && !path.exists() {
            return Err(Error::NotFound(format!("store {}", path.display())));
        }

        let synchronous = if options.synchronous_off {
            SqliteSynchronous::Off
        } else {
            SqliteSynchronous::Full
        };

        let connect = SqliteConnectOptions::new()
            .filename(path)
            .busy_timeout(options.busy_timeout)
            .synchronous(synchronous)
            .create_if_missing(options.create)
            .read_only(options.read_only);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(connect)
            .await?;

        debug!(
            "Opened store {} (busy_timeout={}ms, read_only={})",
            path.display(),
            options.busy_timeout.as_millis(),
            options.read_only
        );

        Ok(Self {
            pool,
            path: path.to_path_buf(),
        })
    }

    /// Path the store was opened from
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Underlying pool, for transactions
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Stream rows of `sql` into `on_row` until it returns `false`
    ///
    /// Returns `true` if at least one row was delivered.
    pub async fn query<F>(&self, sql: &str, params: &[SqlValue], mut on_row: F) -> Result<bool>
    where
        F: FnMut(&SqliteRow) -> Result<bool>,
    {
        let args = arguments(params).map_err(Error::store(sql))?;
        let mut rows = sqlx::query_with(sql, args).fetch(&self.pool);
        let mut delivered = false;

        while let Some(row) = rows.try_next().await.map_err(Error::store(sql))? {
            delivered = true;
            if !on_row(&row)? {
                break;
            }
        }

        Ok(delivered)
    }

    /// Run a mutating statement; `true` if at least one row was affected
    pub async fn execute(&self, sql: &str, params: &[SqlValue]) -> Result<bool> {
        let args = arguments(params).map_err(Error::store(sql))?;
        let result = sqlx::query_with(sql, args)
            .execute(&self.pool)
            .await
            .map_err(Error::store(sql))?;
        Ok(result.rows_affected() > 0)
    }

    /// First row of `sql` as values, if any
    pub async fn query_first_row(
        &self,
        sql: &str,
        params: &[SqlValue],
    ) -> Result<Option<Vec<SqlValue>>> {
        let args = arguments(params).map_err(Error::store(sql))?;
        let row = sqlx::query_with(sql, args)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::store(sql))?;

        row.map(|row| SqlValue::row_values(&row).map_err(Error::store(sql)))
            .transpose()
    }

    /// First column of the first row of `sql`, if any
    pub async fn query_scalar<T>(&self, sql: &str, params: &[SqlValue]) -> Result<Option<T>>
    where
        T: for<'r> Decode<'r, Sqlite> + Type<Sqlite> + Send + Unpin,
    {
        let args = arguments(params).map_err(Error::store(sql))?;

        sqlx::query_scalar_with::<_, T, _>(sql, args)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::store(sql))
    }

    /// Close the underlying connection
    pub async fn close(self) {
        self.pool.close().await;
        debug!("Closed store {}", self.path.display());
    }
}
