//! Common error types for optrun tools

use std::path::PathBuf;
use thiserror::Error;

/// Common result type for optrun operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across optrun tools
#[derive(Error, Debug)]
pub enum Error {
    /// A statement failed; carries the statement text for diagnosis
    #[error("Store error in `{statement}`: {source}")]
    Store {
        statement: String,
        #[source]
        source: sqlx::Error,
    },

    /// Connection-level database error (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Run cannot start (output exists, no sources given)
    #[error("{0}")]
    Precondition(String),

    /// Source specification string could not be parsed
    #[error("Invalid source specification: {0}")]
    InvalidSpec(String),

    /// Table or column name outside the safe character set
    #[error("Invalid identifier: {0:?}")]
    InvalidIdentifier(String),

    /// Parameter (or metadata) names differ from the reference source
    #[error(
        "Schema mismatch in {}: missing {:?}, unexpected {:?}",
        path.display(),
        missing,
        extra
    )]
    SchemaMismatch {
        path: PathBuf,
        missing: Vec<String>,
        extra: Vec<String>,
    },

    /// Requested resource not found
    #[error("Not found: {0}")]
    NotFound(String),
}

impl Error {
    /// Build a closure mapping a sqlx error into [`Error::Store`] for `statement`
    pub fn store(statement: &str) -> impl FnOnce(sqlx::Error) -> Error + '_ {
        move |source| Error::Store {
            statement: statement.to_string(),
            source,
        }
    }
}
