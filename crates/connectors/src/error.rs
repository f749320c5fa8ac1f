use crate::{
    file::csv::error::FileError,
    sql::error::{ConnectorError, DbError},
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AdapterError {
    /// An unsupported source kind was requested.
    #[error("Unsupported source: {0}")]
    UnsupportedSource(String),

    /// Failed to initialize a data connector/adapter.
    #[error("Connector error: {0}")]
    Connector(#[from] ConnectorError),

    /// File-related error.
    #[error("File error: {0}")]
    FileError(#[from] FileError),

    /// Database-related error.
    #[error("Database error: {0}")]
    Database(#[from] DbError),
}
