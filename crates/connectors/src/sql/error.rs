use crate::file::csv::error::FileError;
use mysql_common::value::convert::FromValueError;
use thiserror::Error;

/// All errors coming from the database/query layer.
#[derive(Debug, Error)]
pub enum DbError {
    /// Low-level I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// MySQL driver error raised while running a query.
    #[error("MySQL error: {0}")]
    MySql(#[from] mysql_async::Error),

    /// The connection could not be established in the first place.
    #[error("Connection error: {0}")]
    Connector(#[from] ConnectorError),

    /// The CSV file being loaded could not be read.
    #[error("File error: {0}")]
    File(#[from] FileError),

    /// A column was missing from a result row.
    #[error("Column '{0}' missing from result row")]
    MissingColumn(String),

    /// A column value could not be converted to the expected type.
    #[error("Failed to decode column '{column}': {reason}")]
    Decode { column: String, reason: String },

    /// A table or database name that is not a plain identifier.
    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),

    /// The connection URL does not name a database.
    #[error("Connection URL does not select a database")]
    MissingDatabase,

    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl DbError {
    pub fn decode(column: &str, err: FromValueError) -> Self {
        DbError::Decode {
            column: column.to_string(),
            reason: err.to_string(),
        }
    }
}

/// Errors happening during adapter or connection setup.
#[derive(Debug, Error)]
pub enum ConnectorError {
    /// The driver failed to open a connection.
    #[error("MySQL connection failed: {0}")]
    MySql(#[from] mysql_async::Error),

    /// The connection string could not be parsed.
    #[error("Invalid connection URL: {0}")]
    InvalidUrl(#[from] mysql_async::UrlError),
}
