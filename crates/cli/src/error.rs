use connectors::{error::AdapterError, sql::error::DbError};
use engine_processing::error::StreamError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("No connection URL given; pass --url or set DATABASE_URL")]
    MissingUrl,

    #[error("Failed to open the source: {0}")]
    Adapter(#[from] AdapterError),

    #[error("Database error: {0}")]
    Database(#[from] DbError),

    #[error("Stream ended with an error: {0}")]
    Stream(#[from] StreamError),

    #[error("Failed to serialize data to JSON: {0}")]
    JsonSerialize(#[from] serde_json::Error),

    #[error("Unexpected error: {0}")]
    Unexpected(String),
}
