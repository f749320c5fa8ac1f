use connectors::error::AdapterError;
use engine_core::retry::RetryError;
use thiserror::Error;

/// Failure that ended a record or page stream.
#[derive(Error, Debug)]
pub enum StreamError {
    #[error("Fetch failed: {0}")]
    Fetch(#[from] AdapterError),

    #[error("Fetch failed after {attempts} attempts: {source}")]
    RetriesExhausted {
        attempts: usize,
        #[source]
        source: AdapterError,
    },
}

impl From<RetryError<AdapterError>> for StreamError {
    fn from(err: RetryError<AdapterError>) -> Self {
        match err {
            RetryError::Fatal(err) => StreamError::Fetch(err),
            RetryError::AttemptsExceeded { attempts, last } => StreamError::RetriesExhausted {
                attempts,
                source: last,
            },
        }
    }
}
