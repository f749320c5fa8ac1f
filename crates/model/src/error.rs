use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ModelError {
    #[error("page size must be a positive integer, got {0}")]
    InvalidPageSize(usize),

    #[error("invalid page size '{0}': expected a positive integer")]
    PageSizeParse(String),
}
