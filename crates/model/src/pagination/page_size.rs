use crate::error::ModelError;
use serde::{Deserialize, Serialize};
use std::{fmt, num::NonZeroUsize, str::FromStr};

/// Number of records requested per fetch. Always positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "usize", into = "usize")]
pub struct PageSize(NonZeroUsize);

impl PageSize {
    pub fn new(size: usize) -> Result<Self, ModelError> {
        NonZeroUsize::new(size)
            .map(PageSize)
            .ok_or(ModelError::InvalidPageSize(size))
    }

    pub fn get(&self) -> usize {
        self.0.get()
    }
}

impl TryFrom<usize> for PageSize {
    type Error = ModelError;

    fn try_from(value: usize) -> Result<Self, Self::Error> {
        PageSize::new(value)
    }
}

impl From<PageSize> for usize {
    fn from(size: PageSize) -> Self {
        size.get()
    }
}

impl FromStr for PageSize {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let size = s
            .trim()
            .parse::<usize>()
            .map_err(|_| ModelError::PageSizeParse(s.to_string()))?;
        PageSize::new(size)
    }
}

impl fmt::Display for PageSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
