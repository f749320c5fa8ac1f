use crate::records::user::UserRecord;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// One bounded batch of records returned by a single fetch.
///
/// A page is empty if and only if the source is exhausted at `offset`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page {
    pub offset: usize,
    pub records: Vec<UserRecord>,
    pub took_ms: u128,
    pub fetched_at: DateTime<Utc>,
}

impl Page {
    pub fn new(offset: usize, records: Vec<UserRecord>, took_ms: u128) -> Self {
        Page {
            offset,
            records,
            took_ms,
            fetched_at: Utc::now(),
        }
    }

    pub fn empty(offset: usize) -> Self {
        Self::new(offset, Vec::new(), 0)
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn into_records(self) -> Vec<UserRecord> {
        self.records
    }
}
