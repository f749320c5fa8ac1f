use crate::{source::PageFetcher, sql::error::DbError};
use async_trait::async_trait;
use model::{
    pagination::page_size::PageSize,
    records::{page::Page, user::UserRecord},
};
use std::{
    io,
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
};

/// How an in-memory source should fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FailurePlan {
    /// Offset at which fetches fail.
    pub offset: usize,
    /// Number of failing attempts before fetches at `offset` succeed.
    /// `None` fails forever.
    pub times: Option<usize>,
}

/// Serves pages from a vector held in memory.
///
/// Every requested offset is logged, which makes the fetch pattern of a
/// stream observable. Clones share the records, the log and the connection
/// state.
#[derive(Debug, Clone)]
pub struct MemoryPageFetcher {
    records: Arc<Vec<UserRecord>>,
    requested: Arc<Mutex<Vec<usize>>>,
    failure: Option<FailurePlan>,
    failures_served: Arc<AtomicUsize>,
    /// When set, a planned failure breaks the connection until `reconnect`.
    drops_connection: bool,
    connection_lost: Arc<AtomicBool>,
    reconnects: Arc<AtomicUsize>,
}

impl MemoryPageFetcher {
    pub fn new(records: Vec<UserRecord>) -> Self {
        Self {
            records: Arc::new(records),
            requested: Arc::new(Mutex::new(Vec::new())),
            failure: None,
            failures_served: Arc::new(AtomicUsize::new(0)),
            drops_connection: false,
            connection_lost: Arc::new(AtomicBool::new(false)),
            reconnects: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn failing(mut self, plan: FailurePlan) -> Self {
        self.failure = Some(plan);
        self
    }

    /// Planned failures also lose the connection: every later fetch fails
    /// until [`PageFetcher::reconnect`] is called.
    pub fn dropping_connection(mut self) -> Self {
        self.drops_connection = true;
        self
    }

    pub fn reconnect_count(&self) -> usize {
        self.reconnects.load(Ordering::SeqCst)
    }

    /// Offsets requested so far, in call order.
    pub fn requested_offsets(&self) -> Vec<usize> {
        self.requested
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn fetch_count(&self) -> usize {
        self.requested_offsets().len()
    }

    fn should_fail(&self, offset: usize) -> bool {
        match self.failure {
            Some(plan) if plan.offset == offset => match plan.times {
                None => true,
                Some(times) => self.failures_served.fetch_add(1, Ordering::SeqCst) < times,
            },
            _ => false,
        }
    }
}

#[async_trait]
impl PageFetcher for MemoryPageFetcher {
    type Error = DbError;

    async fn fetch(&mut self, page_size: PageSize, offset: usize) -> Result<Page, DbError> {
        self.requested
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(offset);

        if self.connection_lost.load(Ordering::SeqCst) {
            return Err(DbError::Io(io::Error::new(
                io::ErrorKind::NotConnected,
                format!("connection is closed, cannot fetch offset {offset}"),
            )));
        }

        if self.should_fail(offset) {
            if self.drops_connection {
                self.connection_lost.store(true, Ordering::SeqCst);
            }
            return Err(DbError::Io(io::Error::new(
                io::ErrorKind::ConnectionReset,
                format!("connection reset while fetching offset {offset}"),
            )));
        }

        let start = offset.min(self.records.len());
        let end = offset.saturating_add(page_size.get()).min(self.records.len());
        Ok(Page::new(offset, self.records[start..end].to_vec(), 0))
    }

    async fn reconnect(&mut self) -> Result<(), DbError> {
        self.reconnects.fetch_add(1, Ordering::SeqCst);
        self.connection_lost.store(false, Ordering::SeqCst);
        Ok(())
    }
}
