use crate::{
    file::csv::{
        error::FileError,
        reader::{MissingId, parse_user},
    },
    source::PageFetcher,
};
use async_trait::async_trait;
use csv::{Reader, StringRecord};
use model::{pagination::page_size::PageSize, records::page::Page};
use std::{
    fs::File,
    path::{Path, PathBuf},
    time::Instant,
};
use tracing::debug;

/// Pages through a CSV file of users.
///
/// Reads sequentially. A request for an offset behind the current read
/// position reopens the file and skips forward again. Rows without an id get
/// one derived from the path and line number, so a row reads back as the same
/// record every time.
pub struct CsvPageFetcher {
    path: PathBuf,
    id_seed: String,
    reader: Reader<File>,
    headers: StringRecord,
    /// Tracks how many rows have been consumed from the file.
    rows_read: usize,
}

impl CsvPageFetcher {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, FileError> {
        let path = path.as_ref().to_path_buf();
        let mut reader = Reader::from_path(&path)?;
        let headers = reader.headers()?.clone();

        Ok(CsvPageFetcher {
            id_seed: path.display().to_string(),
            path,
            reader,
            headers,
            rows_read: 0,
        })
    }

    fn rewind(&mut self) -> Result<(), FileError> {
        debug!("Rewinding {} to the first row", self.path.display());
        let path = self.path.clone();
        *self = Self::open(path)?;
        Ok(())
    }

    /// Advances past `count` rows. Returns false if the file ended first.
    fn skip(&mut self, count: usize, record: &mut StringRecord) -> Result<bool, FileError> {
        for _ in 0..count {
            if !self.reader.read_record(record)? {
                return Ok(false);
            }
            self.rows_read += 1;
        }
        Ok(true)
    }
}

#[async_trait]
impl PageFetcher for CsvPageFetcher {
    type Error = FileError;

    async fn fetch(&mut self, page_size: PageSize, offset: usize) -> Result<Page, FileError> {
        let start = Instant::now();
        if offset < self.rows_read {
            self.rewind()?;
        }

        let mut record = StringRecord::new();
        if !self.skip(offset - self.rows_read, &mut record)? {
            return Ok(Page::new(offset, Vec::new(), start.elapsed().as_millis()));
        }

        let mut records = Vec::with_capacity(page_size.get());
        while records.len() < page_size.get() {
            if !self.reader.read_record(&mut record)? {
                break;
            }
            self.rows_read += 1;
            records.push(parse_user(
                &record,
                &self.headers,
                MissingId::Derive(&self.id_seed),
            )?);
        }

        Ok(Page::new(offset, records, start.elapsed().as_millis()))
    }

    /// Reopens the file. The next fetch skips forward to its offset again.
    async fn reconnect(&mut self) -> Result<(), FileError> {
        self.rewind()
    }
}
