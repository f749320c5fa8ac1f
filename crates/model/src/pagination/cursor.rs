use crate::pagination::page_size::PageSize;
use serde::{Deserialize, Serialize};

/// Offset-based pagination cursor.
///
/// The offset only moves forward, by exactly one page size per non-empty page.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct OffsetCursor {
    offset: usize,
    page_size: PageSize,
}

impl OffsetCursor {
    /// Starts a fresh cursor at offset 0.
    pub fn start(page_size: PageSize) -> Self {
        Self {
            offset: 0,
            page_size,
        }
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn page_size(&self) -> PageSize {
        self.page_size
    }

    /// Returns the cursor positioned at the next page.
    pub fn advance(self) -> Self {
        Self {
            offset: self.offset + self.page_size.get(),
            page_size: self.page_size,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advances_by_page_size() {
        let size = PageSize::new(3).unwrap();
        let offsets: Vec<usize> = std::iter::successors(Some(OffsetCursor::start(size)), |c| {
            Some(c.advance())
        })
        .take(4)
        .map(|c| c.offset())
        .collect();

        assert_eq!(offsets, vec![0, 3, 6, 9]);
    }
}
