use bigdecimal::BigDecimal;
use futures::{Stream, TryStreamExt};
use model::records::user::UserRecord;

/// Running totals for an age average, folded one record at a time.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AgeSummary {
    pub total: BigDecimal,
    pub count: u64,
}

impl AgeSummary {
    pub fn add(mut self, age: BigDecimal) -> Self {
        self.total += age;
        self.count += 1;
        self
    }

    /// `None` when no ages were seen.
    pub fn average(&self) -> Option<BigDecimal> {
        if self.count == 0 {
            None
        } else {
            Some(self.total.clone() / BigDecimal::from(self.count))
        }
    }
}

/// Just the ages of a record stream.
pub fn stream_ages<S, E>(records: S) -> impl Stream<Item = Result<BigDecimal, E>>
where
    S: Stream<Item = Result<UserRecord, E>>,
{
    records.map_ok(|record| record.age)
}

/// Folds the stream into a sum and a count without holding more than one
/// record at a time.
pub async fn summarize_ages<S, E>(records: S) -> Result<AgeSummary, E>
where
    S: Stream<Item = Result<UserRecord, E>>,
{
    stream_ages(records)
        .try_fold(AgeSummary::default(), |summary, age| async move {
            Ok(summary.add(age))
        })
        .await
}

/// Average age across the stream, `None` for an empty source.
pub async fn average_age<S, E>(records: S) -> Result<Option<BigDecimal>, E>
where
    S: Stream<Item = Result<UserRecord, E>>,
{
    Ok(summarize_ages(records).await?.average())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{batch::batch_stream, filter::stream_records};
    use connectors::{
        memory::{FailurePlan, MemoryPageFetcher},
        sql::error::DbError,
    };
    use model::pagination::page_size::PageSize;
    use bigdecimal::Zero;
    use std::str::FromStr;

    fn users(ages: &[i64]) -> Vec<UserRecord> {
        ages.iter()
            .enumerate()
            .map(|(i, age)| UserRecord::new(format!("u{i}"), "n", "e@example.com", *age))
            .collect()
    }

    #[tokio::test]
    async fn averages_across_pages() {
        let fetcher = MemoryPageFetcher::new(users(&[20, 30, 40, 51]));
        let pages = batch_stream(fetcher, PageSize::new(3).unwrap());

        let average = average_age(stream_records(pages)).await.unwrap();
        assert_eq!(average, Some(BigDecimal::from_str("35.25").unwrap()));
    }

    #[tokio::test]
    async fn empty_source_has_no_average() {
        let pages = batch_stream(MemoryPageFetcher::new(Vec::new()), PageSize::new(3).unwrap());

        let summary = summarize_ages(stream_records(pages)).await.unwrap();
        assert_eq!(summary.count, 0);
        assert_eq!(summary.average(), None);
    }

    #[tokio::test]
    async fn propagates_fetch_errors() {
        let fetcher = MemoryPageFetcher::new(users(&[20, 30, 40])).failing(FailurePlan {
            offset: 2,
            times: None,
        });
        let pages = batch_stream(fetcher, PageSize::new(2).unwrap());

        let result = average_age(stream_records(pages)).await;
        assert!(matches!(result, Err(DbError::Io(_))));
    }

    #[tokio::test]
    async fn stream_ages_projects_age_column() {
        let pages = batch_stream(
            MemoryPageFetcher::new(users(&[18, 99])),
            PageSize::new(1).unwrap(),
        );

        let ages: Vec<BigDecimal> = stream_ages(stream_records(pages)).try_collect().await.unwrap();
        assert_eq!(ages, vec![BigDecimal::from(18), BigDecimal::from(99)]);
    }

    #[test]
    fn summary_is_exact_for_decimals() {
        let summary = AgeSummary::default()
            .add(BigDecimal::from_str("0.1").unwrap())
            .add(BigDecimal::from_str("0.2").unwrap());

        assert_eq!(summary.total, BigDecimal::from_str("0.3").unwrap());
        assert!(!summary.total.is_zero());
    }
}
