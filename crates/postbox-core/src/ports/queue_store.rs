//! QueueStore port - durable table of queued messages
//!
//! The store is the only shared mutable resource. It knows nothing about
//! delivery: the processor decides, the store persists.
//!
//! # Implementations
//! - **InMemoryQueueStore**: tests and single-process use
//! - **FileQueueStore**: one JSON file per row, atomic renames

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures_util::future;
use futures_util::stream::{self, BoxStream, StreamExt, TryStreamExt};

use crate::domain::{AttemptPatch, QueueItem, QueueItemId, StoreError};

/// Lazy cursor over queue rows.
pub type RowStream<'a> = BoxStream<'a, Result<QueueItem, StoreError>>;

/// Yield from `rows` until `limit` rows were read successfully.
///
/// Errors pass through uncounted. Nothing is pulled from `rows` once the
/// limit is reached.
pub fn take_rows(rows: RowStream<'_>, limit: usize) -> RowStream<'_> {
    stream::unfold((rows, 0usize), move |(mut rows, taken)| async move {
        if taken >= limit {
            return None;
        }
        let row = rows.next().await?;
        let taken = taken + usize::from(row.is_ok());
        Some((row, (rows, taken)))
    })
    .boxed()
}

/// Selection criteria for one processing round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Eligibility {
    /// At most this many rows are yielded.
    pub limit: usize,
    /// Rows with `attempts >= max_attempts` are never yielded.
    pub max_attempts: u32,
    /// Rows with `time_to_send > now` are never yielded.
    pub now: DateTime<Utc>,
}

impl Eligibility {
    pub fn admits(&self, item: &QueueItem) -> bool {
        item.is_eligible(self.max_attempts, self.now)
    }
}

/// Durable CRUD surface over queue rows.
///
/// # Contract
/// - `scan` and `select_eligible` yield rows oldest first (`created_at`).
/// - `update_attributes` writes only the columns named by the patch.
/// - Every operation except `table_exists` / `create_table` fails with
///   `StoreError::TableMissing` when the table is absent.
#[async_trait]
pub trait QueueStore: Send + Sync {
    /// Name of the backing table.
    fn table(&self) -> &str;

    async fn table_exists(&self) -> Result<bool, StoreError>;

    /// Create the backing table. Calling it on an existing table is a no-op.
    async fn create_table(&self) -> Result<(), StoreError>;

    async fn insert(&self, item: QueueItem) -> Result<(), StoreError>;

    /// Every row, oldest first.
    fn scan(&self) -> RowStream<'_>;

    /// Up to `criteria.limit` eligible rows, oldest first.
    ///
    /// The default filters `scan` and stops pulling rows once the limit is
    /// reached. Unreadable rows are passed through as `Err` without using
    /// up the limit.
    fn select_eligible(&self, criteria: Eligibility) -> RowStream<'_> {
        take_rows(
            self.scan()
                .try_filter(move |item| future::ready(criteria.admits(item)))
                .boxed(),
            criteria.limit,
        )
    }

    async fn get(&self, id: QueueItemId) -> Result<Option<QueueItem>, StoreError>;

    async fn update_attributes(
        &self,
        id: QueueItemId,
        patch: &AttemptPatch,
    ) -> Result<(), StoreError>;

    /// Delete every row with a `sent_time`. Returns how many went.
    async fn delete_where_sent(&self) -> Result<u64, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::QueueItemId;
    use chrono::TimeZone;
    use ulid::Ulid;

    fn row() -> QueueItem {
        QueueItem::pending(
            QueueItemId::from_ulid(Ulid::new()),
            None,
            "{}".into(),
            Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap(),
            None,
        )
    }

    fn unreadable() -> Result<QueueItem, StoreError> {
        Err(StoreError::Io(std::io::Error::other("unreadable")))
    }

    #[tokio::test]
    async fn errors_do_not_use_up_the_limit() {
        let rows = stream::iter(vec![unreadable(), unreadable(), Ok(row()), Ok(row()), Ok(row())]);
        let taken: Vec<_> = take_rows(rows.boxed(), 2).collect().await;

        assert_eq!(taken.len(), 4);
        assert_eq!(taken.iter().filter(|r| r.is_ok()).count(), 2);
    }

    #[tokio::test]
    async fn stops_pulling_at_the_limit() {
        // A pending error after the last wanted row is never reached.
        let rows = stream::iter(vec![Ok(row()), unreadable()]);
        let taken: Vec<_> = take_rows(rows.boxed(), 1).collect().await;
        assert_eq!(taken.len(), 1);
        assert!(taken[0].is_ok());
    }

    #[tokio::test]
    async fn zero_limit_yields_nothing() {
        let rows = stream::iter(vec![Ok(row())]);
        assert!(take_rows(rows.boxed(), 0).collect::<Vec<_>>().await.is_empty());
    }
}
