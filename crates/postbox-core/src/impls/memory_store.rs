//! InMemoryQueueStore - queue table kept in process memory.

use std::sync::Arc;

use async_trait::async_trait;
use futures_util::stream::{self, StreamExt};
use tokio::sync::Mutex;

use crate::domain::{AttemptPatch, QueueItem, QueueItemId, StoreError};
use crate::ports::{Eligibility, QueueStore, RowStream};

/// In-memory queue table.
///
/// # Details
/// - Rows are kept in insertion order in a `Vec`; selection sorts stably by
///   `created_at`, so equal timestamps keep FIFO order.
/// - `None` means the table does not exist.
/// - Cursors snapshot the rows they will yield, so updates made while a
///   cursor is open never deadlock on the lock.
#[derive(Clone)]
pub struct InMemoryQueueStore {
    table: String,
    rows: Arc<Mutex<Option<Vec<QueueItem>>>>,
}

impl InMemoryQueueStore {
    /// A store whose table already exists.
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            rows: Arc::new(Mutex::new(Some(Vec::new()))),
        }
    }

    /// A store whose table has not been created yet.
    pub fn without_table(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            rows: Arc::new(Mutex::new(None)),
        }
    }

    /// Drop the table and every row in it.
    pub async fn drop_table(&self) {
        *self.rows.lock().await = None;
    }

    pub async fn len(&self) -> usize {
        self.rows.lock().await.as_ref().map_or(0, Vec::len)
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    fn missing(&self) -> StoreError {
        StoreError::TableMissing(self.table.clone())
    }

    /// Rows matching `keep`, oldest first, at most `limit` of them.
    async fn snapshot(
        &self,
        keep: impl Fn(&QueueItem) -> bool,
        limit: usize,
    ) -> Result<Vec<QueueItem>, StoreError> {
        let guard = self.rows.lock().await;
        let rows = guard.as_ref().ok_or_else(|| self.missing())?;
        let mut matched: Vec<&QueueItem> = rows.iter().filter(|row| keep(*row)).collect();
        matched.sort_by_key(|row| row.created_at);
        Ok(matched.into_iter().take(limit).cloned().collect())
    }

    fn stream_snapshot(
        &self,
        keep: impl Fn(&QueueItem) -> bool + Send + 'static,
        limit: usize,
    ) -> RowStream<'_> {
        stream::once(async move { self.snapshot(keep, limit).await })
            .flat_map(|result| match result {
                Ok(rows) => stream::iter(rows.into_iter().map(Ok).collect::<Vec<_>>()),
                Err(e) => stream::iter(vec![Err(e)]),
            })
            .boxed()
    }
}

#[async_trait]
impl QueueStore for InMemoryQueueStore {
    fn table(&self) -> &str {
        &self.table
    }

    async fn table_exists(&self) -> Result<bool, StoreError> {
        Ok(self.rows.lock().await.is_some())
    }

    async fn create_table(&self) -> Result<(), StoreError> {
        let mut guard = self.rows.lock().await;
        if guard.is_none() {
            *guard = Some(Vec::new());
        }
        Ok(())
    }

    async fn insert(&self, item: QueueItem) -> Result<(), StoreError> {
        let mut guard = self.rows.lock().await;
        let rows = guard.as_mut().ok_or_else(|| self.missing())?;
        if rows.iter().any(|row| row.id == item.id) {
            return Err(StoreError::Duplicate(item.id));
        }
        rows.push(item);
        Ok(())
    }

    fn scan(&self) -> RowStream<'_> {
        self.stream_snapshot(|_| true, usize::MAX)
    }

    fn select_eligible(&self, criteria: Eligibility) -> RowStream<'_> {
        self.stream_snapshot(move |row| criteria.admits(row), criteria.limit)
    }

    async fn get(&self, id: QueueItemId) -> Result<Option<QueueItem>, StoreError> {
        let guard = self.rows.lock().await;
        let rows = guard.as_ref().ok_or_else(|| self.missing())?;
        Ok(rows.iter().find(|row| row.id == id).cloned())
    }

    async fn update_attributes(
        &self,
        id: QueueItemId,
        patch: &AttemptPatch,
    ) -> Result<(), StoreError> {
        let mut guard = self.rows.lock().await;
        let rows = guard.as_mut().ok_or_else(|| self.missing())?;
        let row = rows
            .iter_mut()
            .find(|row| row.id == id)
            .ok_or(StoreError::RowNotFound(id))?;
        patch.apply_to(row);
        Ok(())
    }

    async fn delete_where_sent(&self) -> Result<u64, StoreError> {
        let mut guard = self.rows.lock().await;
        let rows = guard.as_mut().ok_or_else(|| self.missing())?;
        let before = rows.len();
        rows.retain(|row| !row.is_sent());
        Ok((before - rows.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use futures_util::TryStreamExt;
    use ulid::Ulid;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()
    }

    fn row(created_offset_secs: i64) -> QueueItem {
        QueueItem::pending(
            QueueItemId::from_ulid(Ulid::new()),
            Some(format!("row {created_offset_secs}")),
            "{}".into(),
            t0() + Duration::seconds(created_offset_secs),
            None,
        )
    }

    fn criteria(limit: usize) -> Eligibility {
        Eligibility {
            limit,
            max_attempts: 3,
            now: t0() + Duration::hours(1),
        }
    }

    #[tokio::test]
    async fn select_is_oldest_first_and_bounded() {
        let store = InMemoryQueueStore::new("mail_queue");
        for offset in [30, 10, 20, 0] {
            store.insert(row(offset)).await.unwrap();
        }

        let rows: Vec<QueueItem> = store
            .select_eligible(criteria(3))
            .try_collect()
            .await
            .unwrap();
        let created: Vec<_> = rows.iter().map(|r| r.created_at).collect();
        assert_eq!(
            created,
            vec![t0(), t0() + Duration::seconds(10), t0() + Duration::seconds(20)]
        );
    }

    #[tokio::test]
    async fn equal_timestamps_keep_insertion_order() {
        let store = InMemoryQueueStore::new("mail_queue");
        let first = row(0);
        let second = row(0);
        store.insert(first.clone()).await.unwrap();
        store.insert(second.clone()).await.unwrap();

        let ids: Vec<QueueItemId> = store
            .scan()
            .map_ok(|r| r.id)
            .try_collect()
            .await
            .unwrap();
        assert_eq!(ids, vec![first.id, second.id]);
    }

    #[tokio::test]
    async fn select_skips_sent_exhausted_and_future_rows() {
        let store = InMemoryQueueStore::new("mail_queue");
        let mut sent = row(0);
        sent.sent_time = Some(t0());
        let mut exhausted = row(1);
        exhausted.attempts = 3;
        let mut future = row(2);
        future.time_to_send = t0() + Duration::days(1);
        let due = row(3);
        for r in [sent, exhausted, future, due.clone()] {
            store.insert(r).await.unwrap();
        }

        let rows: Vec<QueueItem> = store
            .select_eligible(criteria(10))
            .try_collect()
            .await
            .unwrap();
        assert_eq!(rows, vec![due]);
    }

    #[tokio::test]
    async fn update_touches_only_named_columns() {
        let store = InMemoryQueueStore::new("mail_queue");
        let original = row(0);
        store.insert(original.clone()).await.unwrap();

        let patch = AttemptPatch {
            attempts: Some(1),
            ..AttemptPatch::default()
        };
        store.update_attributes(original.id, &patch).await.unwrap();

        let stored = store.get(original.id).await.unwrap().unwrap();
        assert_eq!(stored.attempts, 1);
        assert_eq!(stored.last_attempt_time, None);
        assert_eq!(stored.serialized_message, original.serialized_message);
    }

    #[tokio::test]
    async fn update_of_unknown_row_fails() {
        let store = InMemoryQueueStore::new("mail_queue");
        let id = QueueItemId::from_ulid(Ulid::new());
        let err = store
            .update_attributes(id, &AttemptPatch::default())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::RowNotFound(missing) if missing == id));
    }

    #[tokio::test]
    async fn delete_where_sent_is_idempotent() {
        let store = InMemoryQueueStore::new("mail_queue");
        let mut sent = row(0);
        sent.sent_time = Some(t0());
        store.insert(sent).await.unwrap();
        store.insert(row(1)).await.unwrap();

        assert_eq!(store.delete_where_sent().await.unwrap(), 1);
        assert_eq!(store.delete_where_sent().await.unwrap(), 0);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn missing_table_rejects_writes_and_cursors() {
        let store = InMemoryQueueStore::without_table("mail_queue");
        assert!(!store.table_exists().await.unwrap());
        assert!(matches!(
            store.insert(row(0)).await,
            Err(StoreError::TableMissing(t)) if t == "mail_queue"
        ));
        let err = store
            .select_eligible(criteria(1))
            .try_collect::<Vec<_>>()
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::TableMissing(_)));

        store.create_table().await.unwrap();
        store.create_table().await.unwrap();
        assert!(store.table_exists().await.unwrap());
        store.insert(row(0)).await.unwrap();
    }

    #[tokio::test]
    async fn duplicate_ids_are_rejected() {
        let store = InMemoryQueueStore::new("mail_queue");
        let r = row(0);
        store.insert(r.clone()).await.unwrap();
        assert!(matches!(
            store.insert(r).await,
            Err(StoreError::Duplicate(_))
        ));
    }
}
