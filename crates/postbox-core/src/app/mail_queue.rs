//! MailQueue - the public face of the queue
//!
//! Holds the injected store, mailer, clock and id generator. Round
//! processing lives in `processor`, purging in `purge`.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::info;

use super::builder::MailQueueBuilder;
use super::config::QueueConfig;
use super::status::{self, QueueCounts};
use crate::domain::{MessageCodec, OutboundMessage, QueueError, QueueItem, QueueItemId};
use crate::ports::{Clock, IdGenerator, Mailer, QueueStore};

/// Persistent outbound mail queue.
///
/// # Example
/// ```ignore
/// let queue = MailQueue::builder()
///     .config(config)
///     .store(store)
///     .mailer(mailer)
///     .build()?;
///
/// queue.enqueue(&message, None).await?;
/// let ok = queue.process().await?;
/// ```
pub struct MailQueue {
    pub(super) config: QueueConfig,
    pub(super) store: Arc<dyn QueueStore>,
    pub(super) mailer: Arc<dyn Mailer>,
    pub(super) clock: Arc<dyn Clock>,
    pub(super) ids: Arc<dyn IdGenerator>,
}

impl MailQueue {
    pub fn builder() -> MailQueueBuilder {
        MailQueueBuilder::new()
    }

    pub fn config(&self) -> &QueueConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn QueueStore> {
        &self.store
    }

    /// Store `message` for later delivery.
    ///
    /// The row is pending with no attempts. Without `time_to_send` it is due
    /// immediately. Nothing is sent here.
    pub async fn enqueue(
        &self,
        message: &OutboundMessage,
        time_to_send: Option<DateTime<Utc>>,
    ) -> Result<QueueItemId, QueueError> {
        let now = self.clock.now();
        let blob = MessageCodec::encode(message)?;
        let item = QueueItem::pending(
            self.ids.generate(now),
            message.subject.clone(),
            blob,
            now,
            time_to_send,
        );
        let id = item.id;
        let due = item.time_to_send;
        self.store.insert(item).await?;

        info!(%id, table = self.store.table(), time_to_send = %due, "message queued");
        Ok(id)
    }

    /// Fail with `Configuration` if the backing table is absent.
    pub async fn verify_table(&self) -> Result<(), QueueError> {
        if self.store.table_exists().await? {
            Ok(())
        } else {
            Err(QueueError::Configuration(format!(
                "queue table `{}` does not exist",
                self.store.table()
            )))
        }
    }

    /// Create the backing table if it is missing.
    pub async fn install(&self) -> Result<(), QueueError> {
        self.store.create_table().await?;
        info!(table = self.store.table(), "queue table installed");
        Ok(())
    }

    /// Row counts per state, as of now.
    pub async fn status(&self) -> Result<QueueCounts, QueueError> {
        self.verify_table().await?;
        let counts =
            status::count(self.store.as_ref(), self.config.max_attempts, self.clock.now()).await?;
        Ok(counts)
    }
}

impl OutboundMessage {
    /// Hand this message to `queue` instead of sending it directly.
    pub async fn queue(
        &self,
        queue: &MailQueue,
        time_to_send: Option<DateTime<Utc>>,
    ) -> Result<QueueItemId, QueueError> {
        queue.enqueue(self, time_to_send).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::StoreError;
    use crate::impls::{InMemoryQueueStore, RecordingMailer};
    use crate::ports::FixedClock;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()
    }

    fn queue_over(store: InMemoryQueueStore) -> MailQueue {
        MailQueue::builder()
            .store(Arc::new(store))
            .mailer(Arc::new(RecordingMailer::new()))
            .clock(Arc::new(FixedClock::new(t0())))
            .build()
            .unwrap()
    }

    fn message() -> OutboundMessage {
        OutboundMessage::new("noreply@example.org")
            .with_to("user@example.org")
            .with_subject("Welcome")
            .with_text_body("Hello")
    }

    #[tokio::test]
    async fn enqueued_rows_start_pending() {
        let store = InMemoryQueueStore::new("mail_queue");
        let queue = queue_over(store.clone());

        let id = queue.enqueue(&message(), None).await.unwrap();

        let row = store.get(id).await.unwrap().unwrap();
        assert_eq!(row.attempts, 0);
        assert_eq!(row.sent_time, None);
        assert_eq!(row.last_attempt_time, None);
        assert_eq!(row.created_at, t0());
        assert_eq!(row.time_to_send, t0());
        assert_eq!(row.subject.as_deref(), Some("Welcome"));
        assert_eq!(MessageCodec::decode(&row.serialized_message).unwrap(), message());
    }

    #[tokio::test]
    async fn explicit_send_time_is_kept() {
        let store = InMemoryQueueStore::new("mail_queue");
        let queue = queue_over(store.clone());
        let later = t0() + Duration::hours(2);

        let id = message().queue(&queue, Some(later)).await.unwrap();

        let row = store.get(id).await.unwrap().unwrap();
        assert_eq!(row.time_to_send, later);
        assert_eq!(row.created_at, t0());
    }

    #[tokio::test]
    async fn enqueue_into_missing_table_is_fatal() {
        let queue = queue_over(InMemoryQueueStore::without_table("mail_queue"));
        let err = queue.enqueue(&message(), None).await.unwrap_err();
        assert!(matches!(
            err,
            QueueError::Persistence(StoreError::TableMissing(_))
        ));
        assert!(err.is_fatal());
    }

    #[tokio::test]
    async fn install_creates_the_table() {
        let queue = queue_over(InMemoryQueueStore::without_table("mail_queue"));
        assert!(matches!(
            queue.verify_table().await,
            Err(QueueError::Configuration(_))
        ));

        queue.install().await.unwrap();
        queue.verify_table().await.unwrap();
        queue.enqueue(&message(), None).await.unwrap();
    }

    #[tokio::test]
    async fn status_counts_new_rows() {
        let queue = queue_over(InMemoryQueueStore::new("mail_queue"));
        queue.enqueue(&message(), None).await.unwrap();
        queue
            .enqueue(&message(), Some(t0() + Duration::days(1)))
            .await
            .unwrap();

        let counts = queue.status().await.unwrap();
        assert_eq!(counts.pending, 1);
        assert_eq!(counts.scheduled, 1);
        assert_eq!(counts.total(), 2);
    }
}
