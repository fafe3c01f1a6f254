//! Purge - reclaim rows of delivered mail.

use tracing::info;

use super::mail_queue::MailQueue;
use crate::domain::QueueError;

impl MailQueue {
    /// Delete every sent row. Returns how many went; 0 when there is
    /// nothing to delete.
    ///
    /// Unsent rows, dead-lettered ones included, are never touched.
    pub async fn purge(&self) -> Result<u64, QueueError> {
        let deleted = self.store.delete_where_sent().await?;
        info!(table = self.store.table(), deleted, "purged sent messages");
        Ok(deleted)
    }
}
