//! Status - queue counts per item state

use chrono::{DateTime, Utc};
use futures_util::TryStreamExt;
use serde::Serialize;

use crate::domain::{ItemState, StoreError};
use crate::ports::QueueStore;

/// Number of rows in each state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct QueueCounts {
    pub scheduled: u64,
    pub pending: u64,
    pub sent: u64,
    pub dead_lettered: u64,
}

impl QueueCounts {
    pub fn total(&self) -> u64 {
        self.scheduled + self.pending + self.sent + self.dead_lettered
    }

    fn add(&mut self, state: ItemState) {
        match state {
            ItemState::Scheduled => self.scheduled += 1,
            ItemState::Pending => self.pending += 1,
            ItemState::Sent => self.sent += 1,
            ItemState::DeadLettered => self.dead_lettered += 1,
        }
    }
}

/// Count every row of `store` by its state at `now`.
pub async fn count(
    store: &dyn QueueStore,
    max_attempts: u32,
    now: DateTime<Utc>,
) -> Result<QueueCounts, StoreError> {
    store
        .scan()
        .try_fold(QueueCounts::default(), |mut counts, item| async move {
            counts.add(item.state(max_attempts, now));
            Ok(counts)
        })
        .await
}
