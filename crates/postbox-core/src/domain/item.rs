//! Queue row: the persisted form of a queued message.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::QueueItemId;
use super::state::ItemState;

/// One row of the queue table.
///
/// Design:
/// - Created pending by enqueue (attempts = 0, no sent time).
/// - Mutated only by the processor, through `AttemptPatch`.
/// - Deleted only by purge, and only once `sent_time` is set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueItem {
    pub id: QueueItemId,

    /// Informational copy of the message subject.
    pub subject: Option<String>,

    /// Opaque blob produced by `MessageCodec::encode`.
    pub serialized_message: String,

    /// Insertion time; defines FIFO processing order.
    pub created_at: DateTime<Utc>,

    /// Not eligible for delivery before this instant.
    pub time_to_send: DateTime<Utc>,

    /// Processing attempts so far, successful or not.
    pub attempts: u32,

    pub last_attempt_time: Option<DateTime<Utc>>,

    /// `None` until a transport send succeeded.
    pub sent_time: Option<DateTime<Utc>>,
}

impl QueueItem {
    /// A fresh pending row. `time_to_send` defaults to `created_at`.
    pub fn pending(
        id: QueueItemId,
        subject: Option<String>,
        serialized_message: String,
        created_at: DateTime<Utc>,
        time_to_send: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            id,
            subject,
            serialized_message,
            created_at,
            time_to_send: time_to_send.unwrap_or(created_at),
            attempts: 0,
            last_attempt_time: None,
            sent_time: None,
        }
    }

    pub fn is_sent(&self) -> bool {
        self.sent_time.is_some()
    }

    /// Unsent, under the attempt ceiling, and due.
    pub fn is_eligible(&self, max_attempts: u32, now: DateTime<Utc>) -> bool {
        self.sent_time.is_none() && self.attempts < max_attempts && self.time_to_send <= now
    }

    pub fn state(&self, max_attempts: u32, now: DateTime<Utc>) -> ItemState {
        if self.is_sent() {
            ItemState::Sent
        } else if self.attempts >= max_attempts {
            ItemState::DeadLettered
        } else if self.time_to_send > now {
            ItemState::Scheduled
        } else {
            ItemState::Pending
        }
    }

    /// Count one processing attempt made at `at`.
    ///
    /// Always bumps `attempts` and `last_attempt_time`; sets `sent_time` only
    /// when `delivered` and not already set. Returns the fields that changed
    /// so the store can persist just those.
    pub fn record_attempt(&mut self, at: DateTime<Utc>, delivered: bool) -> AttemptPatch {
        let mut patch = AttemptPatch {
            attempts: Some(self.attempts.saturating_add(1)),
            last_attempt_time: Some(at),
            sent_time: None,
        };
        if delivered && self.sent_time.is_none() {
            patch.sent_time = Some(at);
        }
        patch.apply_to(self);
        patch
    }
}

/// Partial update of a queue row. `None` means "column not named".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AttemptPatch {
    pub attempts: Option<u32>,
    pub last_attempt_time: Option<DateTime<Utc>>,
    pub sent_time: Option<DateTime<Utc>>,
}

impl AttemptPatch {
    /// Apply the named columns to `item`.
    ///
    /// `attempts` never decreases and an existing `sent_time` is never
    /// overwritten.
    pub fn apply_to(&self, item: &mut QueueItem) {
        if let Some(attempts) = self.attempts {
            item.attempts = item.attempts.max(attempts);
        }
        if let Some(at) = self.last_attempt_time {
            item.last_attempt_time = Some(at);
        }
        if let Some(at) = self.sent_time
            && item.sent_time.is_none()
        {
            item.sent_time = Some(at);
        }
    }

    /// Column names touched by this patch, for logging.
    pub fn fields(&self) -> Vec<&'static str> {
        let mut fields = Vec::with_capacity(3);
        if self.attempts.is_some() {
            fields.push("attempts");
        }
        if self.last_attempt_time.is_some() {
            fields.push("last_attempt_time");
        }
        if self.sent_time.is_some() {
            fields.push("sent_time");
        }
        fields
    }

    pub fn is_empty(&self) -> bool {
        self.attempts.is_none() && self.last_attempt_time.is_none() && self.sent_time.is_none()
    }
}
