//! Derived state of a queue row.

use serde::{Deserialize, Serialize};

/// Where a row stands in its lifecycle.
///
/// Not stored: it is computed from `attempts`, `sent_time` and
/// `time_to_send` against the configured attempt ceiling.
///
/// Transitions:
/// - Scheduled -> Pending (time passes)
/// - Pending -> Sent (successful send, then purged)
/// - Pending -> DeadLettered (last allowed attempt failed)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemState {
    /// Waiting for `time_to_send`.
    Scheduled,

    /// Eligible for the next round.
    Pending,

    /// Delivered; eligible for purge.
    Sent,

    /// Out of attempts; stays in the table until removed by hand.
    DeadLettered,
}

impl ItemState {
    /// Will the processor never touch this row again?
    pub fn is_terminal(self) -> bool {
        matches!(self, ItemState::Sent | ItemState::DeadLettered)
    }
}
