//! IdGenerator port - queue row ids
//!
//! # Implementations
//! - **UlidGenerator**: monotonic ULIDs minted from the enqueue timestamp

use std::sync::{Mutex, PoisonError};
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use ulid::{Generator, Ulid};

use crate::domain::QueueItemId;

/// Mints ids for new queue rows.
///
/// Ids generated by one generator must sort in generation order, and each
/// id must carry the millisecond of `at`. The file store rejects rows whose
/// id and `created_at` disagree.
pub trait IdGenerator: Send + Sync {
    fn generate(&self, at: DateTime<Utc>) -> QueueItemId;
}

/// ULID generator that stays monotonic within a millisecond and when the
/// clock steps backwards.
pub struct UlidGenerator {
    inner: Mutex<Generator>,
}

impl UlidGenerator {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Generator::new()),
        }
    }
}

impl Default for UlidGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl IdGenerator for UlidGenerator {
    fn generate(&self, at: DateTime<Utc>) -> QueueItemId {
        let at = SystemTime::from(at);
        let mut generator = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        // Overflow needs 2^80 ids in one millisecond; fall back to a random one.
        let ulid = generator
            .generate_from_datetime(at)
            .unwrap_or_else(|_| Ulid::from_datetime(at));
        QueueItemId::from_ulid(ulid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn ids_are_monotonic_at_a_fixed_instant() {
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let ids = UlidGenerator::new();

        let generated: Vec<QueueItemId> = (0..50).map(|_| ids.generate(at)).collect();
        let mut sorted = generated.clone();
        sorted.sort();
        assert_eq!(generated, sorted);
        assert!(generated.windows(2).all(|w| w[0] != w[1]));
    }

    #[test]
    fn timestamp_part_is_the_requested_instant() {
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let id = UlidGenerator::new().generate(at);
        assert_eq!(id.as_ulid().timestamp_ms(), at.timestamp_millis() as u64);
    }

    #[test]
    fn later_instants_sort_later() {
        let ids = UlidGenerator::new();
        let a = ids.generate(Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap());
        let b = ids.generate(Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 1).unwrap());
        assert!(a < b);
    }
}
