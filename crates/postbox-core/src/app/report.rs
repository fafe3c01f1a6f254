//! RoundReport - what one processing round did.

use serde::Serialize;

use crate::domain::DeliveryOutcome;

/// Tally of a processing round.
///
/// Every selected item lands in exactly one of `sent`, `failed` or
/// `undecodable`. `dead_lettered` and `persistence_failures` overlap with
/// those.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RoundReport {
    pub selected: usize,
    pub sent: usize,
    pub failed: usize,
    pub undecodable: usize,
    /// Failed items that have now used up their attempts.
    pub dead_lettered: usize,
    /// Attempt bookkeeping that could not be written back.
    pub persistence_failures: usize,
    /// Rows removed by auto-purge; `None` when it did not run or failed.
    pub purged: Option<u64>,
    /// Auto-purge ran and returned an error.
    pub purge_failed: bool,
}

impl RoundReport {
    pub fn record(&mut self, outcome: &DeliveryOutcome) {
        match outcome {
            DeliveryOutcome::Sent => self.sent += 1,
            DeliveryOutcome::Failed(_) => self.failed += 1,
            DeliveryOutcome::Undecodable(_) => self.undecodable += 1,
        }
    }

    /// Every selected item was sent and everything was written back.
    ///
    /// An empty round is a success.
    pub fn is_success(&self) -> bool {
        self.sent == self.selected && self.persistence_failures == 0 && !self.purge_failed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TransportError;

    #[test]
    fn empty_round_succeeds() {
        assert!(RoundReport::default().is_success());
    }

    #[test]
    fn any_failure_fails_the_round() {
        let mut report = RoundReport {
            selected: 2,
            ..RoundReport::default()
        };
        report.record(&DeliveryOutcome::Sent);
        report.record(&DeliveryOutcome::Failed(TransportError::Rejected("no".into())));
        assert_eq!((report.sent, report.failed), (1, 1));
        assert!(!report.is_success());
    }

    #[test]
    fn bookkeeping_failures_fail_the_round() {
        let mut report = RoundReport {
            selected: 1,
            ..RoundReport::default()
        };
        report.record(&DeliveryOutcome::Sent);
        assert!(report.is_success());

        report.persistence_failures = 1;
        assert!(!report.is_success());

        report.persistence_failures = 0;
        report.purge_failed = true;
        assert!(!report.is_success());
    }
}
