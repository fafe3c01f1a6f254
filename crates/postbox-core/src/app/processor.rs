//! Processor - one bounded processing round
//!
//! # Flow
//! 1. Verify the table exists (abort the round if not)
//! 2. Select up to `mails_per_round` eligible rows, oldest first
//! 3. Per row: decode -> send -> record attempt -> `update_attributes`
//! 4. Auto-purge, once every update of the round was issued
//!
//! Per-row failures never stop the round; they only turn its result false.

use futures_util::StreamExt;
use tracing::{debug, error, info, warn};

use super::mail_queue::MailQueue;
use super::report::RoundReport;
use crate::domain::{
    DeliveryOutcome, MessageCodec, QueueError, QueueItem, StoreError, TransportError,
};
use crate::ports::Eligibility;

impl MailQueue {
    /// Run one round. `Ok(true)` only if every selected message was sent
    /// and all bookkeeping was persisted.
    ///
    /// # Errors
    /// `Configuration` if the queue table does not exist. Nothing is touched
    /// in that case.
    pub async fn process(&self) -> Result<bool, QueueError> {
        Ok(self.process_round().await?.is_success())
    }

    /// Run one round and report what happened to each selected row.
    pub async fn process_round(&self) -> Result<RoundReport, QueueError> {
        self.verify_table().await?;

        let now = self.clock.now();
        let max_attempts = self.config.max_attempts;
        let criteria = Eligibility {
            limit: self.config.mails_per_round,
            max_attempts,
            now,
        };
        let mut report = RoundReport::default();

        let mut rows = self.store.select_eligible(criteria);
        while let Some(row) = rows.next().await {
            let mut item = match row {
                Ok(item) => item,
                Err(StoreError::TableMissing(table)) => {
                    return Err(QueueError::Configuration(format!(
                        "queue table `{table}` disappeared during a round"
                    )));
                }
                Err(e) => {
                    error!(error = %e, "cannot read queue row");
                    report.persistence_failures += 1;
                    continue;
                }
            };
            report.selected += 1;

            let outcome = self.deliver(&item).await;
            report.record(&outcome);
            let patch = item.record_attempt(now, outcome.is_sent());

            match &outcome {
                DeliveryOutcome::Sent => {
                    debug!(id = %item.id, attempts = item.attempts, "message sent");
                }
                DeliveryOutcome::Failed(e) => {
                    warn!(id = %item.id, attempts = item.attempts, error = %e, "send failed");
                }
                DeliveryOutcome::Undecodable(reason) => {
                    error!(id = %item.id, attempts = item.attempts, %reason, "cannot decode queued message");
                }
            }
            if !outcome.is_sent() && item.attempts >= max_attempts {
                warn!(
                    id = %item.id,
                    subject = item.subject.as_deref().unwrap_or(""),
                    attempts = item.attempts,
                    "message dead-lettered, no attempts left"
                );
                report.dead_lettered += 1;
            }

            if let Err(e) = self.store.update_attributes(item.id, &patch).await {
                error!(
                    id = %item.id,
                    fields = ?patch.fields(),
                    outcome = outcome.label(),
                    error = %e,
                    "cannot record attempt"
                );
                report.persistence_failures += 1;
            }
        }
        drop(rows);

        if self.config.auto_purge {
            match self.purge().await {
                Ok(deleted) => report.purged = Some(deleted),
                Err(e) => {
                    error!(error = %e, "auto-purge failed");
                    report.purge_failed = true;
                }
            }
        }

        info!(
            table = self.store.table(),
            selected = report.selected,
            sent = report.sent,
            failed = report.failed,
            undecodable = report.undecodable,
            dead_lettered = report.dead_lettered,
            success = report.is_success(),
            "round finished"
        );
        Ok(report)
    }

    async fn deliver(&self, item: &QueueItem) -> DeliveryOutcome {
        let message = match MessageCodec::decode(&item.serialized_message) {
            Ok(message) => message,
            Err(e) => return DeliveryOutcome::Undecodable(e.to_string()),
        };
        let limit = self.config.send_timeout();
        match tokio::time::timeout(limit, self.mailer.send(&message)).await {
            Ok(Ok(())) => DeliveryOutcome::Sent,
            Ok(Err(e)) => DeliveryOutcome::Failed(e),
            Err(_) => DeliveryOutcome::Failed(TransportError::TimedOut(limit)),
        }
    }
}
