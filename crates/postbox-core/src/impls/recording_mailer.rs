//! RecordingMailer - scriptable transport for tests and demos.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;

use crate::domain::{OutboundMessage, TransportError};
use crate::ports::Mailer;

/// Records what it "sends" and fails on request.
///
/// - `fail_subject` makes every message with that subject fail.
/// - `fail_all` makes every message fail until switched off.
/// - `with_latency` delays each send, to exercise send timeouts.
#[derive(Debug, Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<OutboundMessage>>,
    calls: AtomicUsize,
    failing_subjects: Mutex<HashSet<String>>,
    fail_all: AtomicBool,
    latency: Option<Duration>,
}

impl RecordingMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn fail_subject(&self, subject: impl Into<String>) {
        self.failing_subjects
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(subject.into());
    }

    pub fn fail_all(&self, fail: bool) {
        self.fail_all.store(fail, Ordering::SeqCst);
    }

    /// Messages accepted so far, in send order.
    pub fn sent(&self) -> Vec<OutboundMessage> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Send calls so far, failed ones included.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn should_fail(&self, message: &OutboundMessage) -> bool {
        if self.fail_all.load(Ordering::SeqCst) {
            return true;
        }
        message.subject.as_ref().is_some_and(|subject| {
            self.failing_subjects
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .contains(subject)
        })
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, message: &OutboundMessage) -> Result<(), TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        if self.should_fail(message) {
            return Err(TransportError::Rejected(format!(
                "scripted failure for {:?}",
                message.subject
            )));
        }
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(message.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn records_and_fails_on_request() {
        let mailer = RecordingMailer::new();
        mailer.fail_subject("bad");
        let good = OutboundMessage::new("a@example.org").with_subject("good");
        let bad = OutboundMessage::new("a@example.org").with_subject("bad");

        assert!(mailer.send(&good).await.is_ok());
        assert!(mailer.send(&bad).await.is_err());
        assert_eq!(mailer.calls(), 2);
        assert_eq!(mailer.sent(), vec![good.clone()]);

        mailer.fail_all(true);
        assert!(mailer.send(&good).await.is_err());
        mailer.fail_all(false);
        assert!(mailer.send(&good).await.is_ok());
    }
}
