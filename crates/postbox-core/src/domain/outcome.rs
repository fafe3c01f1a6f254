//! Result of processing one queue row in a round.

use super::errors::TransportError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// The transport accepted the message.
    Sent,

    /// The transport refused, failed or timed out. Retried on a later round.
    Failed(TransportError),

    /// The stored blob could not be decoded; nothing was sent.
    Undecodable(String),
}

impl DeliveryOutcome {
    pub fn is_sent(&self) -> bool {
        matches!(self, DeliveryOutcome::Sent)
    }

    /// Short label for structured logs.
    pub fn label(&self) -> &'static str {
        match self {
            DeliveryOutcome::Sent => "sent",
            DeliveryOutcome::Failed(_) => "failed",
            DeliveryOutcome::Undecodable(_) => "undecodable",
        }
    }
}
