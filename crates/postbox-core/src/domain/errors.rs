//! Error types for queue operations.
//!
//! Three layers, one enum each:
//! - `StoreError`: what a `QueueStore` backend can report.
//! - `TransportError`: what a `Mailer` can report. Inside a processing round
//!   this is an expected outcome, never propagated as `Err`.
//! - `QueueError`: what the public `MailQueue` API returns.

use std::time::Duration;

use thiserror::Error;

use super::QueueItemId;

/// Operational classification of a `QueueError`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Misconfiguration (missing table, invalid option). Never retried.
    Fatal,
    /// Storage failure. Surfaced to the caller of the failing operation.
    Infrastructure,
    /// The stored data itself is broken; retrying will not help.
    Permanent,
    /// Worth another attempt on a later round.
    Transient,
}

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("persistence error: {0}")]
    Persistence(#[from] StoreError),

    #[error("cannot encode message: {0}")]
    Encode(String),

    #[error("cannot decode queued message: {0}")]
    Decode(String),

    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
}

impl QueueError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            QueueError::Configuration(_) => ErrorKind::Fatal,
            QueueError::Persistence(StoreError::TableMissing(_)) => ErrorKind::Fatal,
            QueueError::Persistence(_) => ErrorKind::Infrastructure,
            QueueError::Encode(_) | QueueError::Decode(_) => ErrorKind::Permanent,
            QueueError::Transport(_) => ErrorKind::Transient,
        }
    }

    pub fn is_fatal(&self) -> bool {
        self.kind() == ErrorKind::Fatal
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("table `{0}` does not exist")]
    TableMissing(String),

    #[error("row {0} not found")]
    RowNotFound(QueueItemId),

    #[error("row {0} already exists")]
    Duplicate(QueueItemId),

    #[error("row {id} rejected: {reason}")]
    InvalidRow { id: QueueItemId, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("corrupt row: {0}")]
    Corrupt(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The server refused the message.
    #[error("message rejected: {0}")]
    Rejected(String),

    /// The server could not be reached or dropped the session.
    #[error("transport unavailable: {0}")]
    Unavailable(String),

    #[error("send timed out after {0:?}")]
    TimedOut(Duration),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_table_is_fatal_even_through_persistence() {
        let err = QueueError::from(StoreError::TableMissing("mail_queue".into()));
        assert_eq!(err.kind(), ErrorKind::Fatal);
        assert!(err.to_string().contains("mail_queue"));
    }

    #[test]
    fn classification() {
        let io = std::io::Error::other("disk full");
        assert_eq!(
            QueueError::from(StoreError::from(io)).kind(),
            ErrorKind::Infrastructure
        );
        assert_eq!(QueueError::Decode("x".into()).kind(), ErrorKind::Permanent);
        assert_eq!(
            QueueError::from(TransportError::Unavailable("down".into())).kind(),
            ErrorKind::Transient
        );
        assert!(QueueError::Configuration("bad".into()).is_fatal());
    }
}
