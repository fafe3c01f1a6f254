//! Mailer port - the mail transport
//!
//! The transport is an external collaborator: it receives a decoded message
//! and says whether it went out. Host, credentials and encryption live in
//! `TransportConfig` and are the implementation's business.

use async_trait::async_trait;

use crate::domain::{OutboundMessage, TransportError};

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: &OutboundMessage) -> Result<(), TransportError>;
}
