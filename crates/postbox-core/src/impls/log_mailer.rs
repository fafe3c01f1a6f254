//! LogMailer - transport stand-in that only logs.

use async_trait::async_trait;
use tracing::info;

use crate::app::config::TransportConfig;
use crate::domain::{OutboundMessage, TransportError};
use crate::ports::Mailer;

/// Accepts every message and writes a log line instead of talking SMTP.
///
/// Useful for dry runs and local development. A message without any
/// recipient is rejected, as a real relay would.
#[derive(Debug, Clone, Default)]
pub struct LogMailer {
    transport: TransportConfig,
}

impl LogMailer {
    pub fn new(transport: TransportConfig) -> Self {
        Self { transport }
    }
}

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, message: &OutboundMessage) -> Result<(), TransportError> {
        let recipients: Vec<&str> = message.recipients().collect();
        if recipients.is_empty() {
            return Err(TransportError::Rejected("no recipients".into()));
        }
        info!(
            host = %self.transport.host,
            port = self.transport.port,
            encryption = ?self.transport.encryption,
            from = %message.from,
            to = ?recipients,
            subject = message.subject.as_deref().unwrap_or(""),
            "delivered message"
        );
        Ok(())
    }
}
