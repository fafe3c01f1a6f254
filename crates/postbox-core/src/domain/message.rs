//! Outbound message and its storage codec.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::errors::QueueError;

/// A fully formed outbound email, as the transport needs it to send.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OutboundMessage {
    pub from: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub to: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cc: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub bcc: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_body: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html_body: Option<String>,

    /// Extra headers, kept sorted so encoding is stable.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
}

impl OutboundMessage {
    pub fn new(from: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            ..Self::default()
        }
    }

    pub fn with_to(mut self, address: impl Into<String>) -> Self {
        self.to.push(address.into());
        self
    }

    pub fn with_cc(mut self, address: impl Into<String>) -> Self {
        self.cc.push(address.into());
        self
    }

    pub fn with_bcc(mut self, address: impl Into<String>) -> Self {
        self.bcc.push(address.into());
        self
    }

    pub fn with_reply_to(mut self, address: impl Into<String>) -> Self {
        self.reply_to = Some(address.into());
        self
    }

    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    pub fn with_text_body(mut self, body: impl Into<String>) -> Self {
        self.text_body = Some(body.into());
        self
    }

    pub fn with_html_body(mut self, body: impl Into<String>) -> Self {
        self.html_body = Some(body.into());
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Every envelope recipient: to, then cc, then bcc.
    pub fn recipients(&self) -> impl Iterator<Item = &str> {
        self.to
            .iter()
            .chain(&self.cc)
            .chain(&self.bcc)
            .map(String::as_str)
    }
}

/// Current blob layout version written by `MessageCodec::encode`.
pub const CODEC_VERSION: u32 = 1;

#[derive(Serialize)]
struct StoredMessageRef<'a> {
    version: u32,
    message: &'a OutboundMessage,
}

#[derive(Deserialize)]
struct StoredMessage {
    version: u32,
    message: OutboundMessage,
}

/// Turns an `OutboundMessage` into the opaque blob kept in a queue row, and back.
pub struct MessageCodec;

impl MessageCodec {
    pub fn encode(message: &OutboundMessage) -> Result<String, QueueError> {
        serde_json::to_string(&StoredMessageRef {
            version: CODEC_VERSION,
            message,
        })
        .map_err(|e| QueueError::Encode(e.to_string()))
    }

    pub fn decode(blob: &str) -> Result<OutboundMessage, QueueError> {
        let stored: StoredMessage =
            serde_json::from_str(blob).map_err(|e| QueueError::Decode(e.to_string()))?;
        if stored.version != CODEC_VERSION {
            return Err(QueueError::Decode(format!(
                "unsupported message version {}",
                stored.version
            )));
        }
        Ok(stored.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> OutboundMessage {
        OutboundMessage::new("noreply@example.org")
            .with_to("alice@example.org")
            .with_cc("bob@example.org")
            .with_bcc("audit@example.org")
            .with_subject("Your invoice")
            .with_text_body("Hello Alice")
            .with_html_body("<p>Hello Alice</p>")
            .with_header("X-Campaign", "invoices")
    }

    #[test]
    fn codec_restores_the_full_message() {
        let message = sample();
        let blob = MessageCodec::encode(&message).unwrap();
        assert_eq!(MessageCodec::decode(&blob).unwrap(), message);
    }

    #[test]
    fn blob_is_versioned() {
        let blob = MessageCodec::encode(&sample()).unwrap();
        let v: serde_json::Value = serde_json::from_str(&blob).unwrap();
        assert_eq!(v["version"], CODEC_VERSION);
        assert_eq!(v["message"]["subject"], "Your invoice");
    }

    #[test]
    fn malformed_blob_is_a_decode_error() {
        let err = MessageCodec::decode("{not json").unwrap_err();
        assert!(matches!(err, QueueError::Decode(_)));
    }

    #[test]
    fn unknown_version_is_rejected() {
        let blob = r#"{"version":99,"message":{"from":"a@example.org"}}"#;
        let err = MessageCodec::decode(blob).unwrap_err();
        assert!(err.to_string().contains("99"));
    }

    #[test]
    fn recipients_cover_every_list() {
        let message = sample();
        let all: Vec<&str> = message.recipients().collect();
        assert_eq!(
            all,
            vec!["alice@example.org", "bob@example.org", "audit@example.org"]
        );
    }
}
