//! Outbound channel: the capability used to send messages back to their
//! origin topic or on to the permanent failure topic.

mod outbox;
#[cfg(test)]
mod recording;

pub use outbox::FileOutbox;
#[cfg(test)]
pub use recording::RecordingProducer;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::headers::{APPLICATION_JSON, RETRY_ATTEMPTS};

/// Header name -> value attached to an outbound message.
pub type OutboundHeaders = BTreeMap<String, String>;

/// A message ready for the outbound channel. Payloads are JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboundMessage {
    pub topic: String,
    pub headers: OutboundHeaders,
    pub content_type: String,
    pub payload: serde_json::Value,
}

impl OutboundMessage {
    pub fn json(
        topic: impl Into<String>,
        headers: OutboundHeaders,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            topic: topic.into(),
            headers,
            content_type: APPLICATION_JSON.to_string(),
            payload,
        }
    }

    /// Re-dispatch of a queued retry: carries only the attempt number.
    pub fn retry(topic: impl Into<String>, attempt: u32, payload: serde_json::Value) -> Self {
        let headers = OutboundHeaders::from([(RETRY_ATTEMPTS.to_string(), attempt.to_string())]);
        Self::json(topic, headers, payload)
    }
}

/// The outbound channel failed to accept a message.
#[derive(Debug, Error)]
pub enum SendError {
    #[error("failed to send message to topic {topic}: {source}")]
    Io {
        topic: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to encode message for topic {topic}: {source}")]
    Serialize {
        topic: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to send message to topic {topic}: {reason}")]
    Rejected { topic: String, reason: String },
}

#[async_trait]
pub trait MessageProducer: Send + Sync {
    /// Deliver one message. No retry is applied here.
    async fn send(&self, message: OutboundMessage) -> Result<(), SendError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn retry_message_carries_only_attempt_header() {
        let msg = OutboundMessage::retry("orders", 2, json!({"id": 1}));
        assert_eq!(msg.topic, "orders");
        assert_eq!(msg.content_type, "application/json");
        assert_eq!(msg.headers.len(), 1);
        assert_eq!(msg.headers.get(RETRY_ATTEMPTS).map(String::as_str), Some("2"));
    }
}
