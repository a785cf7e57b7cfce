//! Queue entry types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable identity of the original message (the transport key).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(String);

impl MessageId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MessageId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for MessageId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// One in-flight retry, persisted as
/// `{timeStamp, originTopic, retryAttempt, payload}`.
///
/// `timestamp_ms` is the produce time of the first failure and is carried
/// forward unchanged across attempts; `attempt` is the attempt number this
/// record waits for (completed retries + 1).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryRecord {
    #[serde(rename = "timeStamp")]
    pub timestamp_ms: i64,
    #[serde(rename = "originTopic")]
    pub origin_topic: String,
    #[serde(rename = "retryAttempt")]
    pub attempt: u32,
    #[serde(default)]
    pub payload: serde_json::Value,
}
