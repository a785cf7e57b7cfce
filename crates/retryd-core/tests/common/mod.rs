//! Shared helpers for integration tests.

use retryd_core::headers::{
    Headers, EXCEPTION_TYPE, ORIGIN_TOPIC, PRODUCED_TIMESTAMP_MS, RETRY_ATTEMPTS,
};
use retryd_core::producer::{FileOutbox, OutboundMessage};

/// Retry-channel headers as a failing consumer would publish them.
pub fn retry_headers(exception: &str, attempts: Option<&str>, timestamp_ms: i64, origin: &str) -> Headers {
    let mut headers = Headers::new()
        .with(EXCEPTION_TYPE, format!("\"{exception}\""))
        .with(ORIGIN_TOPIC, origin)
        .with(PRODUCED_TIMESTAMP_MS, timestamp_ms.to_string());
    if let Some(a) = attempts {
        headers.push(RETRY_ATTEMPTS, a);
    }
    headers
}

/// Messages appended to the outbox file for `topic` (empty if none yet).
pub fn read_outbox(outbox: &FileOutbox, topic: &str) -> Vec<OutboundMessage> {
    let path = outbox.topic_path(topic).unwrap();
    match std::fs::read_to_string(&path) {
        Ok(text) => text
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect(),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
        Err(e) => panic!("read outbox {}: {e}", path.display()),
    }
}
