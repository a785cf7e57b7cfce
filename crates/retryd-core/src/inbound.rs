//! Inbound message envelope as read from a JSON-lines ingest source.
//!
//! One object per line: `{"id": "...", "headers": [["key", "value"], ...], "payload": <json>}`.
//! Header pairs keep their order and may repeat, so duplicates reach the
//! classifier intact.

use serde::Deserialize;

use crate::headers::Headers;
use crate::record::MessageId;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct InboundMessage {
    pub id: MessageId,
    #[serde(default)]
    pub headers: Vec<(String, String)>,
    #[serde(default)]
    pub payload: serde_json::Value,
}

impl InboundMessage {
    /// Parse one ingest line. Blank lines yield `Ok(None)`.
    pub fn parse_line(line: &str) -> Result<Option<Self>, serde_json::Error> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }
        serde_json::from_str(line).map(Some)
    }

    pub fn headers(&self) -> Headers {
        self.headers
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headers::{EXCEPTION_TYPE, ORIGIN_TOPIC};
    use serde_json::json;

    #[test]
    fn parses_full_line() {
        let line = r#"{"id":"m-1","headers":[["x-ibm-retry-origin-topic","orders"],["x-ibm-retry-exception-type","\"ProcessingException\""]],"payload":{"n":1}}"#;
        let msg = InboundMessage::parse_line(line).unwrap().unwrap();
        assert_eq!(msg.id.as_str(), "m-1");
        assert_eq!(msg.payload, json!({"n": 1}));
        let headers = msg.headers();
        assert_eq!(headers.origin_topic().unwrap(), "orders");
        assert_eq!(headers.exception_name().unwrap(), "ProcessingException");
    }

    #[test]
    fn repeated_headers_are_kept() {
        let line = r#"{"id":"m","headers":[["x-ibm-retry-exception-type","A"],["x-ibm-retry-exception-type","B"]]}"#;
        let msg = InboundMessage::parse_line(line).unwrap().unwrap();
        assert_eq!(msg.headers().get_all(EXCEPTION_TYPE).count(), 2);
        assert_eq!(msg.payload, serde_json::Value::Null);
    }

    #[test]
    fn blank_line_is_skipped() {
        assert_eq!(InboundMessage::parse_line("   ").unwrap(), None);
    }

    #[test]
    fn missing_id_is_an_error() {
        let line = format!(r#"{{"headers":[["{ORIGIN_TOPIC}","t"]]}}"#);
        assert!(InboundMessage::parse_line(&line).is_err());
    }
}
