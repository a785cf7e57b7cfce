//! Retry-channel message headers and typed extraction.
//!
//! Producers that fail to handle a message republish it on the retry channel
//! with a small set of `x-ibm-retry-*` headers. Each header may appear at most
//! once; extraction enforces that and strips surrounding quote characters.

use std::collections::BTreeMap;
use thiserror::Error;

/// Number of retries the message has already had (optional, defaults to 0).
pub const RETRY_ATTEMPTS: &str = "x-ibm-retry-attempts";
/// Topic the message was consumed from when it failed.
pub const ORIGIN_TOPIC: &str = "x-ibm-retry-origin-topic";
/// Simple name of the exception that sent the message to the retry channel.
pub const EXCEPTION_TYPE: &str = "x-ibm-retry-exception-type";
/// Time the message was first produced onto the retry channel (Unix millis).
pub const PRODUCED_TIMESTAMP_MS: &str = "x-ibm-retry-timestamp-ms";

/// Content type attached to every outbound message.
pub const APPLICATION_JSON: &str = "application/json";

/// Header set in a malformed state: missing, duplicated, or unparsable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HeaderError {
    #[error("message is missing header with key {0}")]
    Missing(&'static str),

    #[error("message has more than one header with key {0}")]
    Duplicate(&'static str),

    #[error("header {key} is not a valid integer: {value:?}")]
    InvalidNumber { key: &'static str, value: String },
}

/// Ordered header multimap as carried by the transport.
///
/// Keys may repeat; values are raw bytes and are decoded as (lossy) UTF-8 on
/// extraction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    entries: Vec<(String, Vec<u8>)>,
}

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a header; an existing header with the same key is kept.
    pub fn push(&mut self, key: impl Into<String>, value: impl Into<Vec<u8>>) {
        self.entries.push((key.into(), value.into()));
    }

    /// Builder-style [`Headers::push`].
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        self.push(key, value);
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[u8])> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// All values recorded under `key`, in arrival order.
    pub fn get_all<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a [u8]> + 'a {
        self.entries
            .iter()
            .filter(move |(k, _)| k == key)
            .map(|(_, v)| v.as_slice())
    }

    /// Simple name of the exception that caused the message to be retried.
    pub fn exception_name(&self) -> Result<String, HeaderError> {
        self.required(EXCEPTION_TYPE)
    }

    /// Topic the message was consumed from when it failed.
    pub fn origin_topic(&self) -> Result<String, HeaderError> {
        self.required(ORIGIN_TOPIC)
    }

    /// Number of retry attempts the message has already had.
    ///
    /// Absent or blank means no retries yet. Anything else must parse as a
    /// non-negative integer.
    pub fn completed_retries(&self) -> Result<u32, HeaderError> {
        let Some(raw) = self.single(RETRY_ATTEMPTS)? else {
            return Ok(0);
        };
        let value = unquote(&raw).trim();
        if value.is_empty() {
            return Ok(0);
        }
        value.parse::<u32>().map_err(|_| HeaderError::InvalidNumber {
            key: RETRY_ATTEMPTS,
            value: raw.clone(),
        })
    }

    /// Produce time recorded when the message first entered the retry path.
    pub fn timestamp_ms(&self) -> Result<i64, HeaderError> {
        let raw = self.required(PRODUCED_TIMESTAMP_MS)?;
        raw.trim()
            .parse::<i64>()
            .map_err(|_| HeaderError::InvalidNumber {
                key: PRODUCED_TIMESTAMP_MS,
                value: raw,
            })
    }

    /// Flatten into an outbound header map. Repeated keys keep the last value.
    pub fn to_outbound(&self) -> BTreeMap<String, String> {
        self.entries
            .iter()
            .map(|(k, v)| (k.clone(), String::from_utf8_lossy(v).into_owned()))
            .collect()
    }

    fn single(&self, key: &'static str) -> Result<Option<String>, HeaderError> {
        let mut values = self.get_all(key);
        let first = values.next();
        if values.next().is_some() {
            return Err(HeaderError::Duplicate(key));
        }
        Ok(first.map(|v| String::from_utf8_lossy(v).into_owned()))
    }

    fn required(&self, key: &'static str) -> Result<String, HeaderError> {
        let value = self.single(key)?.ok_or(HeaderError::Missing(key))?;
        Ok(unquote(&value).to_string())
    }
}

impl<K, V> FromIterator<(K, V)> for Headers
where
    K: Into<String>,
    V: Into<Vec<u8>>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut headers = Headers::new();
        for (k, v) in iter {
            headers.push(k, v);
        }
        headers
    }
}

/// Strip any surrounding `"` characters (producers sometimes JSON-encode strings).
fn unquote(value: &str) -> &str {
    value.trim_matches('"')
}
