//! Carry out a disposition for one inbound message.

use std::sync::Arc;

use super::DispatchError;
use crate::headers::Headers;
use crate::producer::{MessageProducer, OutboundMessage};
use crate::queue::RetryQueue;
use crate::record::{MessageId, RetryRecord};
use crate::retry::RetryPolicy;

pub struct RetryActionDispatcher {
    queue: Arc<RetryQueue>,
    producer: Arc<dyn MessageProducer>,
    permanent_failure_topic: String,
}

impl RetryActionDispatcher {
    pub fn new(
        policy: &RetryPolicy,
        queue: Arc<RetryQueue>,
        producer: Arc<dyn MessageProducer>,
    ) -> Self {
        Self {
            queue,
            producer,
            permanent_failure_topic: policy.permanent_failure_topic.clone(),
        }
    }

    /// Queue the message for its next attempt (completed retries + 1).
    ///
    /// Headers are fully extracted before anything is written, so a malformed
    /// header set leaves the queue untouched.
    pub async fn queue_for_retry(
        &self,
        id: &MessageId,
        headers: &Headers,
        payload: serde_json::Value,
    ) -> Result<RetryRecord, DispatchError> {
        let completed = headers.completed_retries()?;
        let timestamp_ms = headers.timestamp_ms()?;
        let origin_topic = headers.origin_topic()?;
        let record = RetryRecord {
            timestamp_ms,
            origin_topic,
            attempt: completed.saturating_add(1),
            payload,
        };
        tracing::info!(
            message_id = %id,
            attempt = record.attempt,
            "queueing message for retry attempt {}",
            record.attempt
        );
        self.queue.put(id, &record).await?;
        Ok(record)
    }

    /// Forward the message, with its inbound headers, to the permanent
    /// failure topic. A send failure is returned to the caller as is.
    pub async fn dispatch_permanent_failure(
        &self,
        id: &MessageId,
        headers: &Headers,
        payload: serde_json::Value,
    ) -> Result<(), DispatchError> {
        tracing::warn!(
            message_id = %id,
            topic = %self.permanent_failure_topic,
            "sending message to permanent failure topic"
        );
        let message =
            OutboundMessage::json(&self.permanent_failure_topic, headers.to_outbound(), payload);
        self.producer.send(message).await?;
        Ok(())
    }

    /// Drop the message: it is neither retried nor sent to the permanent
    /// failure topic.
    pub fn drop_message(&self, id: &MessageId) {
        tracing::warn!(
            message_id = %id,
            "dropping message; it will not be retried or sent to the permanent failure topic"
        );
    }
}
