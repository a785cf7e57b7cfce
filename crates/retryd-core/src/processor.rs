//! Ingress path: classify one retry-channel message and carry out its
//! disposition.

use crate::dispatch::{DispatchError, RetryActionDispatcher};
use crate::headers::{HeaderError, Headers};
use crate::record::MessageId;
use crate::retry::{ClassifyError, Disposition, HeaderClassifier};

/// What happened to one inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessOutcome {
    /// Written to the retry queue for `attempt`.
    Queued { attempt: u32 },
    /// Forwarded to the permanent failure topic.
    PermanentlyFailed,
    /// Dropped by policy.
    Dropped,
    /// Headers were malformed; nothing was queued or sent.
    Rejected(HeaderError),
    /// No rule matched; nothing was queued or sent.
    Unclassified,
}

pub struct RetryProcessor {
    classifier: HeaderClassifier,
    actions: RetryActionDispatcher,
}

impl RetryProcessor {
    pub fn new(classifier: HeaderClassifier, actions: RetryActionDispatcher) -> Self {
        Self {
            classifier,
            actions,
        }
    }

    /// Handle one message.
    ///
    /// Malformed and unclassifiable messages are logged and reported in the
    /// outcome; they never fail the ingress path. Send and store failures are
    /// returned so the caller can decide whether to redeliver.
    pub async fn process(
        &self,
        id: &MessageId,
        headers: &Headers,
        payload: serde_json::Value,
    ) -> Result<ProcessOutcome, DispatchError> {
        tracing::info!(message_id = %id, "processing message");

        let disposition = match self.classifier.classify(headers) {
            Ok(disposition) => disposition,
            Err(ClassifyError::Malformed(e)) => {
                tracing::error!(message_id = %id, "failed to handle message: {}", e);
                return Ok(ProcessOutcome::Rejected(e));
            }
            Err(ClassifyError::Unclassifiable { exception }) => {
                tracing::error!(
                    message_id = %id,
                    exception = %exception,
                    "unclassifiable message discarded: not retriable, permanently failed or droppable"
                );
                return Ok(ProcessOutcome::Unclassified);
            }
        };

        match disposition {
            Disposition::Drop => {
                self.actions.drop_message(id);
                Ok(ProcessOutcome::Dropped)
            }
            Disposition::Retry => match self.actions.queue_for_retry(id, headers, payload).await {
                Ok(record) => Ok(ProcessOutcome::Queued {
                    attempt: record.attempt,
                }),
                Err(DispatchError::Malformed(e)) => {
                    tracing::error!(message_id = %id, "failed to queue message: {}", e);
                    Ok(ProcessOutcome::Rejected(e))
                }
                Err(e) => Err(e),
            },
            Disposition::PermanentFailure => {
                self.actions
                    .dispatch_permanent_failure(id, headers, payload)
                    .await?;
                Ok(ProcessOutcome::PermanentlyFailed)
            }
        }
    }
}
