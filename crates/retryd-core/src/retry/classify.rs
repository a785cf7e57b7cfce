//! Classify a retry-channel message into a disposition from its headers.

use std::sync::Arc;

use crate::headers::Headers;
use crate::retry::error::ClassifyError;
use crate::retry::policy::RetryPolicy;

/// What to do with one message on the retry channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Queue for a delayed re-dispatch to the origin topic.
    Retry,
    /// Forward to the permanent failure topic.
    PermanentFailure,
    /// Discard without further processing.
    Drop,
}

/// Pure header -> disposition mapping under a fixed [`RetryPolicy`].
#[derive(Debug, Clone)]
pub struct HeaderClassifier {
    policy: Arc<RetryPolicy>,
}

impl HeaderClassifier {
    pub fn new(policy: Arc<RetryPolicy>) -> Self {
        Self { policy }
    }

    /// Evaluates, in order: Drop, Retry, PermanentFailure. The first rule
    /// that matches wins; if none does the message is unclassifiable.
    ///
    /// Headers are read lazily in rule order, so a message dropped by rule 1
    /// is not rejected for a bad attempt count. A Retry result also requires
    /// a valid produce timestamp, since the queued record cannot be built
    /// without one.
    pub fn classify(&self, headers: &Headers) -> Result<Disposition, ClassifyError> {
        let exception = headers.exception_name()?;
        let origin_topic = headers.origin_topic()?;

        if self.is_droppable(&exception, &origin_topic) {
            return Ok(Disposition::Drop);
        }

        let completed = headers.completed_retries()?;
        let exhausted = self.policy.is_exhausted(completed);
        if exhausted {
            tracing::info!(
                completed_retries = completed,
                max_retries = self.policy.max_retries(),
                "retry attempts exhausted"
            );
        }

        if !exhausted && exception == self.policy.retriable_exception {
            tracing::info!("exception type {} is retriable", exception);
            headers.timestamp_ms()?;
            return Ok(Disposition::Retry);
        }

        let fatal = exception == self.policy.fatal_exception;
        if fatal {
            tracing::info!("exception type {} is not retriable", exception);
        }
        if exhausted || fatal {
            return Ok(Disposition::PermanentFailure);
        }

        Err(ClassifyError::Unclassifiable { exception })
    }

    fn is_droppable(&self, exception: &str, origin_topic: &str) -> bool {
        let from_failure_topic = origin_topic == self.policy.permanent_failure_topic;
        if from_failure_topic {
            tracing::info!("message is from permanent failure topic");
        }
        let droppable = exception == self.policy.droppable_exception;
        if droppable {
            tracing::info!("exception type {} is droppable", exception);
        }
        from_failure_topic || droppable
    }
}
