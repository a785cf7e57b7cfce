//! Producer that keeps sent messages in memory; failures can be scripted.

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::{Mutex, PoisonError};

use super::{MessageProducer, OutboundMessage, SendError};

#[derive(Debug, Default)]
pub struct RecordingProducer {
    sent: Mutex<Vec<OutboundMessage>>,
    failing_topics: Mutex<HashSet<String>>,
    fail_next: Mutex<usize>,
}

impl RecordingProducer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject every send to `topic` until [`RecordingProducer::recover_topic`].
    pub fn fail_topic(&self, topic: impl Into<String>) {
        self.failing_topics
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(topic.into());
    }

    pub fn recover_topic(&self, topic: &str) {
        self.failing_topics
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(topic);
    }

    /// Reject the next `n` sends, whatever their topic.
    pub fn fail_next(&self, n: usize) {
        *self.fail_next.lock().unwrap_or_else(PoisonError::into_inner) = n;
    }

    /// Messages accepted so far, in send order.
    pub fn sent(&self) -> Vec<OutboundMessage> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn sent_to(&self, topic: &str) -> Vec<OutboundMessage> {
        self.sent()
            .into_iter()
            .filter(|m| m.topic == topic)
            .collect()
    }
}

#[async_trait]
impl MessageProducer for RecordingProducer {
    async fn send(&self, message: OutboundMessage) -> Result<(), SendError> {
        {
            let mut remaining = self.fail_next.lock().unwrap_or_else(PoisonError::into_inner);
            if *remaining > 0 {
                *remaining -= 1;
                return Err(SendError::Rejected {
                    topic: message.topic,
                    reason: "scripted failure".to_string(),
                });
            }
        }
        let failing = self
            .failing_topics
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&message.topic);
        if failing {
            return Err(SendError::Rejected {
                topic: message.topic,
                reason: "topic unavailable".to_string(),
            });
        }
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(message);
        Ok(())
    }
}
