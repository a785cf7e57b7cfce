//! Scheduled sweep: re-dispatch queued retries whose delay has elapsed.

use std::sync::Arc;

use crate::producer::{MessageProducer, OutboundMessage};
use crate::queue::RetryQueue;
use crate::record::RetryRecord;
use crate::retry::RetryPolicy;

/// Counts for one sweep.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepReport {
    /// Sent to the origin topic and removed from the queue.
    pub dispatched: usize,
    /// Eligible but not completed (send or removal failed); still queued.
    pub failed: usize,
    /// Not yet eligible.
    pub pending: usize,
}

pub struct ScheduledDispatcher {
    policy: Arc<RetryPolicy>,
    queue: Arc<RetryQueue>,
    producer: Arc<dyn MessageProducer>,
}

impl ScheduledDispatcher {
    pub fn new(
        policy: Arc<RetryPolicy>,
        queue: Arc<RetryQueue>,
        producer: Arc<dyn MessageProducer>,
    ) -> Self {
        Self {
            policy,
            queue,
            producer,
        }
    }

    /// Walk every configured attempt bucket and re-dispatch each record with
    /// `now_ms >= timestamp + delay[attempt]`.
    ///
    /// A failure for one record is logged and leaves that record queued with
    /// its attempt unchanged; the rest of the sweep continues.
    pub async fn dispatch_retries(&self, now_ms: i64) -> SweepReport {
        let mut report = SweepReport::default();
        for (attempt, _) in self.policy.delays() {
            let candidates = match self.queue.query_by_attempt(attempt).await {
                Ok(candidates) => candidates,
                Err(e) => {
                    tracing::error!(attempt, "could not read retry queue: {}", e);
                    continue;
                }
            };
            if candidates.is_empty() {
                tracing::debug!(attempt, "no messages queued for retry attempt {}", attempt);
                continue;
            }

            for (id, record) in candidates {
                if now_ms < self.minimum_dispatch_time(attempt, &record) {
                    report.pending += 1;
                    continue;
                }

                tracing::info!(
                    message_id = %id,
                    attempt,
                    topic = %record.origin_topic,
                    "sending message to origin topic"
                );
                let message = OutboundMessage::retry(&record.origin_topic, attempt, record.payload);
                if let Err(e) = self.producer.send(message).await {
                    tracing::error!(
                        message_id = %id,
                        attempt,
                        "failed to dispatch message for retry attempt {}, will try again on next scheduled dispatch: {}",
                        attempt,
                        e
                    );
                    report.failed += 1;
                    continue;
                }

                match self.queue.remove(&id).await {
                    Ok(()) => report.dispatched += 1,
                    Err(e) => {
                        // Sent but still queued: the next sweep delivers it again.
                        tracing::error!(message_id = %id, attempt, "could not remove dispatched message: {}", e);
                        report.failed += 1;
                    }
                }
            }
        }

        if report != SweepReport::default() {
            tracing::info!(
                dispatched = report.dispatched,
                failed = report.failed,
                pending = report.pending,
                "retry sweep finished"
            );
        }
        report
    }

    /// Earliest time `record` may be dispatched for `attempt`. An attempt
    /// missing from the delay table has no delay.
    pub fn minimum_dispatch_time(&self, attempt: u32, record: &RetryRecord) -> i64 {
        match self.policy.due_at(attempt, record.timestamp_ms) {
            Some(due) => due,
            None => {
                tracing::warn!(attempt, "retry attempt {} not enabled in delay table", attempt);
                record.timestamp_ms
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headers::RETRY_ATTEMPTS;
    use crate::producer::RecordingProducer;
    use crate::record::MessageId;
    use crate::store::MemoryStore;
    use serde_json::json;

    struct Fixture {
        store: Arc<MemoryStore>,
        queue: Arc<RetryQueue>,
        producer: Arc<RecordingProducer>,
        sweeper: ScheduledDispatcher,
    }

    fn fixture() -> Fixture {
        let policy = Arc::new(
            RetryPolicy::new("P", "F", "H", "pf", [(1, 1000), (2, 3000), (3, 9000)]).unwrap(),
        );
        let store = Arc::new(MemoryStore::new());
        let queue = Arc::new(RetryQueue::new());
        queue.attach(store.clone());
        let producer = Arc::new(RecordingProducer::new());
        let sweeper = ScheduledDispatcher::new(policy, queue.clone(), producer.clone());
        Fixture {
            store,
            queue,
            producer,
            sweeper,
        }
    }

    fn record(attempt: u32, timestamp_ms: i64, topic: &str) -> RetryRecord {
        RetryRecord {
            timestamp_ms,
            origin_topic: topic.to_string(),
            attempt,
            payload: json!({"topic": topic, "attempt": attempt}),
        }
    }

    #[tokio::test]
    async fn eligible_record_is_sent_and_removed() {
        let f = fixture();
        let id = MessageId::from("m-1");
        f.queue.put(&id, &record(2, 1000, "T")).await.unwrap();

        let report = f.sweeper.dispatch_retries(4000).await;
        assert_eq!(
            report,
            SweepReport {
                dispatched: 1,
                failed: 0,
                pending: 0
            }
        );
        let sent = f.producer.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].topic, "T");
        assert_eq!(sent[0].headers.get(RETRY_ATTEMPTS).unwrap(), "2");
        assert_eq!(sent[0].payload, json!({"topic": "T", "attempt": 2}));
        assert!(f.store.is_empty());
    }

    #[tokio::test]
    async fn threshold_boundary_is_inclusive() {
        let f = fixture();
        let id = MessageId::from("m-1");
        f.queue.put(&id, &record(1, 5000, "T")).await.unwrap();

        let report = f.sweeper.dispatch_retries(5999).await;
        assert_eq!(report.pending, 1);
        assert!(f.producer.sent().is_empty());
        assert_eq!(f.store.len(), 1);

        let report = f.sweeper.dispatch_retries(6000).await;
        assert_eq!(report.dispatched, 1);
        assert!(f.store.is_empty());
    }

    #[tokio::test]
    async fn each_bucket_uses_its_own_delay() {
        let f = fixture();
        f.queue.put(&MessageId::from("a1"), &record(1, 0, "A")).await.unwrap();
        f.queue.put(&MessageId::from("a2"), &record(2, 0, "B")).await.unwrap();
        f.queue.put(&MessageId::from("a3"), &record(3, 0, "C")).await.unwrap();

        let report = f.sweeper.dispatch_retries(3000).await;
        assert_eq!(report.dispatched, 2);
        assert_eq!(report.pending, 1);
        let mut topics: Vec<String> = f.producer.sent().into_iter().map(|m| m.topic).collect();
        topics.sort();
        assert_eq!(topics, vec!["A", "B"]);
        assert_eq!(f.store.get(&MessageId::from("a3")).unwrap().attempt, 3);
    }

    #[tokio::test]
    async fn one_failed_send_does_not_block_the_rest() {
        let f = fixture();
        let a = MessageId::from("a");
        let b = MessageId::from("b");
        f.queue.put(&a, &record(1, 0, "T")).await.unwrap();
        f.queue.put(&b, &record(1, 0, "T")).await.unwrap();
        f.producer.fail_next(1);

        let report = f.sweeper.dispatch_retries(10_000).await;
        assert_eq!(report.dispatched, 1);
        assert_eq!(report.failed, 1);
        assert_eq!(f.producer.sent().len(), 1);
        assert_eq!(f.store.len(), 1);

        let (left_id, left) = f.queue.queued().await.unwrap().remove(0);
        assert!(left_id == a || left_id == b);
        assert_eq!(left.attempt, 1);

        // retried unchanged on the next sweep
        let report = f.sweeper.dispatch_retries(10_001).await;
        assert_eq!(report.dispatched, 1);
        assert!(f.store.is_empty());
        let sent = f.producer.sent();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[1].headers.get(RETRY_ATTEMPTS).unwrap(), "1");
    }

    #[tokio::test]
    async fn failing_topic_does_not_block_other_buckets() {
        let f = fixture();
        f.queue.put(&MessageId::from("down"), &record(1, 0, "down")).await.unwrap();
        f.queue.put(&MessageId::from("up"), &record(2, 0, "up")).await.unwrap();
        f.producer.fail_topic("down");

        let report = f.sweeper.dispatch_retries(60_000).await;
        assert_eq!(report.dispatched, 1);
        assert_eq!(report.failed, 1);
        assert_eq!(f.producer.sent_to("up").len(), 1);
        assert_eq!(f.store.get(&MessageId::from("down")).unwrap().attempt, 1);

        f.producer.recover_topic("down");
        let report = f.sweeper.dispatch_retries(60_000).await;
        assert_eq!(report.dispatched, 1);
        assert!(f.store.is_empty());
    }

    #[tokio::test]
    async fn records_outside_delay_table_are_not_swept() {
        let f = fixture();
        f.queue.put(&MessageId::from("x"), &record(7, 0, "T")).await.unwrap();
        let report = f.sweeper.dispatch_retries(i64::MAX).await;
        assert_eq!(report, SweepReport::default());
        assert_eq!(f.store.len(), 1);
    }

    #[test]
    fn minimum_dispatch_time_without_delay_entry_is_timestamp() {
        let f = fixture();
        assert_eq!(f.sweeper.minimum_dispatch_time(2, &record(2, 1000, "T")), 4000);
        assert_eq!(f.sweeper.minimum_dispatch_time(9, &record(9, 1000, "T")), 1000);
        assert_eq!(
            f.sweeper.minimum_dispatch_time(1, &record(1, i64::MAX - 1, "T")),
            i64::MAX
        );
    }

    #[tokio::test]
    async fn sweep_without_store_is_a_noop() {
        let policy = Arc::new(RetryPolicy::new("P", "F", "H", "pf", [(1, 0)]).unwrap());
        let producer = Arc::new(RecordingProducer::new());
        let sweeper = ScheduledDispatcher::new(policy, Arc::new(RetryQueue::new()), producer.clone());
        assert_eq!(sweeper.dispatch_retries(1).await, SweepReport::default());
        assert!(producer.sent().is_empty());
    }
}
