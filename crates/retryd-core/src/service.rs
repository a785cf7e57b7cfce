//! Composition root: wires policy, queue, classifier and dispatchers, and
//! drives the recurring sweep.
//!
//! Ingress (`process`) and the sweep share one retry queue. Both take the
//! partition lock, so a sweep always observes every completed `put`.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::MissedTickBehavior;

use crate::clock::Clock;
use crate::dispatch::{DispatchError, RetryActionDispatcher, ScheduledDispatcher, SweepReport};
use crate::headers::Headers;
use crate::processor::{ProcessOutcome, RetryProcessor};
use crate::producer::MessageProducer;
use crate::queue::RetryQueue;
use crate::record::MessageId;
use crate::retry::{HeaderClassifier, RetryPolicy};
use crate::store::KeyValueStore;

pub struct RetryService {
    policy: Arc<RetryPolicy>,
    queue: Arc<RetryQueue>,
    processor: RetryProcessor,
    dispatcher: ScheduledDispatcher,
    clock: Arc<dyn Clock>,
    partition: Mutex<()>,
}

impl RetryService {
    /// Build every component in dependency order. The queue starts detached;
    /// call [`RetryService::attach_store`] before processing.
    pub fn new(
        policy: RetryPolicy,
        producer: Arc<dyn MessageProducer>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let policy = Arc::new(policy);
        let queue = Arc::new(RetryQueue::new());
        let classifier = HeaderClassifier::new(Arc::clone(&policy));
        let actions = RetryActionDispatcher::new(&policy, Arc::clone(&queue), Arc::clone(&producer));
        let dispatcher = ScheduledDispatcher::new(Arc::clone(&policy), Arc::clone(&queue), producer);
        Self {
            policy,
            queue,
            processor: RetryProcessor::new(classifier, actions),
            dispatcher,
            clock,
            partition: Mutex::new(()),
        }
    }

    pub fn attach_store(&self, store: Arc<dyn KeyValueStore>) {
        self.queue.attach(store);
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn queue(&self) -> &RetryQueue {
        &self.queue
    }

    /// Classify and route one inbound message.
    pub async fn process(
        &self,
        id: &MessageId,
        headers: &Headers,
        payload: serde_json::Value,
    ) -> Result<ProcessOutcome, DispatchError> {
        let _partition = self.partition.lock().await;
        self.processor.process(id, headers, payload).await
    }

    /// One sweep at an explicit time.
    pub async fn sweep(&self, now_ms: i64) -> SweepReport {
        let _partition = self.partition.lock().await;
        self.dispatcher.dispatch_retries(now_ms).await
    }

    /// One sweep at the clock's current time.
    pub async fn sweep_now(&self) -> SweepReport {
        let now_ms = self.clock.now_ms();
        self.sweep(now_ms).await
    }

    /// Sweep every `interval` until `shutdown` resolves; returns the number
    /// of sweeps run. The first sweep runs immediately. A sweep in progress
    /// is finished before shutdown is observed.
    pub async fn run_scheduler<F>(&self, interval: Duration, shutdown: F) -> u64
    where
        F: Future<Output = ()>,
    {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        tracing::info!(interval_ms = interval.as_millis() as u64, "retry scheduler started");
        let mut sweeps = 0u64;
        loop {
            tokio::select! {
                biased;
                _ = &mut shutdown => break,
                _ = ticker.tick() => {
                    let report = self.sweep_now().await;
                    sweeps += 1;
                    tracing::debug!(
                        sweep = sweeps,
                        dispatched = report.dispatched,
                        failed = report.failed,
                        pending = report.pending,
                        "scheduled sweep complete"
                    );
                }
            }
        }
        tracing::info!(sweeps, "retry scheduler stopped");
        sweeps
    }
}
