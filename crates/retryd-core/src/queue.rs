//! Delay-bucketed retry queue over an attachable [`KeyValueStore`].
//!
//! The store is supplied by the runtime after construction. Until it is
//! attached, every operation logs an error and does nothing.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use crate::record::{MessageId, RetryRecord};
use crate::store::{KeyValueStore, StoreError};

#[derive(Default)]
pub struct RetryQueue {
    store: RwLock<Option<Arc<dyn KeyValueStore>>>,
}

impl RetryQueue {
    /// A queue with no store attached yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach (or replace) the backing store.
    pub fn attach(&self, store: Arc<dyn KeyValueStore>) {
        *self.store.write().unwrap_or_else(PoisonError::into_inner) = Some(store);
    }

    pub fn is_attached(&self) -> bool {
        self.store
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    fn store(&self) -> Option<Arc<dyn KeyValueStore>> {
        let store = self
            .store
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if store.is_none() {
            tracing::error!("cannot perform operation as the retry store is not attached");
        }
        store
    }

    /// Queue `record` under `id`, replacing any previous record, and flush.
    pub async fn put(&self, id: &MessageId, record: &RetryRecord) -> Result<(), StoreError> {
        let Some(store) = self.store() else {
            return Ok(());
        };
        store.put(id, record).await?;
        store.flush().await
    }

    /// Remove a queued message; absent ids are ignored.
    pub async fn remove(&self, id: &MessageId) -> Result<(), StoreError> {
        let Some(store) = self.store() else {
            return Ok(());
        };
        store.delete(id).await?;
        store.flush().await
    }

    /// All records waiting for `attempt`.
    pub async fn query_by_attempt(
        &self,
        attempt: u32,
    ) -> Result<HashMap<MessageId, RetryRecord>, StoreError> {
        let Some(store) = self.store() else {
            return Ok(HashMap::new());
        };
        Ok(store
            .all()
            .await?
            .into_iter()
            .filter(|(_, record)| record.attempt == attempt)
            .collect())
    }

    /// Every queued record, ordered by attempt then message id.
    pub async fn queued(&self) -> Result<Vec<(MessageId, RetryRecord)>, StoreError> {
        let Some(store) = self.store() else {
            return Ok(Vec::new());
        };
        let mut all = store.all().await?;
        all.sort_by(|(a_id, a), (b_id, b)| a.attempt.cmp(&b.attempt).then_with(|| a_id.cmp(b_id)));
        Ok(all)
    }
}
