//! Persistent keyed store for queued retries.
//!
//! [`KeyValueStore`] is the capability the surrounding runtime supplies:
//! upsert, delete, full scan and flush over `message id -> RetryRecord`.
//! `SqliteStore` persists to SQLite via sqlx; `MemoryStore` keeps everything
//! in process for tests and ephemeral runs.

mod memory;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use async_trait::async_trait;
use thiserror::Error;

use crate::record::{MessageId, RetryRecord};

/// Failure reported by a store backend.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlite: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("record encoding: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid store name {0:?}: use ASCII letters, digits, '-' or '_'")]
    InvalidStoreName(String),
}

#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Insert or overwrite the record stored under `id`.
    async fn put(&self, id: &MessageId, record: &RetryRecord) -> Result<(), StoreError>;

    /// Delete `id`; deleting an absent key is not an error.
    async fn delete(&self, id: &MessageId) -> Result<(), StoreError>;

    /// Every stored entry, in no particular order.
    async fn all(&self) -> Result<Vec<(MessageId, RetryRecord)>, StoreError>;

    /// Make preceding writes durable.
    async fn flush(&self) -> Result<(), StoreError>;
}
