//! SQLite-backed retry store.
//!
//! One table per configured store name, holding the JSON-encoded record per
//! message id. Handles connection and migrations; record CRUD implements
//! [`KeyValueStore`].

use anyhow::Result;
use async_trait::async_trait;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Pool, Row, Sqlite};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use super::{KeyValueStore, StoreError};
use crate::record::{MessageId, RetryRecord};

/// Percent-encode a path for use in a sqlite:// URI so spaces and special chars don't break parsing.
fn path_to_sqlite_uri(path: &Path) -> String {
    let s = path.to_string_lossy();
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '%' => out.push_str("%25"),
            ' ' => out.push_str("%20"),
            '#' => out.push_str("%23"),
            '?' => out.push_str("%3F"),
            '&' => out.push_str("%26"),
            c => out.push(c),
        }
    }
    format!("sqlite://{}", out)
}

/// Store names become table names, so only a conservative character set is accepted.
fn validate_store_name(name: &str) -> Result<(), StoreError> {
    let ok = !name.is_empty()
        && name.len() <= 64
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if ok {
        Ok(())
    } else {
        Err(StoreError::InvalidStoreName(name.to_string()))
    }
}

/// Handle to the SQLite retry store.
///
/// The database file lives under the XDG state directory:
/// `~/.local/state/retryd/retry.db` on Debian.
#[derive(Clone)]
pub struct SqliteStore {
    pool: Pool<Sqlite>,
    table: String,
}

impl SqliteStore {
    /// Default database path under the XDG state directory.
    pub fn default_path() -> Result<PathBuf> {
        let xdg_dirs = xdg::BaseDirectories::with_prefix("retryd")?;
        Ok(xdg_dirs.get_state_home().join("retry.db"))
    }

    /// Open (or create) the default database and run migrations.
    pub async fn open_default(store_name: &str) -> Result<Self> {
        Self::open_at(Self::default_path()?, store_name).await
    }

    /// Open (or create) the database at a specific path. Creates parent dirs if needed.
    pub async fn open_at(path: impl AsRef<Path>, store_name: &str) -> Result<Self> {
        validate_store_name(store_name)?;
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let uri = path_to_sqlite_uri(path) + "?mode=rwc";
        let pool = SqlitePoolOptions::new()
            .max_connections(8)
            .connect(&uri)
            .await?;
        let store = SqliteStore {
            pool,
            table: store_name.to_string(),
        };
        store.migrate().await?;
        tracing::debug!(path = %path.display(), store = store_name, "opened retry store");
        Ok(store)
    }

    pub fn store_name(&self) -> &str {
        &self.table
    }

    async fn migrate(&self) -> Result<(), StoreError> {
        // `record_json` holds the persisted record layout
        // ({timeStamp, originTopic, retryAttempt, payload}).
        let sql = format!(
            r#"
            CREATE TABLE IF NOT EXISTS "{}" (
                message_id TEXT PRIMARY KEY NOT NULL,
                record_json TEXT NOT NULL,
                updated_at INTEGER NOT NULL
            );
            "#,
            self.table
        );
        sqlx::query(&sql).execute(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for SqliteStore {
    async fn put(&self, id: &MessageId, record: &RetryRecord) -> Result<(), StoreError> {
        let record_json = serde_json::to_string(record)?;
        let sql = format!(
            r#"
            INSERT INTO "{}" (message_id, record_json, updated_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(message_id) DO UPDATE
            SET record_json = excluded.record_json,
                updated_at = excluded.updated_at
            "#,
            self.table
        );
        sqlx::query(&sql)
            .bind(id.as_str())
            .bind(record_json)
            .bind(unix_timestamp())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn delete(&self, id: &MessageId) -> Result<(), StoreError> {
        let sql = format!(r#"DELETE FROM "{}" WHERE message_id = ?1"#, self.table);
        sqlx::query(&sql)
            .bind(id.as_str())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn all(&self) -> Result<Vec<(MessageId, RetryRecord)>, StoreError> {
        let sql = format!(r#"SELECT message_id, record_json FROM "{}""#, self.table);
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            let id: String = row.get("message_id");
            let record_json: String = row.get("record_json");
            match serde_json::from_str::<RetryRecord>(&record_json) {
                Ok(record) => out.push((MessageId::new(id), record)),
                // An undecodable row must not hide the rest of the table.
                Err(e) => tracing::error!(
                    message_id = %id,
                    table = %self.table,
                    "skipping stored retry record that cannot be decoded: {}",
                    e
                ),
            }
        }
        Ok(out)
    }

    async fn flush(&self) -> Result<(), StoreError> {
        // Autocommit statements are already durable; fold the WAL back into
        // the main file when journaling in WAL mode (no-op otherwise).
        sqlx::query("PRAGMA wal_checkpoint(PASSIVE)")
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

/// Current time as Unix seconds (for the `updated_at` column).
fn unix_timestamp() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}

#[cfg(test)]
/// Open an in-memory database for tests (no disk I/O).
pub(crate) async fn open_memory(store_name: &str) -> Result<SqliteStore> {
    validate_store_name(store_name)?;
    let pool = sqlx::sqlite::SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await?;
    let store = SqliteStore {
        pool,
        table: store_name.to_string(),
    };
    store.migrate().await?;
    Ok(store)
}
