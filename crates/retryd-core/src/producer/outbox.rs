//! File outbox: appends each outbound message as one JSON line to
//! `<dir>/<topic>.jsonl`.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

use super::{MessageProducer, OutboundMessage, SendError};

#[derive(Debug, Clone)]
pub struct FileOutbox {
    dir: PathBuf,
}

impl FileOutbox {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Default outbox directory: `~/.local/state/retryd/outbox`.
    pub fn default_dir() -> anyhow::Result<PathBuf> {
        let xdg_dirs = xdg::BaseDirectories::with_prefix("retryd")?;
        Ok(xdg_dirs.get_state_home().join("outbox"))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File that receives messages for `topic`.
    pub fn topic_path(&self, topic: &str) -> Result<PathBuf, SendError> {
        let valid = !topic.is_empty()
            && topic != "."
            && topic != ".."
            && !topic.contains(['/', '\\', '\0']);
        if !valid {
            return Err(SendError::Rejected {
                topic: topic.to_string(),
                reason: "topic is not usable as an outbox file name".to_string(),
            });
        }
        Ok(self.dir.join(format!("{topic}.jsonl")))
    }
}

#[async_trait]
impl MessageProducer for FileOutbox {
    async fn send(&self, message: OutboundMessage) -> Result<(), SendError> {
        let path = self.topic_path(&message.topic)?;
        let mut line = serde_json::to_vec(&message).map_err(|source| SendError::Serialize {
            topic: message.topic.clone(),
            source,
        })?;
        line.push(b'\n');

        let io_err = |source| SendError::Io {
            topic: message.topic.clone(),
            source,
        };
        tokio::fs::create_dir_all(&self.dir).await.map_err(io_err)?;
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(io_err)?;
        file.write_all(&line).await.map_err(io_err)?;
        file.flush().await.map_err(io_err)?;
        tracing::debug!(topic = %message.topic, path = %path.display(), "appended message to outbox");
        Ok(())
    }
}
