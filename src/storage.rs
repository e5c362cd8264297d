//! Durable append-only log: one JSON line per committed message, with an
//! in-memory id index rebuilt at startup so `append` can reject a
//! duplicate without re-reading the file.

use std::collections::HashSet;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::fs::OpenOptions;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::sync::Mutex;

use crate::error::NodeError;
use crate::types::{MessageId, NodeId};

#[derive(Debug, Serialize, Deserialize)]
struct StoredEntry {
    id: MessageId,
    sender: NodeId,
    content: String,
    timestamp: DateTime<Utc>,
}

/// A decoded log entry, as returned by `history()`.
#[derive(Debug, Clone)]
pub struct LogEntry {
    pub id: MessageId,
    pub sender: NodeId,
    pub content: String,
    pub appended_at: DateTime<Utc>,
}

struct Inner {
    file: tokio::fs::File,
    index: HashSet<MessageId>,
}

/// File-backed append-only commit log, named `<nodeId>_chat.jsonl`.
pub struct FileLog {
    path: PathBuf,
    inner: Mutex<Inner>,
}

impl FileLog {
    /// Open (creating if absent) the log at `path` and rebuild the id
    /// index by replaying every line already on disk.
    pub async fn init(path: PathBuf) -> Result<Self, NodeError> {
        let mut index = HashSet::new();
        if path.exists() {
            let mut existing = tokio::fs::File::open(&path).await.map_err(NodeError::Storage)?;
            let mut contents = String::new();
            existing.read_to_string(&mut contents).await.map_err(NodeError::Storage)?;
            for line in contents.lines() {
                if line.trim().is_empty() {
                    continue;
                }
                if let Ok(entry) = serde_json::from_str::<StoredEntry>(line) {
                    index.insert(entry.id);
                }
            }
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(NodeError::Storage)?;

        Ok(Self { path, inner: Mutex::new(Inner { file, index }) })
    }

    /// Append `content` under `id`/`sender` if `id` has not already been
    /// applied. Returns `false` (without touching the file) on a duplicate.
    pub async fn append(&self, id: MessageId, sender: NodeId, content: String) -> Result<bool, NodeError> {
        let mut inner = self.inner.lock().await;
        if inner.index.contains(&id) {
            return Ok(false);
        }
        let entry = StoredEntry { id, sender, content, timestamp: Utc::now() };
        let mut line = serde_json::to_string(&entry).map_err(NodeError::Codec)?;
        line.push('\n');
        inner.file.write_all(line.as_bytes()).await.map_err(NodeError::Storage)?;
        inner.file.flush().await.map_err(NodeError::Storage)?;
        inner.index.insert(id);
        Ok(true)
    }

    /// Replay the log file in append order.
    pub async fn history(&self) -> Result<Vec<LogEntry>, NodeError> {
        // Hold the lock so a concurrent append can't interleave a partial
        // write with this read.
        let _inner = self.inner.lock().await;
        let contents = tokio::fs::read_to_string(&self.path).await.map_err(NodeError::Storage)?;
        let mut entries = Vec::new();
        for line in contents.lines() {
            if line.trim().is_empty() {
                continue;
            }
            if let Ok(e) = serde_json::from_str::<StoredEntry>(line) {
                entries.push(LogEntry { id: e.id, sender: e.sender, content: e.content, appended_at: e.timestamp });
            }
        }
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn append_then_history_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let log = FileLog::init(dir.path().join("n1_chat.jsonl")).await.unwrap();

        let id = MessageId::new();
        let applied = log.append(id, NodeId::new("n1"), "hello".to_string()).await.unwrap();
        assert!(applied);

        let history = log.history().await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].content, "hello");
        assert_eq!(history[0].sender, NodeId::new("n1"));
    }

    #[tokio::test]
    async fn duplicate_id_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let log = FileLog::init(dir.path().join("n1_chat.jsonl")).await.unwrap();

        let id = MessageId::new();
        assert!(log.append(id, NodeId::new("n1"), "first".to_string()).await.unwrap());
        assert!(!log.append(id, NodeId::new("n1"), "first again".to_string()).await.unwrap());

        let history = log.history().await.unwrap();
        assert_eq!(history.len(), 1);
    }

    #[tokio::test]
    async fn reopening_rebuilds_the_index_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("n1_chat.jsonl");

        let id = MessageId::new();
        {
            let log = FileLog::init(path.clone()).await.unwrap();
            log.append(id, NodeId::new("n1"), "persisted".to_string()).await.unwrap();
        }

        let reopened = FileLog::init(path).await.unwrap();
        assert!(!reopened.append(id, NodeId::new("n1"), "persisted".to_string()).await.unwrap());
        assert_eq!(reopened.history().await.unwrap().len(), 1);
    }
}
