//! JSONL-based recording queue.
//!
//! Append-only log with state derived from replay. Each queue item is
//! introduced by an `enqueued` line and every status change appends a new
//! line, so the file doubles as an audit trail. Writers take an exclusive
//! advisory lock on the log while appending.

use std::collections::HashMap;
use std::fs::OpenOptions as StdOpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::Result;
use chrono::{DateTime, Utc};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::fs::{self, File};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, info};
use uuid::Uuid;

use crate::domain::RecordingStatus;

/// Capacity of the status-change broadcast buffer
const NOTIFY_CAPACITY: usize = 256;

/// Errors that can occur with the recording queue
#[derive(Debug, Error)]
pub enum QueueError {
    #[error("Queue item not found: {0}")]
    NotFound(String),

    #[error("Invalid audio path: {0:?}")]
    InvalidPath(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid state transition: {from} → {to}")]
    InvalidTransition {
        from: RecordingStatus,
        to: RecordingStatus,
    },
}

/// An entry in the queue log
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueEvent {
    pub timestamp: DateTime<Utc>,
    pub item_id: String,
    pub event_type: QueueEventType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

/// Types of queue log entries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueEventType {
    Enqueued,
    ProcessingStarted,
    Completed,
    Failed,
    ResetForRetry,
    Cleared,
}

/// Optional metadata captured at import time
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FileMeta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_size_bytes: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct EnqueuedData {
    audio_file_path: PathBuf,
    #[serde(flatten)]
    meta: FileMeta,
}

/// A recording with its current state (derived from replay)
#[derive(Debug, Clone, PartialEq)]
pub struct QueueItem {
    pub id: String,
    pub audio_file_path: PathBuf,
    pub status: RecordingStatus,
    pub duration_seconds: Option<f64>,
    pub file_size_bytes: Option<u64>,
    pub created_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
    pub error_message: Option<String>,

    /// Number of Failed → Pending resets
    pub retry_count: u32,

    /// Position of the enqueue line in the log, for stable FIFO ordering
    seq: u64,
}

impl QueueItem {
    pub fn file_name(&self) -> String {
        self.audio_file_path
            .file_name()
            .unwrap_or_default()
            .to_string_lossy()
            .to_string()
    }
}

/// Notification sent to subscribers whenever an item changes state.
/// `to` is `None` when the item was cleared from the queue.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusChange {
    pub item_id: String,
    pub from: Option<RecordingStatus>,
    pub to: Option<RecordingStatus>,
}

/// Persistent recording queue backed by a JSONL log
pub struct RecordingQueue {
    queue_path: PathBuf,

    /// Serializes check-then-append within this process
    write_guard: Mutex<()>,

    notifier: broadcast::Sender<StatusChange>,
}

impl RecordingQueue {
    pub fn new(queue_path: PathBuf) -> Self {
        let (notifier, _) = broadcast::channel(NOTIFY_CAPACITY);
        Self {
            queue_path,
            write_guard: Mutex::new(()),
            notifier,
        }
    }

    /// Open the queue at `path`, creating its parent directory
    pub async fn open(path: PathBuf) -> Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        Ok(Self::new(path))
    }

    pub fn path(&self) -> &Path {
        &self.queue_path
    }

    /// Receive status-change notifications. Sends never block; a receiver
    /// that falls behind sees `RecvError::Lagged`.
    pub fn subscribe(&self) -> broadcast::Receiver<StatusChange> {
        self.notifier.subscribe()
    }

    fn notify(&self, change: StatusChange) {
        // No subscribers is fine
        let _ = self.notifier.send(change);
    }

    fn append_event(&self, event: &QueueEvent) -> Result<(), QueueError> {
        let mut file = StdOpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.queue_path)?;

        file.lock_exclusive()?;
        let json = serde_json::to_string(event)?;
        let written = writeln!(file, "{}", json).and_then(|_| file.flush());
        file.unlock()?;
        written?;

        Ok(())
    }

    /// Replay the log into current item state
    pub async fn replay(&self) -> Result<HashMap<String, QueueItem>, QueueError> {
        let mut items: HashMap<String, QueueItem> = HashMap::new();

        if !self.queue_path.exists() {
            return Ok(items);
        }

        let file = File::open(&self.queue_path).await?;
        let reader = BufReader::new(file);
        let mut lines = reader.lines();
        let mut seq = 0u64;

        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }

            let event: QueueEvent = serde_json::from_str(&line)?;
            Self::apply_event(&mut items, event, seq);
            seq += 1;
        }

        Ok(items)
    }

    fn apply_event(items: &mut HashMap<String, QueueItem>, event: QueueEvent, seq: u64) {
        match event.event_type {
            QueueEventType::Enqueued => {
                let Some(data) = event.data else { return };
                if let Ok(data) = serde_json::from_value::<EnqueuedData>(data) {
                    items.insert(
                        event.item_id.clone(),
                        QueueItem {
                            id: event.item_id,
                            audio_file_path: data.audio_file_path,
                            status: RecordingStatus::Pending,
                            duration_seconds: data.meta.duration_seconds,
                            file_size_bytes: data.meta.file_size_bytes,
                            created_at: event.timestamp,
                            processed_at: None,
                            error_message: None,
                            retry_count: 0,
                            seq,
                        },
                    );
                }
            }
            QueueEventType::ProcessingStarted => {
                if let Some(item) = items.get_mut(&event.item_id) {
                    item.status = RecordingStatus::Processing;
                }
            }
            QueueEventType::Completed => {
                if let Some(item) = items.get_mut(&event.item_id) {
                    item.status = RecordingStatus::Completed;
                    item.processed_at = Some(event.timestamp);
                }
            }
            QueueEventType::Failed => {
                if let Some(item) = items.get_mut(&event.item_id) {
                    item.status = RecordingStatus::Failed;
                    item.processed_at = Some(event.timestamp);
                    item.error_message = event
                        .data
                        .as_ref()
                        .and_then(|d| d.get("error"))
                        .and_then(|e| e.as_str())
                        .map(str::to_string);
                }
            }
            QueueEventType::ResetForRetry => {
                if let Some(item) = items.get_mut(&event.item_id) {
                    item.status = RecordingStatus::Pending;
                    item.retry_count += 1;
                    item.error_message = None;
                    item.processed_at = None;
                }
            }
            QueueEventType::Cleared => {
                items.remove(&event.item_id);
            }
        }
    }

    /// Add a recording to the queue in `Pending` state
    pub async fn enqueue(&self, audio_path: &Path, meta: FileMeta) -> Result<QueueItem, QueueError> {
        if audio_path.as_os_str().is_empty() || audio_path.file_name().is_none() {
            return Err(QueueError::InvalidPath(audio_path.to_path_buf()));
        }

        let _guard = self.write_guard.lock().await;
        let id = Uuid::new_v4().to_string();
        let data = EnqueuedData {
            audio_file_path: audio_path.to_path_buf(),
            meta,
        };

        let event = QueueEvent {
            timestamp: Utc::now(),
            item_id: id.clone(),
            event_type: QueueEventType::Enqueued,
            data: Some(serde_json::to_value(&data)?),
        };
        self.append_event(&event)?;
        drop(_guard);

        info!(item_id = %id, path = %audio_path.display(), "Recording enqueued");
        self.notify(StatusChange {
            item_id: id.clone(),
            from: None,
            to: Some(RecordingStatus::Pending),
        });

        self.get(&id).await?.ok_or(QueueError::NotFound(id))
    }

    /// Move an item to `new_status`, validating the transition.
    ///
    /// `error_message` is recorded only for `Failed`.
    pub async fn set_status(
        &self,
        id: &str,
        new_status: RecordingStatus,
        error_message: Option<&str>,
    ) -> Result<QueueItem, QueueError> {
        let guard = self.write_guard.lock().await;

        let items = self.replay().await?;
        let item = items
            .get(id)
            .ok_or_else(|| QueueError::NotFound(id.to_string()))?;
        let from = item.status;

        if !from.can_transition_to(new_status) {
            return Err(QueueError::InvalidTransition {
                from,
                to: new_status,
            });
        }

        let (event_type, data) = match new_status {
            RecordingStatus::Pending => (QueueEventType::ResetForRetry, None),
            RecordingStatus::Processing => (QueueEventType::ProcessingStarted, None),
            RecordingStatus::Completed => (QueueEventType::Completed, None),
            RecordingStatus::Failed => (
                QueueEventType::Failed,
                Some(serde_json::json!({ "error": error_message.unwrap_or("unknown error") })),
            ),
        };

        self.append_event(&QueueEvent {
            timestamp: Utc::now(),
            item_id: id.to_string(),
            event_type,
            data,
        })?;
        drop(guard);

        debug!(item_id = %id, %from, to = %new_status, "Queue status changed");
        self.notify(StatusChange {
            item_id: id.to_string(),
            from: Some(from),
            to: Some(new_status),
        });

        self.get(id)
            .await?
            .ok_or_else(|| QueueError::NotFound(id.to_string()))
    }

    /// Reset a failed item back to `Pending`
    pub async fn retry(&self, id: &str) -> Result<QueueItem, QueueError> {
        self.set_status(id, RecordingStatus::Pending, None).await
    }

    /// Items in `status`, oldest first
    pub async fn list_by_status(&self, status: RecordingStatus) -> Result<Vec<QueueItem>, QueueError> {
        let mut items: Vec<QueueItem> = self
            .replay()
            .await?
            .into_values()
            .filter(|item| item.status == status)
            .collect();

        items.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.seq.cmp(&b.seq)));
        Ok(items)
    }

    /// All items, oldest first
    pub async fn list_all(&self) -> Result<Vec<QueueItem>, QueueError> {
        let mut items: Vec<QueueItem> = self.replay().await?.into_values().collect();
        items.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.seq.cmp(&b.seq)));
        Ok(items)
    }

    /// Remove every `Completed` item. Returns how many were cleared.
    pub async fn clear_completed(&self) -> Result<usize, QueueError> {
        let guard = self.write_guard.lock().await;
        let completed: Vec<String> = self
            .replay()
            .await?
            .into_values()
            .filter(|item| item.status == RecordingStatus::Completed)
            .map(|item| item.id)
            .collect();

        for id in &completed {
            self.append_event(&QueueEvent {
                timestamp: Utc::now(),
                item_id: id.clone(),
                event_type: QueueEventType::Cleared,
                data: None,
            })?;
        }
        drop(guard);

        for id in &completed {
            self.notify(StatusChange {
                item_id: id.clone(),
                from: Some(RecordingStatus::Completed),
                to: None,
            });
        }

        Ok(completed.len())
    }

    /// Counts per status
    pub async fn status(&self) -> Result<QueueStatus, QueueError> {
        let items = self.replay().await?;

        let mut status = QueueStatus::default();
        for item in items.values() {
            match item.status {
                RecordingStatus::Pending => status.pending += 1,
                RecordingStatus::Processing => status.processing += 1,
                RecordingStatus::Completed => status.completed += 1,
                RecordingStatus::Failed => status.failed += 1,
            }
        }

        Ok(status)
    }

    pub async fn get(&self, id: &str) -> Result<Option<QueueItem>, QueueError> {
        let items = self.replay().await?;
        Ok(items.get(id).cloned())
    }
}

/// Queue status summary
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueueStatus {
    pub pending: usize,
    pub processing: usize,
    pub completed: usize,
    pub failed: usize,
}

impl QueueStatus {
    pub fn total(&self) -> usize {
        self.pending + self.processing + self.completed + self.failed
    }
}
