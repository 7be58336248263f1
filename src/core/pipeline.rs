//! Recording → pending events.
//!
//! For each queue item the pipeline transcribes the audio, asks the
//! extractor for candidate events and stages them for review. Any failure
//! after the item enters `Processing`, adapter panics included, moves it
//! to `Failed` with the error message, so nothing is ever left in
//! `Processing`.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::path::Path;
use std::sync::Arc;

use chrono::Local;
use futures_util::FutureExt;
use thiserror::Error;
use tokio::sync::{broadcast, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument, warn};

use super::category::normalize_category;
use super::retry::{retry_with_backoff, RetryPolicy};
use crate::adapters::{EventExtractor, ExtractionContext};
use crate::domain::{PendingEvent, ProcessingStage, RecordingStatus};
use crate::ingest::{QueueError, RecordingQueue, SpeechToText};
use crate::store::{EventRepository, PendingEventRepository, StoreError};

/// How many recent event titles are sent to the extractor
const RECENT_EVENTS_LIMIT: usize = 10;

const STAGE_CAPACITY: usize = 64;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Queue item not found: {0}")]
    NotFound(String),

    #[error("Transcription failed: {0}")]
    TranscriptionFailed(String),

    #[error("Extraction failed: {0}")]
    ExtractionFailed(String),

    #[error("Adapter panicked: {0}")]
    Panicked(String),

    #[error("A processing run is already in progress")]
    AlreadyRunning,

    #[error("Queue error: {0}")]
    Queue(#[from] QueueError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Per-item progress, published while an item is processed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageChange {
    pub item_id: String,
    pub stage: ProcessingStage,
}

/// Totals for one `process_all_pending` run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub completed: usize,
    pub failed: usize,
    pub pending_created: usize,
    pub cancelled: bool,
}

/// Orchestrates STT and extraction for queued recordings
pub struct ExtractionPipeline {
    queue: Arc<RecordingQueue>,
    transcriber: Arc<dyn SpeechToText>,
    extractor: Arc<dyn EventExtractor>,
    events: Arc<dyn EventRepository>,
    pending: Arc<dyn PendingEventRepository>,
    retry_policy: RetryPolicy,
    run_lock: Mutex<()>,
    stages: broadcast::Sender<StageChange>,
}

impl ExtractionPipeline {
    pub fn new(
        queue: Arc<RecordingQueue>,
        transcriber: Arc<dyn SpeechToText>,
        extractor: Arc<dyn EventExtractor>,
        events: Arc<dyn EventRepository>,
        pending: Arc<dyn PendingEventRepository>,
    ) -> Self {
        let (stages, _) = broadcast::channel(STAGE_CAPACITY);
        Self {
            queue,
            transcriber,
            extractor,
            events,
            pending,
            retry_policy: RetryPolicy::default(),
            run_lock: Mutex::new(()),
            stages,
        }
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    pub fn queue(&self) -> &Arc<RecordingQueue> {
        &self.queue
    }

    /// Receive stage updates for items processed from now on
    pub fn subscribe_stages(&self) -> broadcast::Receiver<StageChange> {
        self.stages.subscribe()
    }

    fn publish(&self, item_id: &str, stage: ProcessingStage) {
        let _ = self.stages.send(StageChange {
            item_id: item_id.to_string(),
            stage,
        });
    }

    /// Process one queue item and return the pending events it produced.
    ///
    /// The item must be `Pending`.
    #[instrument(skip(self), fields(item_id = %id))]
    pub async fn process_item(&self, id: &str) -> Result<Vec<PendingEvent>, PipelineError> {
        let item = self
            .queue
            .get(id)
            .await?
            .ok_or_else(|| PipelineError::NotFound(id.to_string()))?;

        self.queue
            .set_status(id, RecordingStatus::Processing, None)
            .await?;
        info!(path = %item.audio_file_path.display(), "Processing recording");

        let outcome = AssertUnwindSafe(self.run_stages(id, &item.audio_file_path))
            .catch_unwind()
            .await
            .unwrap_or_else(|payload| Err(PipelineError::Panicked(panic_message(payload))));

        match outcome {
            Ok(created) => {
                self.publish(id, ProcessingStage::Completed);
                info!(pending = created.len(), "Recording processed");
                Ok(created)
            }
            Err(e) => {
                let message = e.to_string();
                if let Err(mark_err) = self
                    .queue
                    .set_status(id, RecordingStatus::Failed, Some(&message))
                    .await
                {
                    error!(error = %mark_err, "Failed to mark recording as failed");
                }
                self.publish(id, ProcessingStage::Failed);
                warn!(error = %message, "Recording failed");
                Err(e)
            }
        }
    }

    async fn run_stages(&self, id: &str, audio_path: &Path) -> Result<Vec<PendingEvent>, PipelineError> {
        self.publish(id, ProcessingStage::Transcribing);
        let transcript = retry_with_backoff(&self.retry_policy, "transcribe", || {
            self.transcriber.transcribe(audio_path)
        })
        .await
        .map_err(|e| PipelineError::TranscriptionFailed(e.to_string()))?;

        if !transcript.is_usable() {
            let reason = transcript
                .error_message
                .unwrap_or_else(|| "transcript is empty".to_string());
            return Err(PipelineError::TranscriptionFailed(reason));
        }

        self.publish(id, ProcessingStage::Extracting);
        let context = self.build_context().await?;
        let extraction = retry_with_backoff(&self.retry_policy, "extract", || {
            self.extractor.extract_events(&transcript.text, Some(&context))
        })
        .await
        .map_err(|e| PipelineError::ExtractionFailed(e.to_string()))?;

        if !extraction.success {
            let reason = extraction
                .error_message
                .unwrap_or_else(|| "extractor reported failure".to_string());
            return Err(PipelineError::ExtractionFailed(reason));
        }

        let mut staged = Vec::with_capacity(extraction.events.len());
        for candidate in &extraction.events {
            let category = candidate.category.as_deref().map(normalize_category);
            let pending = PendingEvent::from_candidate(Some(id.to_string()), candidate, category)?;

            if let Err(e) = pending.validate() {
                warn!(title = %candidate.title, error = %e, "Dropping unusable candidate");
                continue;
            }
            staged.push(pending);
        }

        self.pending.add_pending(&staged).await?;
        if let Err(e) = self
            .queue
            .set_status(id, RecordingStatus::Completed, None)
            .await
        {
            self.unstage(&staged).await;
            return Err(e.into());
        }

        Ok(staged)
    }

    /// Drop rows staged for an item that did not reach `Completed`, so a
    /// later retry does not stage them twice.
    async fn unstage(&self, staged: &[PendingEvent]) {
        for pending in staged {
            if let Err(e) = self.pending.delete_pending(pending.id).await {
                error!(pending_id = %pending.id, error = %e, "Failed to remove staged event");
            }
        }
    }

    async fn build_context(&self) -> Result<ExtractionContext, StoreError> {
        let vocabulary = self.events.vocabulary().await?;

        let mut context = ExtractionContext::new(Local::now().date_naive());
        context.recent_events = self.events.recent_event_titles(RECENT_EVENTS_LIMIT).await?;
        context.available_tags = vocabulary.tags;
        context.known_people = vocabulary.people;
        context.known_locations = vocabulary.locations;

        Ok(context)
    }

    /// Process the oldest pending item, if any.
    ///
    /// Returns `AlreadyRunning` without waiting if another run holds the lock.
    pub async fn process_next(&self) -> Result<Option<Vec<PendingEvent>>, PipelineError> {
        let _run = self
            .run_lock
            .try_lock()
            .map_err(|_| PipelineError::AlreadyRunning)?;

        let next = self
            .queue
            .list_by_status(RecordingStatus::Pending)
            .await?
            .into_iter()
            .next();

        match next {
            Some(item) => self.process_item(&item.id).await.map(Some),
            None => Ok(None),
        }
    }

    /// Process every pending item in FIFO order.
    ///
    /// Individual failures are counted, not propagated. Cancellation is
    /// checked between items.
    #[instrument(skip_all)]
    pub async fn process_all_pending(
        &self,
        cancel: &CancellationToken,
    ) -> Result<BatchSummary, PipelineError> {
        let _run = self
            .run_lock
            .try_lock()
            .map_err(|_| PipelineError::AlreadyRunning)?;

        let items = self.queue.list_by_status(RecordingStatus::Pending).await?;
        info!(count = items.len(), "Processing pending recordings");

        let mut summary = BatchSummary::default();
        for item in items {
            if cancel.is_cancelled() {
                info!("Processing run cancelled");
                summary.cancelled = true;
                break;
            }

            match self.process_item(&item.id).await {
                Ok(created) => {
                    summary.completed += 1;
                    summary.pending_created += created.len();
                }
                Err(_) => summary.failed += 1,
            }
        }

        Ok(summary)
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::KeywordExtractor;
    use crate::ingest::{FileMeta, MockTranscriber};
    use crate::store::SqliteStore;
    use tempfile::TempDir;

    async fn pipeline(dir: &TempDir, transcript: &str) -> (ExtractionPipeline, Arc<SqliteStore>) {
        let queue = Arc::new(RecordingQueue::new(dir.path().join("queue.jsonl")));
        let store = Arc::new(SqliteStore::open_in_memory().unwrap());
        let pipeline = ExtractionPipeline::new(
            queue,
            Arc::new(MockTranscriber::new(transcript)),
            Arc::new(KeywordExtractor::new()),
            store.clone(),
            store.clone(),
        )
        .with_retry_policy(RetryPolicy::no_retry());
        (pipeline, store)
    }

    #[tokio::test]
    async fn test_process_item_stages_candidates() {
        let dir = TempDir::new().unwrap();
        let (pipeline, store) = pipeline(&dir, "I graduated college in May 2019.").await;
        let item = pipeline
            .queue()
            .enqueue(Path::new("/audio/memo.m4a"), FileMeta::default())
            .await
            .unwrap();

        let created = pipeline.process_item(&item.id).await.unwrap();
        assert_eq!(created.len(), 1);
        assert_eq!(created[0].category, Some(crate::domain::Category::Education));
        assert_eq!(created[0].queue_item_id.as_deref(), Some(item.id.as_str()));
        assert_eq!(store.count_pending(Some(false)).await.unwrap(), 1);

        let item = pipeline.queue().get(&item.id).await.unwrap().unwrap();
        assert_eq!(item.status, RecordingStatus::Completed);
        assert!(item.processed_at.is_some());
    }

    #[tokio::test]
    async fn test_empty_transcript_fails_item() {
        let dir = TempDir::new().unwrap();
        let (pipeline, _store) = pipeline(&dir, "   ").await;
        let item = pipeline
            .queue()
            .enqueue(Path::new("/audio/silence.m4a"), FileMeta::default())
            .await
            .unwrap();

        let err = pipeline.process_item(&item.id).await.unwrap_err();
        assert!(matches!(err, PipelineError::TranscriptionFailed(_)));

        let item = pipeline.queue().get(&item.id).await.unwrap().unwrap();
        assert_eq!(item.status, RecordingStatus::Failed);
        assert!(item.error_message.is_some());
    }

    #[tokio::test]
    async fn test_missing_item() {
        let dir = TempDir::new().unwrap();
        let (pipeline, _store) = pipeline(&dir, "x").await;
        assert!(matches!(
            pipeline.process_item("nope").await,
            Err(PipelineError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_process_next_on_empty_queue() {
        let dir = TempDir::new().unwrap();
        let (pipeline, _store) = pipeline(&dir, "x").await;
        assert!(pipeline.process_next().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_cancelled_before_start_touches_nothing() {
        let dir = TempDir::new().unwrap();
        let (pipeline, _store) = pipeline(&dir, "Trip to Rome in 2020").await;
        pipeline
            .queue()
            .enqueue(Path::new("/audio/a.m4a"), FileMeta::default())
            .await
            .unwrap();

        let cancel = CancellationToken::new();
        cancel.cancel();
        let summary = pipeline.process_all_pending(&cancel).await.unwrap();

        assert!(summary.cancelled);
        assert_eq!(summary.completed, 0);
        assert_eq!(pipeline.queue().status().await.unwrap().pending, 1);
    }
}
