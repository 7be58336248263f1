//! Extraction pipeline integration tests.
//!
//! Queue on disk, store in memory, STT/LLM replaced by hand-written doubles.

use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Datelike;
use memline::adapters::{
    AdapterError, EventExtractor, ExtractionContext, ExtractionResult, KeywordExtractor,
};
use memline::core::{ExtractionPipeline, PipelineError, RetryPolicy};
use memline::domain::{Category, ExtractedEventCandidate, ProcessingStage, RecordingStatus};
use memline::ingest::{FileMeta, MockTranscriber, RecordingQueue, SpeechToText, TranscriptResult};
use memline::store::{PendingEventRepository, SqliteStore};
use tempfile::TempDir;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

fn fast_retry(max_attempts: u32) -> RetryPolicy {
    RetryPolicy {
        max_attempts,
        initial_delay_ms: 1,
        max_delay_ms: 5,
        backoff_multiplier: 2.0,
    }
}

/// Fails with a connection error `failures` times, then succeeds
struct FlakyTranscriber {
    failures: u32,
    calls: AtomicU32,
    text: String,
}

#[async_trait]
impl SpeechToText for FlakyTranscriber {
    fn name(&self) -> &str {
        "flaky"
    }

    async fn transcribe(&self, _audio_path: &Path) -> Result<TranscriptResult, AdapterError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call < self.failures {
            Err(AdapterError::Connection("connection reset".into()))
        } else {
            Ok(TranscriptResult::ok(self.text.clone()))
        }
    }
}

/// Always rejects credentials
struct UnauthorizedExtractor {
    calls: AtomicU32,
}

#[async_trait]
impl EventExtractor for UnauthorizedExtractor {
    fn name(&self) -> &str {
        "unauthorized"
    }

    async fn extract_events(
        &self,
        _transcript: &str,
        _context: Option<&ExtractionContext>,
    ) -> Result<ExtractionResult, AdapterError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(AdapterError::Authentication("invalid api key".into()))
    }
}

/// Returns canned candidates and records the context it was given
struct CannedExtractor {
    events: Vec<ExtractedEventCandidate>,
}

#[async_trait]
impl EventExtractor for CannedExtractor {
    fn name(&self) -> &str {
        "canned"
    }

    async fn extract_events(
        &self,
        _transcript: &str,
        context: Option<&ExtractionContext>,
    ) -> Result<ExtractionResult, AdapterError> {
        assert!(context.and_then(|c| c.reference_date).is_some());
        Ok(ExtractionResult::ok(self.events.clone()))
    }
}

/// Blocks inside `transcribe` until released
struct GatedTranscriber {
    entered: Arc<Notify>,
    release: Arc<Notify>,
}

#[async_trait]
impl SpeechToText for GatedTranscriber {
    fn name(&self) -> &str {
        "gated"
    }

    async fn transcribe(&self, _audio_path: &Path) -> Result<TranscriptResult, AdapterError> {
        self.entered.notify_one();
        self.release.notified().await;
        Ok(TranscriptResult::ok("Nothing dated here"))
    }
}

/// Panics inside the adapter call
struct PanickingTranscriber;

#[async_trait]
impl SpeechToText for PanickingTranscriber {
    fn name(&self) -> &str {
        "panicking"
    }

    async fn transcribe(&self, _audio_path: &Path) -> Result<TranscriptResult, AdapterError> {
        panic!("decoder state corrupted")
    }
}

/// Fires the run's cancellation token on its first call
struct CancellingTranscriber {
    cancel: CancellationToken,
    calls: AtomicU32,
}

#[async_trait]
impl SpeechToText for CancellingTranscriber {
    fn name(&self) -> &str {
        "cancelling"
    }

    async fn transcribe(&self, _audio_path: &Path) -> Result<TranscriptResult, AdapterError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.cancel.cancel();
        Ok(TranscriptResult::ok("We bought a house in August 2021."))
    }
}

/// Returns candidates after moving the item out from under the pipeline,
/// so the final `Completed` write is rejected
struct HijackingExtractor {
    queue: Arc<RecordingQueue>,
    item_id: String,
}

#[async_trait]
impl EventExtractor for HijackingExtractor {
    fn name(&self) -> &str {
        "hijacking"
    }

    async fn extract_events(
        &self,
        _transcript: &str,
        _context: Option<&ExtractionContext>,
    ) -> Result<ExtractionResult, AdapterError> {
        self.queue
            .set_status(&self.item_id, RecordingStatus::Failed, Some("removed elsewhere"))
            .await
            .unwrap();
        let date = chrono::NaiveDate::from_ymd_opt(2021, 8, 1).unwrap();
        Ok(ExtractionResult::ok(vec![ExtractedEventCandidate::new("Bought a house", date)]))
    }
}

struct Harness {
    _dir: TempDir,
    queue: Arc<RecordingQueue>,
    store: Arc<SqliteStore>,
}

impl Harness {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let queue = Arc::new(RecordingQueue::new(dir.path().join("queue.jsonl")));
        let store = Arc::new(SqliteStore::open_in_memory().unwrap());
        Self {
            _dir: dir,
            queue,
            store,
        }
    }

    fn pipeline(
        &self,
        transcriber: Arc<dyn SpeechToText>,
        extractor: Arc<dyn EventExtractor>,
    ) -> ExtractionPipeline {
        ExtractionPipeline::new(
            self.queue.clone(),
            transcriber,
            extractor,
            self.store.clone(),
            self.store.clone(),
        )
        .with_retry_policy(fast_retry(3))
    }

    async fn enqueue(&self, name: &str) -> String {
        self.queue
            .enqueue(&Path::new("/recordings").join(name), FileMeta::default())
            .await
            .unwrap()
            .id
    }
}

#[tokio::test]
async fn test_graduation_memo_becomes_education_candidate() {
    let h = Harness::new();
    let pipeline = h.pipeline(
        Arc::new(MockTranscriber::new("Well, I graduated college in May 2019.")),
        Arc::new(KeywordExtractor::new()),
    );
    let id = h.enqueue("graduation.m4a").await;

    let created = pipeline.process_item(&id).await.unwrap();

    assert_eq!(created.len(), 1);
    let pending = &created[0];
    assert_eq!(pending.start_date.year(), 2019);
    assert_eq!(pending.start_date.month(), 5);
    assert!(matches!(
        pending.category,
        Some(Category::Education) | Some(Category::Milestone)
    ));
    assert!(!pending.is_approved);

    let stored = h.store.list_pending(Some(false)).await.unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].id, pending.id);
}

#[tokio::test]
async fn test_zero_candidates_still_completes() {
    let h = Harness::new();
    let pipeline = h.pipeline(
        Arc::new(MockTranscriber::new("Just thinking out loud about nothing in particular.")),
        Arc::new(KeywordExtractor::new()),
    );
    let id = h.enqueue("ramble.m4a").await;

    let created = pipeline.process_item(&id).await.unwrap();
    assert!(created.is_empty());

    let item = h.queue.get(&id).await.unwrap().unwrap();
    assert_eq!(item.status, RecordingStatus::Completed);
    assert!(item.processed_at.is_some());
}

#[tokio::test]
async fn test_transient_stt_errors_are_retried() {
    let h = Harness::new();
    let transcriber = Arc::new(FlakyTranscriber {
        failures: 2,
        calls: AtomicU32::new(0),
        text: "We moved to Berlin in March 2021.".into(),
    });
    let pipeline = h.pipeline(transcriber.clone(), Arc::new(KeywordExtractor::new()));
    let id = h.enqueue("berlin.m4a").await;

    let created = pipeline.process_item(&id).await.unwrap();

    assert_eq!(transcriber.calls.load(Ordering::SeqCst), 3);
    assert_eq!(created.len(), 1);
    assert_eq!(
        h.queue.get(&id).await.unwrap().unwrap().status,
        RecordingStatus::Completed
    );
}

#[tokio::test]
async fn test_retries_exhausted_marks_item_failed() {
    let h = Harness::new();
    let transcriber = Arc::new(FlakyTranscriber {
        failures: 10,
        calls: AtomicU32::new(0),
        text: String::new(),
    });
    let pipeline = h.pipeline(transcriber.clone(), Arc::new(KeywordExtractor::new()));
    let id = h.enqueue("broken.m4a").await;

    let err = pipeline.process_item(&id).await.unwrap_err();
    assert!(matches!(err, PipelineError::TranscriptionFailed(_)));
    assert_eq!(transcriber.calls.load(Ordering::SeqCst), 3);

    let item = h.queue.get(&id).await.unwrap().unwrap();
    assert_eq!(item.status, RecordingStatus::Failed);
    assert!(item.error_message.unwrap().contains("connection reset"));
    assert!(item.processed_at.is_some());
}

#[tokio::test]
async fn test_auth_errors_fail_without_retry() {
    let h = Harness::new();
    let extractor = Arc::new(UnauthorizedExtractor {
        calls: AtomicU32::new(0),
    });
    let pipeline = h.pipeline(
        Arc::new(MockTranscriber::new("Trip to Japan in April 2023.")),
        extractor.clone(),
    );
    let id = h.enqueue("japan.m4a").await;

    let err = pipeline.process_item(&id).await.unwrap_err();
    assert!(matches!(err, PipelineError::ExtractionFailed(_)));
    assert_eq!(extractor.calls.load(Ordering::SeqCst), 1);
    assert_eq!(h.store.count_pending(None).await.unwrap(), 0);
}

#[tokio::test]
async fn test_invalid_candidates_are_dropped() {
    let h = Harness::new();
    let date = |m, d| chrono::NaiveDate::from_ymd_opt(2022, m, d).unwrap();

    let mut backwards = ExtractedEventCandidate::new("Backwards trip", date(6, 10));
    backwards.end_date = Some(date(6, 1));
    let events = vec![
        ExtractedEventCandidate::new("Started the new job", date(2, 1)).with_category("career"),
        ExtractedEventCandidate::new("   ", date(3, 1)),
        backwards,
    ];

    let pipeline = h.pipeline(
        Arc::new(MockTranscriber::new("irrelevant")),
        Arc::new(CannedExtractor { events }),
    );
    let id = h.enqueue("mixed.m4a").await;

    let created = pipeline.process_item(&id).await.unwrap();
    assert_eq!(created.len(), 1);
    assert_eq!(created[0].title, "Started the new job");
    assert_eq!(created[0].category, Some(Category::Work));
}

#[tokio::test]
async fn test_batch_processes_in_fifo_order_and_counts_failures() {
    let h = Harness::new();
    let pipeline = h.pipeline(
        Arc::new(MockTranscriber::new("I got married in June 2018. We flew to Lisbon in July 2018.")),
        Arc::new(KeywordExtractor::new()),
    );
    let first = h.enqueue("one.m4a").await;
    let second = h.enqueue("two.m4a").await;

    let mut stages = pipeline.subscribe_stages();
    let summary = pipeline
        .process_all_pending(&CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(summary.completed, 2);
    assert_eq!(summary.failed, 0);
    assert_eq!(summary.pending_created, 4);
    assert!(!summary.cancelled);

    let mut order = Vec::new();
    while let Ok(change) = stages.try_recv() {
        if change.stage == ProcessingStage::Transcribing {
            order.push(change.item_id);
        }
    }
    assert_eq!(order, vec![first, second]);
    assert_eq!(h.queue.status().await.unwrap().completed, 2);
}

#[tokio::test]
async fn test_concurrent_run_is_rejected() {
    let h = Harness::new();
    let entered = Arc::new(Notify::new());
    let release = Arc::new(Notify::new());
    let pipeline = Arc::new(h.pipeline(
        Arc::new(GatedTranscriber {
            entered: entered.clone(),
            release: release.clone(),
        }),
        Arc::new(KeywordExtractor::new()),
    ));
    h.enqueue("slow.m4a").await;

    let running = {
        let pipeline = pipeline.clone();
        tokio::spawn(async move { pipeline.process_all_pending(&CancellationToken::new()).await })
    };
    entered.notified().await;

    assert!(matches!(
        pipeline.process_next().await,
        Err(PipelineError::AlreadyRunning)
    ));

    release.notify_one();
    let summary = running.await.unwrap().unwrap();
    assert_eq!(summary.completed, 1);

    // Lock released once the run finished
    assert!(pipeline.process_next().await.unwrap().is_none());
}

#[tokio::test]
async fn test_failed_item_can_be_retried_and_reprocessed() {
    let h = Harness::new();
    let id = h.enqueue("retry.m4a").await;

    let failing = h.pipeline(
        Arc::new(MockTranscriber::new("")),
        Arc::new(KeywordExtractor::new()),
    );
    assert!(failing.process_next().await.is_err());

    let item = h.queue.retry(&id).await.unwrap();
    assert_eq!(item.status, RecordingStatus::Pending);
    assert_eq!(item.retry_count, 1);

    let working = h.pipeline(
        Arc::new(MockTranscriber::new("I finished the marathon in October 2020.")),
        Arc::new(KeywordExtractor::new()),
    );
    let created = working.process_next().await.unwrap().unwrap();
    assert_eq!(created.len(), 1);
    assert_eq!(created[0].queue_item_id.as_deref(), Some(id.as_str()));
}

#[tokio::test]
async fn test_adapter_panic_marks_item_failed() {
    let h = Harness::new();
    let pipeline = h.pipeline(Arc::new(PanickingTranscriber), Arc::new(KeywordExtractor::new()));
    let id = h.enqueue("corrupt.m4a").await;
    let mut stages = pipeline.subscribe_stages();

    let err = pipeline.process_item(&id).await.unwrap_err();
    assert!(matches!(err, PipelineError::Panicked(_)));

    let item = h.queue.get(&id).await.unwrap().unwrap();
    assert_eq!(item.status, RecordingStatus::Failed);
    assert!(item.error_message.unwrap().contains("decoder state corrupted"));
    assert!(item.processed_at.is_some());

    let mut last = None;
    while let Ok(change) = stages.try_recv() {
        last = Some(change.stage);
    }
    assert_eq!(last, Some(ProcessingStage::Failed));

    // The item can go around again
    assert_eq!(h.queue.retry(&id).await.unwrap().status, RecordingStatus::Pending);
}

#[tokio::test]
async fn test_cancel_mid_run_keeps_finished_items() {
    let h = Harness::new();
    let cancel = CancellationToken::new();
    let transcriber = Arc::new(CancellingTranscriber {
        cancel: cancel.clone(),
        calls: AtomicU32::new(0),
    });
    let pipeline = h.pipeline(transcriber.clone(), Arc::new(KeywordExtractor::new()));
    let first = h.enqueue("house.m4a").await;
    let second = h.enqueue("later.m4a").await;

    let summary = pipeline.process_all_pending(&cancel).await.unwrap();

    assert!(summary.cancelled);
    assert_eq!(summary.completed, 1);
    assert_eq!(summary.failed, 0);
    assert_eq!(transcriber.calls.load(Ordering::SeqCst), 1);

    let first = h.queue.get(&first).await.unwrap().unwrap();
    assert_eq!(first.status, RecordingStatus::Completed);
    let second = h.queue.get(&second).await.unwrap().unwrap();
    assert_eq!(second.status, RecordingStatus::Pending);

    let status = h.queue.status().await.unwrap();
    assert_eq!(status.processing, 0);
}

#[tokio::test]
async fn test_staged_events_removed_when_completion_fails() {
    let h = Harness::new();
    let id = h.enqueue("house.m4a").await;
    let pipeline = h.pipeline(
        Arc::new(MockTranscriber::new("irrelevant")),
        Arc::new(HijackingExtractor {
            queue: h.queue.clone(),
            item_id: id.clone(),
        }),
    );

    let err = pipeline.process_item(&id).await.unwrap_err();
    assert!(matches!(err, PipelineError::Queue(_)));
    assert_eq!(h.store.count_pending(None).await.unwrap(), 0);
    assert_eq!(
        h.queue.get(&id).await.unwrap().unwrap().status,
        RecordingStatus::Failed
    );
}
