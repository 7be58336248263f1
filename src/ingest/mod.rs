//! Recording ingestion.
//!
//! 1. **Importer**: scans a directory for audio files
//! 2. **Queue**: JSONL-backed work list with status transitions
//! 3. **Transcriber**: speech-to-text backends
//!
//! ```text
//! audio dir → Importer → Queue → core::ExtractionPipeline
//!                          ↓
//!                     queue.jsonl
//! ```

pub mod importer;
pub mod queue;
pub mod transcriber;

pub use importer::{import_directory, ImportConfig, ImportResult};
pub use queue::{FileMeta, QueueError, QueueItem, QueueStatus, RecordingQueue, StatusChange};
pub use transcriber::{
    transcriber_from_settings, MockTranscriber, SpeechToText, TranscriptResult, WhisperCliTranscriber,
};
