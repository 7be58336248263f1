//! memline - voice memories to a reviewable life timeline
//!
//! Recordings go through a persistent queue, are transcribed and mined for
//! life events, and land in a review area. Approved events become permanent
//! timeline entries that the `timeline` module lays out on screen.
//!
//! # Architecture
//!
//! ```text
//! audio files → RecordingQueue (queue.jsonl)
//!                  ↓
//!              ExtractionPipeline: SpeechToText → EventExtractor
//!                  ↓
//!              pending_events ──approve──→ events (SQLite)
//!                                            ↓
//!                                  Viewport / layout / ticks
//! ```
//!
//! # Modules
//!
//! - `domain`: Event, Era, PendingEvent, RecordingStatus
//! - `ingest`: recording queue, directory import, speech-to-text
//! - `adapters`: LLM event extractors (OpenAI-compatible, keyword)
//! - `core`: extraction pipeline, review, retry, categories, tags
//! - `store`: repository traits and the SQLite implementation
//! - `timeline`: viewport, coordinates, track layout, ruler ticks
//! - `settings` / `config`: user settings and file/env configuration
//! - `cli`: command-line interface
//!
//! # Usage
//!
//! ```bash
//! memline import ~/Recordings
//! memline process
//! memline pending list
//! memline pending approve <id>
//! memline timeline --from 2024-01-01 --level month
//! ```

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod ingest;
pub mod settings;
pub mod store;
pub mod timeline;

// Re-export main types at crate root for convenience
pub use crate::core::{ExtractionPipeline, ReviewService};
pub use domain::{Category, Era, Event, PendingEvent, RecordingStatus};
pub use ingest::{QueueItem, RecordingQueue};
pub use settings::SettingsProvider;
pub use store::SqliteStore;
pub use timeline::{Viewport, ZoomLevel};
