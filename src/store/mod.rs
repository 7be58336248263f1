//! Persistence boundary.
//!
//! The pipeline and review code depend only on the repository traits
//! below. [`SqliteStore`] is the bundled implementation.

pub mod schema;
pub mod sqlite;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::domain::{DomainError, Era, Event, PendingEvent};

pub use sqlite::SqliteStore;

/// Errors raised by repositories
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid record: {0}")]
    Invalid(#[from] DomainError),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Database connection lock poisoned")]
    Poisoned,
}

/// Names already used across the event store, fed back to the extractor
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Vocabulary {
    pub tags: Vec<String>,
    pub people: Vec<String>,
    pub locations: Vec<String>,
}

/// A tag already in use and how many events carry it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagCount {
    pub name: String,
    pub count: usize,
}

#[async_trait]
pub trait EventRepository: Send + Sync {
    async fn add_event(&self, event: &Event) -> Result<(), StoreError>;

    async fn get_event(&self, id: Uuid) -> Result<Option<Event>, StoreError>;

    async fn update_event(&self, event: &Event) -> Result<(), StoreError>;

    /// Returns whether a row was deleted
    async fn delete_event(&self, id: Uuid) -> Result<bool, StoreError>;

    /// Events overlapping `[start, end]`, ordered by start date
    async fn list_events_by_date_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Event>, StoreError>;

    /// Most recently created event titles, newest first
    async fn recent_event_titles(&self, limit: usize) -> Result<Vec<String>, StoreError>;

    async fn vocabulary(&self) -> Result<Vocabulary, StoreError>;

    /// Tags with usage counts, most used first
    async fn tag_counts(&self) -> Result<Vec<TagCount>, StoreError>;
}

#[async_trait]
pub trait PendingEventRepository: Send + Sync {
    /// Insert a batch in one transaction
    async fn add_pending(&self, events: &[PendingEvent]) -> Result<(), StoreError>;

    async fn get_pending(&self, id: Uuid) -> Result<Option<PendingEvent>, StoreError>;

    async fn update_pending(&self, event: &PendingEvent) -> Result<(), StoreError>;

    /// Returns whether a row was deleted
    async fn delete_pending(&self, id: Uuid) -> Result<bool, StoreError>;

    /// `approved = None` lists everything
    async fn list_pending(&self, approved: Option<bool>) -> Result<Vec<PendingEvent>, StoreError>;

    async fn count_pending(&self, approved: Option<bool>) -> Result<usize, StoreError>;

    /// Insert `event` and flag the pending record approved, atomically.
    /// Fails with `NotFound` or `Conflict` (already approved) and then
    /// writes nothing.
    async fn approve_pending(
        &self,
        id: Uuid,
        event: &Event,
        reviewed_at: DateTime<Utc>,
    ) -> Result<(), StoreError>;
}

#[async_trait]
pub trait EraRepository: Send + Sync {
    /// Fails with `Conflict` when the name is taken
    async fn add_era(&self, era: &Era) -> Result<(), StoreError>;

    async fn get_era(&self, id: Uuid) -> Result<Option<Era>, StoreError>;

    async fn list_eras(&self) -> Result<Vec<Era>, StoreError>;

    /// Deletes the era; events pointing at it keep existing with no era
    async fn delete_era(&self, id: Uuid) -> Result<bool, StoreError>;
}
