//! Domain types for memline.
//!
//! - Event / Era: permanent timeline data
//! - PendingEvent / ExtractedEventCandidate: review staging
//! - RecordingStatus / ProcessingStage: queue and pipeline states

pub mod event;
pub mod pending;
pub mod recording;

use chrono::NaiveDate;
use thiserror::Error;

pub use event::{Category, Era, Event};
pub use pending::{ExtractedEventCandidate, PendingEvent};
pub use recording::{ProcessingStage, RecordingStatus};

/// Validation failures for domain records
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("End date {end} is before start date {start}")]
    InvalidDateRange { start: NaiveDate, end: NaiveDate },

    #[error("Title cannot be empty")]
    EmptyTitle,

    #[error("Unknown category: {0}")]
    UnknownCategory(String),
}

/// Check that an optional end date does not precede the start date
pub fn validate_range(start: NaiveDate, end: Option<NaiveDate>) -> Result<(), DomainError> {
    match end {
        Some(end) if end < start => Err(DomainError::InvalidDateRange { start, end }),
        _ => Ok(()),
    }
}
