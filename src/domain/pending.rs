//! Extraction output and the review staging record built from it.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{validate_range, Category, DomainError, Event};

/// One event guessed by the extraction adapter from a transcript
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedEventCandidate {
    pub title: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    pub start_date: NaiveDate,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,

    /// Free-text category guess, normalized before staging
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,

    #[serde(default)]
    pub tags: Vec<String>,

    #[serde(default)]
    pub people: Vec<String>,

    #[serde(default)]
    pub locations: Vec<String>,

    /// Model confidence in 0..=1
    #[serde(default)]
    pub confidence: f64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_text: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
}

impl ExtractedEventCandidate {
    pub fn new(title: impl Into<String>, start_date: NaiveDate) -> Self {
        Self {
            title: title.into(),
            description: None,
            start_date,
            end_date: None,
            category: None,
            tags: Vec::new(),
            people: Vec::new(),
            locations: Vec::new(),
            confidence: 0.0,
            source_text: None,
            reasoning: None,
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence;
        self
    }
}

/// An extracted event awaiting approval or rejection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingEvent {
    pub id: Uuid,

    /// Source recording (cleared if the queue item is removed)
    pub queue_item_id: Option<String>,

    pub title: String,
    pub description: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub category: Option<Category>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub people: Vec<String>,
    #[serde(default)]
    pub locations: Vec<String>,
    pub confidence_score: f64,

    /// Raw candidate as returned by the extractor, kept for auditing
    pub extracted_data_json: String,

    pub is_approved: bool,
    pub created_at: DateTime<Utc>,
    pub reviewed_at: Option<DateTime<Utc>>,
}

impl PendingEvent {
    /// Stage a candidate. The category has already been normalized by the caller.
    pub fn from_candidate(
        queue_item_id: Option<String>,
        candidate: &ExtractedEventCandidate,
        category: Option<Category>,
    ) -> Result<Self, serde_json::Error> {
        let extracted_data_json = serde_json::to_string(candidate)?;

        Ok(Self {
            id: Uuid::new_v4(),
            queue_item_id,
            title: candidate.title.trim().to_string(),
            description: candidate.description.clone(),
            start_date: candidate.start_date,
            end_date: candidate.end_date,
            category,
            tags: candidate.tags.clone(),
            people: candidate.people.clone(),
            locations: candidate.locations.clone(),
            confidence_score: candidate.confidence.clamp(0.0, 1.0),
            extracted_data_json,
            is_approved: false,
            created_at: Utc::now(),
            reviewed_at: None,
        })
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        if self.title.trim().is_empty() {
            return Err(DomainError::EmptyTitle);
        }
        validate_range(self.start_date, self.end_date)
    }

    /// Build the permanent event this record promotes into
    pub fn to_event(&self) -> Event {
        let mut event = Event::new(
            self.title.clone(),
            self.start_date,
            self.category.unwrap_or_default(),
        );
        event.description = self.description.clone();
        event.end_date = self.end_date;
        event.tags = self.tags.clone();
        event.people = self.people.clone();
        event.locations = self.locations.clone();
        event
    }
}
