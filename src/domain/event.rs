//! Permanent timeline records: events and eras.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{validate_range, DomainError};

/// Fixed set of event categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Work,
    Education,
    Relationship,
    Travel,
    Achievement,
    Challenge,
    Milestone,
    Other,
}

impl Category {
    pub const ALL: [Category; 8] = [
        Category::Work,
        Category::Education,
        Category::Relationship,
        Category::Travel,
        Category::Achievement,
        Category::Challenge,
        Category::Milestone,
        Category::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Work => "work",
            Self::Education => "education",
            Self::Relationship => "relationship",
            Self::Travel => "travel",
            Self::Achievement => "achievement",
            Self::Challenge => "challenge",
            Self::Milestone => "milestone",
            Self::Other => "other",
        }
    }
}

impl Default for Category {
    fn default() -> Self {
        Self::Other
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Strict parse of the canonical names. Free-text LLM guesses go through
/// `core::category::normalize_category` instead.
impl FromStr for Category {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        Self::ALL
            .iter()
            .copied()
            .find(|c| c.as_str() == lower)
            .ok_or_else(|| DomainError::UnknownCategory(s.to_string()))
    }
}

/// A permanent timeline event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub category: Category,
    pub era_id: Option<Uuid>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub people: Vec<String>,
    #[serde(default)]
    pub locations: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Event {
    /// Create a point event dated `start_date`
    pub fn new(title: impl Into<String>, start_date: NaiveDate, category: Category) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            description: None,
            start_date,
            end_date: None,
            category,
            era_id: None,
            tags: Vec::new(),
            people: Vec::new(),
            locations: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_end_date(mut self, end_date: NaiveDate) -> Self {
        self.end_date = Some(end_date);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        if self.title.trim().is_empty() {
            return Err(DomainError::EmptyTitle);
        }
        validate_range(self.start_date, self.end_date)
    }

    /// Last day covered by the event (start date for point events)
    pub fn last_date(&self) -> NaiveDate {
        self.end_date.unwrap_or(self.start_date)
    }

    pub fn is_milestone(&self) -> bool {
        self.category == Category::Milestone
    }
}

/// A named life phase drawn as a colored bar
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Era {
    pub id: Uuid,
    pub name: String,
    pub start_date: NaiveDate,
    /// `None` while the era is ongoing
    pub end_date: Option<NaiveDate>,
    pub color_code: String,
    pub description: Option<String>,
}

impl Era {
    pub fn new(name: impl Into<String>, start_date: NaiveDate, color_code: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            start_date,
            end_date: None,
            color_code: color_code.into(),
            description: None,
        }
    }

    pub fn with_end_date(mut self, end_date: NaiveDate) -> Self {
        self.end_date = Some(end_date);
        self
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        if self.name.trim().is_empty() {
            return Err(DomainError::EmptyTitle);
        }
        validate_range(self.start_date, self.end_date)
    }

    pub fn is_ongoing(&self) -> bool {
        self.end_date.is_none()
    }
}
