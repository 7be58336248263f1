//! Pending event review: approve, reject, edit.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use uuid::Uuid;

use super::tags::{suggest_tags, TagSuggestion};
use crate::domain::{DomainError, Event, PendingEvent};
use crate::store::{EventRepository, PendingEventRepository, StoreError};

#[derive(Debug, Error)]
pub enum ReviewError {
    #[error("Pending event not found: {0}")]
    NotFound(Uuid),

    #[error("Pending event already approved: {0}")]
    AlreadyApproved(Uuid),

    #[error("Invalid pending event: {0}")]
    Invalid(#[from] DomainError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Post-approval work such as embedding or search indexing
#[async_trait]
pub trait EventIndexer: Send + Sync {
    async fn index_event(&self, event: &Event) -> anyhow::Result<()>;
}

/// Result of an approval. `indexing` is set when an indexer is configured;
/// awaiting it is optional.
pub struct Approval {
    pub event: Event,
    pub indexing: Option<JoinHandle<anyhow::Result<()>>>,
}

pub struct ReviewService {
    pending: Arc<dyn PendingEventRepository>,
    events: Arc<dyn EventRepository>,
    indexer: Option<Arc<dyn EventIndexer>>,
}

impl ReviewService {
    pub fn new(pending: Arc<dyn PendingEventRepository>, events: Arc<dyn EventRepository>) -> Self {
        Self {
            pending,
            events,
            indexer: None,
        }
    }

    pub fn with_indexer(mut self, indexer: Arc<dyn EventIndexer>) -> Self {
        self.indexer = Some(indexer);
        self
    }

    async fn load(&self, id: Uuid) -> Result<PendingEvent, ReviewError> {
        self.pending
            .get_pending(id)
            .await?
            .ok_or(ReviewError::NotFound(id))
    }

    /// Promote a pending event into a permanent one.
    ///
    /// The event insert and the approved flag are written in one
    /// transaction.
    pub async fn approve(&self, id: Uuid) -> Result<Approval, ReviewError> {
        let pending = self.load(id).await?;
        if pending.is_approved {
            return Err(ReviewError::AlreadyApproved(id));
        }
        pending.validate()?;

        let event = pending.to_event();
        self.pending
            .approve_pending(id, &event, Utc::now())
            .await
            .map_err(|e| match e {
                StoreError::Conflict(_) => ReviewError::AlreadyApproved(id),
                StoreError::NotFound(_) => ReviewError::NotFound(id),
                other => ReviewError::Store(other),
            })?;
        info!(pending_id = %id, event_id = %event.id, title = %event.title, "Pending event approved");

        let indexing = self.indexer.clone().map(|indexer| {
            let event = event.clone();
            tokio::spawn(async move {
                let result = indexer.index_event(&event).await;
                if let Err(e) = &result {
                    warn!(event_id = %event.id, error = %e, "Indexing failed");
                }
                result
            })
        });

        Ok(Approval { event, indexing })
    }

    /// Discard a pending event. Rejecting a missing id is a no-op.
    ///
    /// Returns whether anything was deleted. Approved records stay, since
    /// they document where their event came from.
    pub async fn reject(&self, id: Uuid) -> Result<bool, ReviewError> {
        match self.pending.get_pending(id).await? {
            None => Ok(false),
            Some(p) if p.is_approved => Err(ReviewError::AlreadyApproved(id)),
            Some(_) => {
                let deleted = self.pending.delete_pending(id).await?;
                info!(pending_id = %id, "Pending event rejected");
                Ok(deleted)
            }
        }
    }

    /// Save edits made before approval
    pub async fn update(&self, edited: &PendingEvent) -> Result<(), ReviewError> {
        edited.validate()?;

        let current = self.load(edited.id).await?;
        if current.is_approved {
            return Err(ReviewError::AlreadyApproved(edited.id));
        }

        self.pending.update_pending(edited).await.map_err(|e| match e {
            StoreError::Conflict(_) => ReviewError::AlreadyApproved(edited.id),
            StoreError::NotFound(_) => ReviewError::NotFound(edited.id),
            other => ReviewError::Store(other),
        })
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<PendingEvent>, ReviewError> {
        Ok(self.pending.get_pending(id).await?)
    }

    pub async fn list(&self, approved: Option<bool>) -> Result<Vec<PendingEvent>, ReviewError> {
        Ok(self.pending.list_pending(approved).await?)
    }

    /// `None` counts everything
    pub async fn count_by_status(&self, approved: Option<bool>) -> Result<usize, ReviewError> {
        Ok(self.pending.count_pending(approved).await?)
    }

    /// Existing tags worth adding to a pending event
    pub async fn suggest_tags(&self, id: Uuid, limit: usize) -> Result<Vec<TagSuggestion>, ReviewError> {
        let pending = self.load(id).await?;

        let mut terms = pending.tags.clone();
        terms.extend(
            pending
                .title
                .split_whitespace()
                .filter(|w| w.len() > 2)
                .map(str::to_string),
        );

        let known = self.events.tag_counts().await?;
        Ok(suggest_tags(&terms, &known, limit))
    }
}
