//! Adapter interfaces for external AI services.
//!
//! Every adapter failure is an [`AdapterError`], whose
//! [`is_retryable`](AdapterError::is_retryable) classification drives the
//! backoff loop in `core::retry`.

pub mod keyword;
pub mod openai;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::ExtractedEventCandidate;
use crate::settings::{keys, SettingsError, SettingsProvider};

pub use keyword::KeywordExtractor;
pub use openai::{OpenAiConfig, OpenAiExtractor};

/// Errors raised by STT and LLM adapters
#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Connection failed: {0}")]
    Connection(String),

    /// Server-side failure (5xx, 429)
    #[error("Service unavailable ({status}): {message}")]
    Unavailable { status: u16, message: String },

    /// Bad or missing credentials (401/403)
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// The request itself is malformed (4xx other than auth/429)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Failed to parse response: {0}")]
    Parse(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AdapterError {
    /// Transient network-class failures that deserve another attempt
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Timeout(_) | Self::Connection(_) | Self::Unavailable { .. }
        )
    }

    /// Classify an HTTP error status
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            401 | 403 => Self::Authentication(message),
            429 | 500..=599 => Self::Unavailable { status, message },
            _ => Self::InvalidRequest(format!("HTTP {}: {}", status, message)),
        }
    }
}

impl From<reqwest::Error> for AdapterError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout(Duration::ZERO)
        } else if e.is_connect() || e.is_request() {
            Self::Connection(e.to_string())
        } else if let Some(status) = e.status() {
            Self::from_status(status.as_u16(), e.to_string())
        } else if e.is_decode() {
            Self::Parse(e.to_string())
        } else {
            Self::Connection(e.to_string())
        }
    }
}

/// Grounding passed to the extractor along with the transcript
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractionContext {
    /// "Today" for resolving relative dates like "last week"
    pub reference_date: Option<NaiveDate>,
    pub recent_events: Vec<String>,
    pub available_tags: Vec<String>,
    pub known_people: Vec<String>,
    pub known_locations: Vec<String>,
}

impl ExtractionContext {
    pub fn new(reference_date: NaiveDate) -> Self {
        Self {
            reference_date: Some(reference_date),
            ..Default::default()
        }
    }
}

/// Output of one extraction call
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub success: bool,
    pub events: Vec<ExtractedEventCandidate>,
    pub overall_confidence: f64,
    pub error_message: Option<String>,
}

impl ExtractionResult {
    pub fn ok(events: Vec<ExtractedEventCandidate>) -> Self {
        let overall_confidence = if events.is_empty() {
            0.0
        } else {
            events.iter().map(|e| e.confidence).sum::<f64>() / events.len() as f64
        };

        Self {
            success: true,
            events,
            overall_confidence,
            error_message: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            events: Vec::new(),
            overall_confidence: 0.0,
            error_message: Some(message.into()),
        }
    }
}

/// Transcript → candidate events
#[async_trait]
pub trait EventExtractor: Send + Sync {
    fn name(&self) -> &str;

    async fn extract_events(
        &self,
        transcript: &str,
        context: Option<&ExtractionContext>,
    ) -> Result<ExtractionResult, AdapterError>;
}

const OLLAMA_BASE_URL: &str = "http://localhost:11434";

/// Pick the extractor named by `llm_provider` (default `keyword`)
pub fn extractor_from_settings(
    settings: &SettingsProvider,
) -> Result<Arc<dyn EventExtractor>, SettingsError> {
    let provider = settings
        .get_string(keys::LLM_PROVIDER)?
        .unwrap_or_else(|| "keyword".to_string());

    let remote = |base_url: String| -> Result<Arc<dyn EventExtractor>, SettingsError> {
        let mut config = OpenAiConfig {
            base_url,
            api_key: settings.get_string(keys::LLM_API_KEY)?,
            ..Default::default()
        };
        if let Some(model) = settings.get_string(keys::LLM_MODEL)? {
            config.model = model;
        }
        Ok(Arc::new(OpenAiExtractor::new(config)))
    };

    match provider.trim().to_lowercase().as_str() {
        "keyword" | "offline" | "none" => Ok(Arc::new(KeywordExtractor::new())),
        "openai" => remote(
            settings
                .get_string(keys::LLM_BASE_URL)?
                .unwrap_or_else(|| OpenAiConfig::default().base_url),
        ),
        "ollama" => remote(
            settings
                .get_string(keys::LLM_BASE_URL)?
                .unwrap_or_else(|| OLLAMA_BASE_URL.to_string()),
        ),
        other => Err(SettingsError::InvalidValue {
            key: keys::LLM_PROVIDER.to_string(),
            value: other.to_string(),
        }),
    }
}
