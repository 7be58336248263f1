//! Speech-to-text backends.
//!
//! The pipeline depends only on [`SpeechToText`]. `WhisperCliTranscriber`
//! shells out to a local whisper binary; `MockTranscriber` returns canned
//! text for tests and dry runs.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::process::Command;
use tokio::time::timeout;

use crate::adapters::AdapterError;
use crate::settings::{keys, SettingsError, SettingsProvider};

/// Result of transcription
#[derive(Debug, Clone, PartialEq)]
pub struct TranscriptResult {
    pub success: bool,
    pub text: String,
    pub error_message: Option<String>,
    pub language: Option<String>,
    pub duration_seconds: Option<f64>,
}

impl TranscriptResult {
    pub fn ok(text: impl Into<String>) -> Self {
        Self {
            success: true,
            text: text.into(),
            error_message: None,
            language: None,
            duration_seconds: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            text: String::new(),
            error_message: Some(message.into()),
            language: None,
            duration_seconds: None,
        }
    }

    /// Successful and non-blank
    pub fn is_usable(&self) -> bool {
        self.success && !self.text.trim().is_empty()
    }
}

/// Audio file → transcript text.
///
/// `Err` is reserved for transport-level failures the caller may retry;
/// an engine that ran but produced nothing returns `Ok` with `success = false`.
#[async_trait]
pub trait SpeechToText: Send + Sync {
    fn name(&self) -> &str;

    async fn transcribe(&self, audio_path: &Path) -> Result<TranscriptResult, AdapterError>;
}

/// Whisper output JSON structure
#[derive(Debug, Deserialize)]
struct WhisperOutput {
    text: String,
    #[serde(default)]
    language: String,
    #[serde(default)]
    segments: Vec<WhisperSegment>,
}

#[derive(Debug, Deserialize)]
struct WhisperSegment {
    #[serde(default)]
    end: f64,
}

/// Local whisper CLI transcription
pub struct WhisperCliTranscriber {
    binary_path: PathBuf,
    model: String,
    language: Option<String>,
    timeout: Duration,
}

impl WhisperCliTranscriber {
    pub fn new(model: impl Into<String>) -> Self {
        let binary_path = std::env::var("WHISPER_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("whisper"));

        Self {
            binary_path,
            model: model.into(),
            language: None,
            timeout: Duration::from_secs(600),
        }
    }

    pub fn with_binary_path(mut self, binary_path: impl Into<PathBuf>) -> Self {
        self.binary_path = binary_path.into();
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl SpeechToText for WhisperCliTranscriber {
    fn name(&self) -> &str {
        "whisper"
    }

    async fn transcribe(&self, audio_path: &Path) -> Result<TranscriptResult, AdapterError> {
        if !audio_path.exists() {
            return Err(AdapterError::InvalidRequest(format!(
                "audio file does not exist: {}",
                audio_path.display()
            )));
        }

        let temp_dir = tempfile::tempdir()?;

        let mut command = Command::new(&self.binary_path);
        command
            .arg(audio_path)
            .arg("--model")
            .arg(&self.model)
            .arg("--output_dir")
            .arg(temp_dir.path())
            .arg("--output_format")
            .arg("json")
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(ref language) = self.language {
            command.arg("--language").arg(language);
        }

        let output = timeout(self.timeout, command.output())
            .await
            .map_err(|_| AdapterError::Timeout(self.timeout))??;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Ok(TranscriptResult::failed(format!(
                "whisper exited with {}: {}",
                output.status.code().unwrap_or(-1),
                stderr.trim()
            )));
        }

        let stem = audio_path.file_stem().unwrap_or_default().to_string_lossy();
        let json_path = temp_dir.path().join(format!("{}.json", stem));
        let json_content = tokio::fs::read_to_string(&json_path).await?;

        let whisper: WhisperOutput = serde_json::from_str(&json_content)
            .map_err(|e| AdapterError::Parse(format!("whisper JSON: {}", e)))?;

        Ok(TranscriptResult {
            success: true,
            text: whisper.text.trim().to_string(),
            error_message: None,
            language: (!whisper.language.is_empty()).then_some(whisper.language),
            duration_seconds: whisper.segments.last().map(|s| s.end),
        })
    }
}

/// Returns a fixed transcript for every file
pub struct MockTranscriber {
    text: String,
}

impl MockTranscriber {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

#[async_trait]
impl SpeechToText for MockTranscriber {
    fn name(&self) -> &str {
        "mock"
    }

    async fn transcribe(&self, _audio_path: &Path) -> Result<TranscriptResult, AdapterError> {
        Ok(TranscriptResult::ok(self.text.clone()))
    }
}

/// Pick the transcriber named by `stt_engine` (default `whisper`)
pub fn transcriber_from_settings(
    settings: &SettingsProvider,
) -> Result<Arc<dyn SpeechToText>, SettingsError> {
    let engine = settings
        .get_string(keys::STT_ENGINE)?
        .unwrap_or_else(|| "whisper".to_string());

    match engine.trim().to_lowercase().as_str() {
        "whisper" => {
            let model = settings
                .get_string(keys::WHISPER_MODEL)?
                .unwrap_or_else(|| "base".to_string());
            Ok(Arc::new(WhisperCliTranscriber::new(model)))
        }
        "mock" => {
            let text = settings.get_string(keys::MOCK_TRANSCRIPT)?.unwrap_or_default();
            Ok(Arc::new(MockTranscriber::new(text)))
        }
        other => Err(SettingsError::InvalidValue {
            key: keys::STT_ENGINE.to_string(),
            value: other.to_string(),
        }),
    }
}
