//! User settings: a small typed key-value store persisted as JSON.
//!
//! The provider is constructed explicitly and owned by its caller. Nothing
//! is read until [`SettingsProvider::initialize`]; [`SettingsProvider::reload`]
//! re-reads the file after outside edits.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde_json::Value;
use thiserror::Error;
use tokio::fs;
use tracing::debug;

/// Well-known setting keys
pub mod keys {
    /// `openai`, `ollama` or `keyword`
    pub const LLM_PROVIDER: &str = "llm_provider";
    pub const LLM_MODEL: &str = "llm_model";
    pub const LLM_BASE_URL: &str = "llm_base_url";
    pub const LLM_API_KEY: &str = "llm_api_key";
    /// `whisper` or `mock`
    pub const STT_ENGINE: &str = "stt_engine";
    pub const WHISPER_MODEL: &str = "whisper_model";
    /// Canned transcript for the `mock` engine
    pub const MOCK_TRANSCRIPT: &str = "mock_transcript";
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Settings not initialized")]
    NotInitialized,

    #[error("Setting '{key}' is not a valid {expected}")]
    TypeMismatch { key: String, expected: &'static str },

    #[error("Unknown value '{value}' for setting '{key}'")]
    InvalidValue { key: String, value: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub struct SettingsProvider {
    path: PathBuf,
    values: BTreeMap<String, Value>,
    initialized: bool,
}

impl SettingsProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            values: BTreeMap::new(),
            initialized: false,
        }
    }

    /// Provider preloaded with `values`, already initialized
    pub fn from_values(path: impl Into<PathBuf>, values: BTreeMap<String, Value>) -> Self {
        Self {
            path: path.into(),
            values,
            initialized: true,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the settings file. A missing file means no settings.
    pub async fn initialize(&mut self) -> Result<(), SettingsError> {
        self.values = match fs::read_to_string(&self.path).await {
            Ok(content) if content.trim().is_empty() => BTreeMap::new(),
            Ok(content) => serde_json::from_str(&content)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };
        self.initialized = true;
        debug!(path = %self.path.display(), count = self.values.len(), "Settings loaded");
        Ok(())
    }

    pub async fn reload(&mut self) -> Result<(), SettingsError> {
        self.initialize().await
    }

    fn value(&self, key: &str) -> Result<Option<&Value>, SettingsError> {
        if !self.initialized {
            return Err(SettingsError::NotInitialized);
        }
        Ok(self.values.get(key).filter(|v| !v.is_null()))
    }

    fn mismatch(key: &str, expected: &'static str) -> SettingsError {
        SettingsError::TypeMismatch {
            key: key.to_string(),
            expected,
        }
    }

    pub fn get_string(&self, key: &str) -> Result<Option<String>, SettingsError> {
        match self.value(key)? {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.clone())),
            Some(_) => Err(Self::mismatch(key, "string")),
        }
    }

    /// Numbers or numeric strings
    pub fn get_int(&self, key: &str) -> Result<Option<i64>, SettingsError> {
        match self.value(key)? {
            None => Ok(None),
            Some(Value::Number(n)) => n.as_i64().map(Some).ok_or_else(|| Self::mismatch(key, "integer")),
            Some(Value::String(s)) => s
                .trim()
                .parse()
                .map(Some)
                .map_err(|_| Self::mismatch(key, "integer")),
            Some(_) => Err(Self::mismatch(key, "integer")),
        }
    }

    pub fn get_double(&self, key: &str) -> Result<Option<f64>, SettingsError> {
        match self.value(key)? {
            None => Ok(None),
            Some(Value::Number(n)) => n.as_f64().map(Some).ok_or_else(|| Self::mismatch(key, "number")),
            Some(Value::String(s)) => s
                .trim()
                .parse()
                .map(Some)
                .map_err(|_| Self::mismatch(key, "number")),
            Some(_) => Err(Self::mismatch(key, "number")),
        }
    }

    pub fn get_bool(&self, key: &str) -> Result<Option<bool>, SettingsError> {
        match self.value(key)? {
            None => Ok(None),
            Some(Value::Bool(b)) => Ok(Some(*b)),
            Some(Value::String(s)) => match s.trim().to_lowercase().as_str() {
                "true" | "1" | "yes" => Ok(Some(true)),
                "false" | "0" | "no" => Ok(Some(false)),
                _ => Err(Self::mismatch(key, "boolean")),
            },
            Some(_) => Err(Self::mismatch(key, "boolean")),
        }
    }

    /// Raw JSON value, any shape
    pub fn get_json(&self, key: &str) -> Result<Option<Value>, SettingsError> {
        Ok(self.value(key)?.cloned())
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub async fn set_string(&mut self, key: &str, value: impl Into<String>) -> Result<(), SettingsError> {
        self.set_json(key, Value::String(value.into())).await
    }

    pub async fn set_int(&mut self, key: &str, value: i64) -> Result<(), SettingsError> {
        self.set_json(key, Value::from(value)).await
    }

    pub async fn set_double(&mut self, key: &str, value: f64) -> Result<(), SettingsError> {
        self.set_json(key, Value::from(value)).await
    }

    pub async fn set_bool(&mut self, key: &str, value: bool) -> Result<(), SettingsError> {
        self.set_json(key, Value::Bool(value)).await
    }

    /// Store `value` and write the file
    pub async fn set_json(&mut self, key: &str, value: Value) -> Result<(), SettingsError> {
        if !self.initialized {
            return Err(SettingsError::NotInitialized);
        }
        self.values.insert(key.to_string(), value);
        self.save().await
    }

    /// Parse command-line input: JSON literals (numbers, booleans, objects)
    /// keep their type, anything else is stored as a string.
    pub async fn set_from_str(&mut self, key: &str, raw: &str) -> Result<(), SettingsError> {
        let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
        self.set_json(key, value).await
    }

    pub async fn remove(&mut self, key: &str) -> Result<bool, SettingsError> {
        if !self.initialized {
            return Err(SettingsError::NotInitialized);
        }
        let removed = self.values.remove(key).is_some();
        if removed {
            self.save().await?;
        }
        Ok(removed)
    }

    async fn save(&self) -> Result<(), SettingsError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }

        // Atomic replace through a sibling temp file
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(&self.values)?).await?;
        fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_requires_initialize() {
        let temp = TempDir::new().unwrap();
        let settings = SettingsProvider::new(temp.path().join("settings.json"));
        assert!(matches!(
            settings.get_string(keys::LLM_MODEL),
            Err(SettingsError::NotInitialized)
        ));
    }

    #[tokio::test]
    async fn test_roundtrip_through_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("settings.json");

        let mut settings = SettingsProvider::new(&path);
        settings.initialize().await.unwrap();
        settings.set_string(keys::LLM_PROVIDER, "openai").await.unwrap();
        settings.set_int("max_recent", 12).await.unwrap();
        settings.set_bool("auto_process", true).await.unwrap();

        let mut other = SettingsProvider::new(&path);
        other.initialize().await.unwrap();
        assert_eq!(other.get_string(keys::LLM_PROVIDER).unwrap().as_deref(), Some("openai"));
        assert_eq!(other.get_int("max_recent").unwrap(), Some(12));
        assert_eq!(other.get_bool("auto_process").unwrap(), Some(true));
        assert_eq!(other.get_string("missing").unwrap(), None);
    }

    #[tokio::test]
    async fn test_reload_sees_outside_changes() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("settings.json");

        let mut settings = SettingsProvider::new(&path);
        settings.initialize().await.unwrap();
        assert_eq!(settings.get_string(keys::LLM_MODEL).unwrap(), None);

        std::fs::write(&path, r#"{"llm_model": "llama3"}"#).unwrap();
        settings.reload().await.unwrap();
        assert_eq!(settings.get_string(keys::LLM_MODEL).unwrap().as_deref(), Some("llama3"));
    }

    #[tokio::test]
    async fn test_typed_access() {
        let temp = TempDir::new().unwrap();
        let mut settings = SettingsProvider::new(temp.path().join("s.json"));
        settings.initialize().await.unwrap();

        settings.set_from_str("temperature", "0.3").await.unwrap();
        settings.set_from_str("retries", "\"4\"").await.unwrap();
        settings.set_from_str(keys::LLM_MODEL, "gpt-4o-mini").await.unwrap();
        settings.set_from_str("extra", r#"{"a": [1, 2]}"#).await.unwrap();

        assert_eq!(settings.get_double("temperature").unwrap(), Some(0.3));
        assert_eq!(settings.get_int("retries").unwrap(), Some(4));
        assert!(matches!(
            settings.get_int(keys::LLM_MODEL),
            Err(SettingsError::TypeMismatch { .. })
        ));
        assert_eq!(settings.get_json("extra").unwrap().unwrap()["a"][1], 2);
    }
}
