//! OpenAI-compatible chat-completions extractor.
//!
//! Works with any endpoint speaking `/v1/chat/completions` (OpenAI, Ollama,
//! LM Studio, vLLM). The model is asked for a JSON object of candidate
//! events; the reply is parsed leniently (code fences stripped, missing
//! fields defaulted).

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use super::{AdapterError, EventExtractor, ExtractionContext, ExtractionResult};
use crate::domain::ExtractedEventCandidate;

/// Connection settings for the chat endpoint
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub temperature: f32,
    pub timeout: Duration,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com".to_string(),
            api_key: None,
            model: "gpt-4o-mini".to_string(),
            temperature: 0.2,
            timeout: Duration::from_secs(60),
        }
    }
}

const SYSTEM_PROMPT: &str = "You extract life events from personal voice-journal transcripts. \
Reply with a single JSON object: {\"events\": [{\"title\": string, \"description\": string|null, \
\"start_date\": \"YYYY-MM-DD\", \"end_date\": \"YYYY-MM-DD\"|null, \"category\": string, \
\"tags\": [string], \"people\": [string], \"locations\": [string], \"confidence\": number 0..1, \
\"source_text\": string, \"reasoning\": string}], \"overall_confidence\": number}. \
Use the first day of the month or year when only those are known. \
Categories: work, education, relationship, travel, achievement, challenge, milestone, other. \
Reply with an empty events list if nothing datable is mentioned.";

#[derive(Debug, Deserialize)]
struct ExtractionPayload {
    #[serde(default)]
    events: Vec<ExtractedEventCandidate>,
    #[serde(default)]
    overall_confidence: Option<f64>,
}

/// LLM extractor over an OpenAI-compatible API
pub struct OpenAiExtractor {
    client: reqwest::Client,
    config: OpenAiConfig,
}

impl OpenAiExtractor {
    pub fn new(config: OpenAiConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self { client, config }
    }

    /// Build the user message: context block followed by the transcript
    pub fn build_user_prompt(transcript: &str, context: Option<&ExtractionContext>) -> String {
        let mut prompt = String::new();

        if let Some(ctx) = context {
            if let Some(date) = ctx.reference_date {
                prompt.push_str(&format!("Today is {}.\n", date.format("%Y-%m-%d")));
            }
            let sections = [
                ("Recent events", &ctx.recent_events),
                ("Existing tags (reuse when they fit)", &ctx.available_tags),
                ("Known people", &ctx.known_people),
                ("Known locations", &ctx.known_locations),
            ];
            for (label, values) in sections {
                if !values.is_empty() {
                    prompt.push_str(&format!("{}: {}\n", label, values.join(", ")));
                }
            }
            prompt.push('\n');
        }

        prompt.push_str("Transcript:\n");
        prompt.push_str(transcript.trim());
        prompt
    }

    /// Parse the assistant message into an extraction result
    pub fn parse_reply(content: &str) -> Result<ExtractionResult, AdapterError> {
        let json = strip_code_fence(content);
        let payload: ExtractionPayload =
            serde_json::from_str(json).map_err(|e| AdapterError::Parse(e.to_string()))?;

        let mut result = ExtractionResult::ok(payload.events);
        if let Some(confidence) = payload.overall_confidence {
            result.overall_confidence = confidence.clamp(0.0, 1.0);
        }
        Ok(result)
    }
}

fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

#[async_trait]
impl EventExtractor for OpenAiExtractor {
    fn name(&self) -> &str {
        "openai"
    }

    async fn extract_events(
        &self,
        transcript: &str,
        context: Option<&ExtractionContext>,
    ) -> Result<ExtractionResult, AdapterError> {
        let url = format!("{}/v1/chat/completions", self.config.base_url.trim_end_matches('/'));

        let body = serde_json::json!({
            "model": self.config.model,
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                { "role": "user", "content": Self::build_user_prompt(transcript, context) }
            ],
            "stream": false,
            "temperature": self.config.temperature,
            "response_format": { "type": "json_object" }
        });

        let mut request = self.client.post(&url).json(&body);
        if let Some(key) = self.config.api_key.as_deref().filter(|k| !k.is_empty()) {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                AdapterError::Timeout(self.config.timeout)
            } else {
                AdapterError::from(e)
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(AdapterError::from_status(status.as_u16(), text));
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| AdapterError::Parse(e.to_string()))?;

        let content = json["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| AdapterError::Parse("response has no message content".to_string()))?;

        debug!(model = %self.config.model, chars = content.len(), "LLM replied");
        Self::parse_reply(content)
    }
}
