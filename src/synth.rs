//! Remote speech synthesis.
//!
//! The service takes a voice name and a prompt and answers with base64 encoded
//! little-endian PCM16 (mono, 24 kHz).  An empty payload is a valid response
//! that the caller should treat as a transient failure.

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::config::ReaderConfig;
use crate::error::{ReaderError, Result};

/// A speech synthesis backend.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Synthesize `prompt` with `voice`.  Returns the base64 audio payload,
    /// which may be empty.
    async fn synthesize(&self, voice: &str, prompt: &str) -> Result<String>;
}

/// Gemini `generateContent` client configured for audio output.
pub struct GeminiSynthesizer {
    client: reqwest::Client,
    api_key: String,
    endpoint: String,
    model: String,
}

impl GeminiSynthesizer {
    pub fn new(api_key: impl Into<String>, endpoint: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            endpoint: endpoint.into(),
            model: model.into(),
        }
    }

    /// Build a client from `config`.  Fails with [`ReaderError::MissingCredential`]
    /// before any request is made when no key is configured.
    pub fn from_config(config: &ReaderConfig) -> Result<Self> {
        let key = config.api_key()?;
        Ok(Self::new(key, config.endpoint.trim_end_matches('/'), config.model.as_str()))
    }

    fn url(&self) -> String {
        format!("{}/models/{}:generateContent", self.endpoint, self.model)
    }
}

/// Request body for a single-voice audio generation.
pub fn request_body(voice: &str, prompt: &str) -> Value {
    json!({
        "contents": [{ "parts": [{ "text": prompt }] }],
        "generationConfig": {
            "responseModalities": ["AUDIO"],
            "speechConfig": {
                "voiceConfig": { "prebuiltVoiceConfig": { "voiceName": voice } }
            }
        }
    })
}

/// Pull the inline audio payload out of a response.  Missing fields read as
/// an empty payload.
pub fn extract_audio(response: &Value) -> String {
    response
        .pointer("/candidates/0/content/parts/0/inlineData/data")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

#[async_trait]
impl SpeechSynthesizer for GeminiSynthesizer {
    async fn synthesize(&self, voice: &str, prompt: &str) -> Result<String> {
        let response = self
            .client
            .post(self.url())
            .header("x-goog-api-key", &self.api_key)
            .json(&request_body(voice, prompt))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let detail = response.text().await.unwrap_or_default();
            return Err(ReaderError::Synthesis(format!("{}: {}", status, detail)));
        }

        let body: Value = response.json().await?;
        let audio = extract_audio(&body);
        if audio.is_empty() {
            tracing::debug!(voice, "synthesis response carried no audio");
        }
        Ok(audio)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
