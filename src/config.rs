//! Reader configuration.
//!
//! Loaded from a JSON file (every field optional) and overlaid with the
//! environment.  The API key is only ever required by the remote voice path.

use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::clean::CleanerConfig;
use crate::error::ReaderError;

/// Prebuilt voices offered by the remote synthesis service.
pub const REMOTE_VOICES: &[&str] = &["Kore", "Puck", "Charon", "Fenrir", "Zephyr"];

/// Environment variable holding the synthesis API key.
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

pub const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_TTS_MODEL: &str = "gemini-2.5-flash-preview-tts";

/// Sample rate of the PCM the synthesis service returns.
pub const DEFAULT_SAMPLE_RATE: u32 = 24_000;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReaderConfig {
    /// Remote voice name, one of [`REMOTE_VOICES`].
    pub voice: String,

    /// Target reading speed in words per minute.
    pub wpm: u32,

    /// Paragraphs synthesised in parallel during preparation.
    pub concurrency: usize,

    /// Retries per paragraph after the first attempt.
    pub max_retries: u32,

    pub sample_rate: u32,
    pub channels: u16,

    /// Synthesis API key; falls back to `GEMINI_API_KEY` via [`ReaderConfig::with_env`].
    #[serde(skip_serializing)]
    pub api_key: Option<String>,

    pub endpoint: String,
    pub model: String,

    pub cleaner: CleanerConfig,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            voice: "Zephyr".to_string(),
            wpm: 350,
            concurrency: 3,
            max_retries: 2,
            sample_rate: DEFAULT_SAMPLE_RATE,
            channels: 1,
            api_key: None,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model: DEFAULT_TTS_MODEL.to_string(),
            cleaner: CleanerConfig::default(),
        }
    }
}

impl ReaderConfig {
    /// Parse a JSON config file.  Missing fields take their defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("Cannot read config: {}", path.display()))?;
        let config: Self = serde_json::from_slice(&bytes)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Fill the API key from the environment when the file didn't set one.
    pub fn with_env(mut self) -> Self {
        if self.api_key.as_deref().map_or(true, |k| k.trim().is_empty()) {
            self.api_key = std::env::var(API_KEY_ENV).ok();
        }
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !REMOTE_VOICES.contains(&self.voice.as_str()) {
            bail!("Unknown voice '{}'. Available: {:?}", self.voice, REMOTE_VOICES);
        }
        if self.wpm == 0 {
            bail!("wpm must be positive");
        }
        if self.concurrency == 0 {
            bail!("concurrency must be at least 1");
        }
        if self.channels == 0 || self.sample_rate == 0 {
            bail!("sample_rate and channels must be positive");
        }
        Ok(())
    }

    /// The configured API key, or [`ReaderError::MissingCredential`].
    pub fn api_key(&self) -> Result<&str, ReaderError> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .ok_or(ReaderError::MissingCredential)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
