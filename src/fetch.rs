//! Per-paragraph audio fetching.
//!
//! One call turns a paragraph into an [`AudioItem`]: a decoded clip plus the
//! estimated timing of every word in it.  Transient failures are retried with
//! a linear back-off; a paragraph that still fails yields `None` and is
//! skipped at playback time.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

use crate::audio::AudioClip;
use crate::config::ReaderConfig;
use crate::segment::words_in;
use crate::synth::SpeechSynthesizer;
use crate::timing::{self, WordTiming};

/// Back-off unit after an empty payload.
const EMPTY_BACKOFF: Duration = Duration::from_millis(500);

/// Back-off unit after a failed call.
const ERROR_BACKOFF: Duration = Duration::from_millis(1000);

/// Audio and word timings for one paragraph.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioItem {
    pub clip: AudioClip,
    pub timings: Vec<WordTiming>,
}

impl AudioItem {
    pub fn duration(&self) -> f64 {
        self.clip.duration()
    }
}

/// Prompt prefix asking the voice to match the target reading speed.
pub fn speed_directive(wpm: u32) -> &'static str {
    match wpm {
        0..=159 => "Habla lentamente:",
        160..=279 => "",
        280..=449 => "Habla rápidamente:",
        _ => "Habla muy rápidamente:",
    }
}

pub fn build_prompt(wpm: u32, text: &str) -> String {
    format!("{} {}", speed_directive(wpm), text).trim().to_string()
}

/// Fetches paragraph audio from a [`SpeechSynthesizer`].
///
/// Holds only request parameters; it never sees the document or the cursor.
#[derive(Clone)]
pub struct Fetcher {
    synth: Arc<dyn SpeechSynthesizer>,
    voice: String,
    wpm: u32,
    max_retries: u32,
    sample_rate: u32,
    channels: u16,
}

impl Fetcher {
    pub fn new(synth: Arc<dyn SpeechSynthesizer>, config: &ReaderConfig) -> Self {
        Self {
            synth,
            voice: config.voice.clone(),
            wpm: config.wpm,
            max_retries: config.max_retries,
            sample_rate: config.sample_rate,
            channels: config.channels,
        }
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Synthesize one paragraph.
    ///
    /// Returns `None` for blank text (no request is made) or once
    /// `max_retries + 1` attempts have failed.
    pub async fn fetch(&self, text: &str) -> Option<AudioItem> {
        let text = text.trim();
        if text.is_empty() {
            tracing::debug!("skipping blank paragraph");
            return None;
        }

        let prompt = build_prompt(self.wpm, text);
        let attempts = self.max_retries + 1;

        for attempt in 1..=attempts {
            let backoff = match self.synth.synthesize(&self.voice, &prompt).await {
                Ok(payload) => match self.decode(&payload, text) {
                    Ok(Some(item)) => return Some(item),
                    Ok(None) => {
                        tracing::warn!(attempt, attempts, "empty audio payload");
                        EMPTY_BACKOFF * attempt
                    }
                    Err(err) => {
                        tracing::warn!(attempt, attempts, error = %err, "undecodable audio payload");
                        ERROR_BACKOFF * attempt
                    }
                },
                Err(err) => {
                    tracing::warn!(attempt, attempts, error = %err, "synthesis request failed");
                    ERROR_BACKOFF * attempt
                }
            };
            if attempt < attempts {
                tokio::time::sleep(backoff).await;
            }
        }

        tracing::error!(
            attempts,
            paragraph = %preview(text),
            "giving up on paragraph after all retries"
        );
        None
    }

    /// `Ok(None)` when the payload holds no audio.
    fn decode(&self, payload: &str, text: &str) -> Result<Option<AudioItem>> {
        let bytes = STANDARD.decode(payload.trim()).context("Invalid base64 audio")?;
        if bytes.is_empty() {
            return Ok(None);
        }
        let clip = AudioClip::from_pcm16_le(&bytes, self.sample_rate, self.channels)?;
        let timings = timing::estimate(&words_in(text), clip.duration());
        Ok(Some(AudioItem { clip, timings }))
    }
}

fn preview(text: &str) -> String {
    text.chars().take(30).collect()
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
