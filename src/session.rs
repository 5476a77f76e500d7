//! A reading session: one document, one engine, one set of prepared audio.
//!
//! The session owns the [`PlaybackEngine`] and is what a front end holds on
//! to.  Changing the text, the voice or the reading speed throws away any
//! prepared audio, so `play` is refused until it is prepared again.

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;

use crate::audio::AudioClip;
use crate::clean::{strip_markdown, TextCleaner};
use crate::config::{ReaderConfig, REMOTE_VOICES};
use crate::engine::{AudioOutput, LocalVoice, PlaybackEngine, RemoteVoice, SpeechEngine};
use crate::error::{ReaderError, Result};
use crate::fetch::Fetcher;
use crate::prefetch::{prefetch_all, BatchProgress, PreparedAudio};
use crate::segment::Document;
use crate::synth::{GeminiSynthesizer, SpeechSynthesizer};

/// Outcome of a remote preparation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrepareSummary {
    pub total: usize,
    pub failed: usize,
}

impl PrepareSummary {
    /// User notice for a partially failed batch.
    pub fn notice(&self) -> Option<String> {
        (self.failed > 0).then(|| format!("{} paragraph(s) failed and were skipped", self.failed))
    }
}

pub struct ReaderSession {
    config: ReaderConfig,
    engine: PlaybackEngine,
    prepared: Option<PreparedAudio>,
}

impl ReaderSession {
    pub fn new(config: ReaderConfig) -> Self {
        Self { config, engine: PlaybackEngine::new(Document::default()), prepared: None }
    }

    pub fn config(&self) -> &ReaderConfig {
        &self.config
    }

    pub fn document(&self) -> &Document {
        self.engine.document()
    }

    pub fn engine(&self) -> &PlaybackEngine {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut PlaybackEngine {
        &mut self.engine
    }

    pub fn is_audio_ready(&self) -> bool {
        self.engine.is_ready()
    }

    /// Load already-clean text.  Markdown markup is stripped before
    /// segmentation.
    pub fn set_text(&mut self, text: &str) {
        let document = Document::segment(&strip_markdown(text));
        tracing::debug!(
            words = document.word_count(),
            paragraphs = document.paragraph_count(),
            "document loaded"
        );
        self.prepared = None;
        self.engine.load(document);
    }

    /// Run the article cleaner over `raw` and load the result.
    pub fn set_article(&mut self, raw: &str) -> String {
        let cleaned = TextCleaner::with_config(self.config.cleaner).process(raw);
        self.set_text(&cleaned);
        cleaned
    }

    pub fn set_voice(&mut self, voice: &str) -> Result<()> {
        if !REMOTE_VOICES.contains(&voice) {
            return Err(ReaderError::InvalidOperation("unknown voice"));
        }
        if self.config.voice != voice {
            self.config.voice = voice.to_string();
            self.invalidate();
        }
        Ok(())
    }

    pub fn set_wpm(&mut self, wpm: u32) -> Result<()> {
        if wpm == 0 {
            return Err(ReaderError::InvalidOperation("reading speed must be positive"));
        }
        if self.config.wpm != wpm {
            self.config.wpm = wpm;
            self.invalidate();
        }
        Ok(())
    }

    /// Drop prepared audio; the cursor is rewound.
    pub fn invalidate(&mut self) {
        if self.engine.is_ready() {
            tracing::debug!("prepared audio discarded");
        }
        self.prepared = None;
        self.engine.detach();
    }

    /// Use a local speech engine.  Nothing to fetch: it streams natively.
    pub fn prepare_local<E: SpeechEngine + 'static>(&mut self, speech: E) -> Result<()> {
        self.invalidate();
        if self.document().is_empty() {
            return Err(ReaderError::EmptyDocument);
        }
        self.engine.attach(Box::new(LocalVoice::new(speech, self.config.wpm)));
        Ok(())
    }

    /// Synthesize every paragraph with the configured Gemini voice.
    ///
    /// A missing API key is reported before any request and leaves the
    /// session untouched.
    pub async fn prepare_remote<O, F>(&mut self, output: O, on_progress: F) -> Result<PrepareSummary>
    where
        O: AudioOutput + 'static,
        F: FnMut(BatchProgress),
    {
        let synth = GeminiSynthesizer::from_config(&self.config)?;
        self.prepare_remote_with(Arc::new(synth), output, on_progress).await
    }

    pub async fn prepare_remote_with<O, F>(
        &mut self,
        synth: Arc<dyn SpeechSynthesizer>,
        output: O,
        on_progress: F,
    ) -> Result<PrepareSummary>
    where
        O: AudioOutput + 'static,
        F: FnMut(BatchProgress),
    {
        self.invalidate();
        if self.document().is_empty() {
            return Err(ReaderError::EmptyDocument);
        }

        let fetcher = Fetcher::new(synth, &self.config);
        let prepared = prefetch_all(
            &fetcher,
            self.engine.document().paragraphs(),
            self.config.concurrency,
            on_progress,
        )
        .await?;

        let summary = PrepareSummary { total: prepared.items.len(), failed: prepared.failed_count };
        if let Some(notice) = summary.notice() {
            tracing::warn!("{}", notice);
        }

        let items = Arc::clone(&prepared.items);
        self.prepared = Some(prepared);
        self.engine.attach(Box::new(RemoteVoice::new(output, items)));
        Ok(summary)
    }

    /// All prepared clips joined in paragraph order.
    pub fn export_clip(&self) -> Option<AudioClip> {
        self.prepared.as_ref().and_then(PreparedAudio::export_clip)
    }

    pub fn export_wav(&self, path: &Path) -> anyhow::Result<()> {
        let clip = self.export_clip().context("No prepared audio to export")?;
        clip.write_wav(path)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
