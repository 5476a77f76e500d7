//! Playback synchronisation engine.
//!
//! One [`PlaybackEngine`] per session owns the document, the authoritative
//! [`PlaybackCursor`] and the active [`TimingSource`].  Callers drive it with
//! `play`/`pause`/`stop`/`seek` and forward every host callback (frame ticks,
//! clip ends, speech boundaries) through [`PlaybackEngine::handle`]; nothing
//! else writes the cursor.
//!
//! ```text
//!            play               pause
//!  Stopped ───────▶ Playing ◀───────▶ Paused
//!     ▲                │   play          │
//!     └──── stop ──────┴─────────────────┘
//! ```
//!
//! A `play` from `Paused` resumes the source in place unless the user sought
//! while paused, in which case it restarts the source at the new word (a
//! *cold start*), as it does from `Stopped`.

mod clock;
mod local;
mod remote;
mod source;

#[cfg(test)]
pub(crate) mod testing;

pub use clock::ClockOutput;
pub use local::{rate_for_wpm, LocalVoice, SpeechEngine};
pub use remote::{AudioOutput, RemoteVoice};
pub use source::{Cue, SourceEvent, TimingSource};

use crate::error::{ReaderError, Result};
use crate::segment::Document;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PlaybackState {
    #[default]
    Stopped,
    Playing,
    Paused,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlaybackCursor {
    pub state: PlaybackState,
    pub word_index: usize,
    pub paragraph_index: usize,
    /// Set by a seek while paused: the next `play` must cold start.
    pub seeked_while_paused: bool,
}

/// The current word with its neighbours, for previews.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WordWindow<'a> {
    pub previous: Option<&'a str>,
    pub current: Option<&'a str>,
    pub next: Option<&'a str>,
}

pub struct PlaybackEngine {
    document: Document,
    cursor: PlaybackCursor,
    source: Option<Box<dyn TimingSource>>,
}

impl PlaybackEngine {
    pub fn new(document: Document) -> Self {
        Self { document, cursor: PlaybackCursor::default(), source: None }
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn cursor(&self) -> &PlaybackCursor {
        &self.cursor
    }

    pub fn state(&self) -> PlaybackState {
        self.cursor.state
    }

    /// Whether a timing source is attached, i.e. audio has been prepared.
    pub fn is_ready(&self) -> bool {
        self.source.is_some()
    }

    /// Replace the document.  Stops playback and drops the timing source,
    /// which was prepared for the old text.
    pub fn load(&mut self, document: Document) {
        self.detach();
        self.document = document;
    }

    /// Install a prepared timing source, stopping any current playback.
    pub fn attach(&mut self, source: Box<dyn TimingSource>) {
        self.stop();
        self.source = Some(source);
    }

    /// Stop and drop the timing source.
    pub fn detach(&mut self) {
        self.stop();
        self.source = None;
    }

    pub fn window(&self) -> WordWindow<'_> {
        let i = self.cursor.word_index;
        WordWindow {
            previous: i.checked_sub(1).and_then(|p| self.document.word(p)),
            current: self.document.word(i),
            next: self.document.word(i + 1),
        }
    }

    pub fn play(&mut self) -> Result<()> {
        if self.document.is_empty() {
            return Err(ReaderError::EmptyDocument);
        }
        let Some(source) = self.source.as_mut() else {
            return Err(ReaderError::NotReady);
        };

        match self.cursor.state {
            PlaybackState::Playing => Ok(()),
            PlaybackState::Paused if !self.cursor.seeked_while_paused => {
                if let Err(err) = source.resume() {
                    return self.fail(err);
                }
                self.cursor.state = PlaybackState::Playing;
                Ok(())
            }
            _ => {
                let paragraph = self.cursor.paragraph_index;
                let word = self
                    .cursor
                    .word_index
                    .saturating_sub(self.document.paragraph_start(paragraph));
                tracing::debug!(paragraph, word, "cold start");
                match source.start(&self.document, paragraph, word) {
                    Ok(cue) => {
                        self.cursor.state = PlaybackState::Playing;
                        self.cursor.seeked_while_paused = false;
                        self.apply(cue).map(|_| ())
                    }
                    Err(err) => self.fail(err),
                }
            }
        }
    }

    /// Suspend the source, keeping the cursor.  A no-op unless playing.
    pub fn pause(&mut self) -> Result<()> {
        if self.cursor.state != PlaybackState::Playing {
            return Ok(());
        }
        if let Some(source) = self.source.as_mut() {
            if let Err(err) = source.pause() {
                return self.fail(err);
            }
        }
        self.cursor.state = PlaybackState::Paused;
        self.cursor.seeked_while_paused = false;
        Ok(())
    }

    /// Release the source and rewind to the first word.  Always safe.
    pub fn stop(&mut self) {
        if let Some(source) = self.source.as_mut() {
            source.stop();
        }
        self.cursor = PlaybackCursor::default();
    }

    /// Move the cursor to `target` (clamped).  Rejected while playing.
    pub fn seek(&mut self, target: usize) -> Result<()> {
        if self.cursor.state == PlaybackState::Playing {
            return Err(ReaderError::InvalidOperation("cannot seek while playing"));
        }
        let Some(last) = self.document.word_count().checked_sub(1) else {
            return Ok(());
        };
        let target = target.min(last);
        self.cursor.word_index = target;
        self.cursor.paragraph_index = self.document.paragraph_of(target);
        if self.cursor.state == PlaybackState::Paused {
            self.cursor.seeked_while_paused = true;
        }
        Ok(())
    }

    /// Seek relative to the current word.
    pub fn seek_by(&mut self, delta: isize) -> Result<()> {
        let target = self.cursor.word_index.saturating_add_signed(delta);
        self.seek(target)
    }

    /// Feed a host event to the active source.  Returns whether the cursor
    /// moved.
    ///
    /// While paused only engine errors and the end of the current clip or
    /// utterance get through: an error stops playback, and an end makes the
    /// next `play` cold start at the following paragraph.
    pub fn handle(&mut self, event: SourceEvent) -> Result<bool> {
        let Some(source) = self.source.as_mut() else {
            tracing::debug!(?event, "event ignored, no audio prepared");
            return Ok(false);
        };
        match self.cursor.state {
            PlaybackState::Playing => match source.handle(&self.document, &event) {
                Some(cue) => self.apply(cue),
                None => Ok(false),
            },
            PlaybackState::Paused if matches!(event, SourceEvent::EngineError { .. }) => {
                match source.handle(&self.document, &event) {
                    Some(Cue::Failed(message)) => self.fail(ReaderError::Playback(message)),
                    _ => Ok(false),
                }
            }
            PlaybackState::Paused if source.finishes(&event) => {
                source.stop();
                Ok(self.advance_paragraph())
            }
            state => {
                tracing::debug!(?event, ?state, "event ignored");
                Ok(false)
            }
        }
    }

    /// Park the cursor on the paragraph after the current one, to be cold
    /// started by the next `play`.  Stops at the end of the document.  A
    /// seek made while paused wins.
    fn advance_paragraph(&mut self) -> bool {
        if self.cursor.seeked_while_paused {
            return false;
        }
        let next = self.cursor.paragraph_index + 1;
        if next >= self.document.paragraph_count() {
            tracing::debug!("document ended while paused");
            self.stop();
            return true;
        }
        tracing::debug!(paragraph = next, "paragraph ended while paused");
        let word = self.document.paragraph_start(next);
        let moved = word != self.cursor.word_index;
        self.cursor.paragraph_index = next;
        self.cursor.word_index = word;
        self.cursor.seeked_while_paused = true;
        moved
    }

    fn apply(&mut self, cue: Cue) -> Result<bool> {
        match cue {
            Cue::Position { paragraph, word } => {
                self.cursor.paragraph_index = paragraph;
                match word {
                    Some(w) if w != self.cursor.word_index => {
                        self.cursor.word_index = w;
                        Ok(true)
                    }
                    _ => Ok(false),
                }
            }
            Cue::Finished => {
                tracing::debug!("end of document");
                self.stop();
                Ok(true)
            }
            Cue::Failed(message) => self.fail(ReaderError::Playback(message)),
        }
    }

    fn fail<T>(&mut self, err: ReaderError) -> Result<T> {
        tracing::error!(error = %err, "playback failed, stopping");
        self.stop();
        Err(err)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
