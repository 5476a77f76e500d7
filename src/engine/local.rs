//! Local voice: a speech engine that reports its own progress.
//!
//! Each paragraph is spoken as one utterance starting at the cursor word.
//! Boundary callbacks carry a character offset into that utterance, which is
//! mapped back to a global word index by counting the words before it.

use crate::error::{ReaderError, Result};
use crate::segment::{count_words_before, Document};

use super::source::{Cue, SourceEvent, TimingSource};

/// Error codes the engine reports for our own cancel/restart calls.
const CANCELLATION_CODES: &[&str] = &["interrupted", "canceled"];

/// Speaking rate at which the engine reads 180 words per minute.
const BASE_WPM: f32 = 180.0;

/// A platform speech engine.
pub trait SpeechEngine: Send {
    /// Begin speaking `text`, replacing any current utterance.  The returned
    /// id tags this utterance's boundary, end and error events.
    fn speak(&mut self, text: &str, rate: f32) -> anyhow::Result<u64>;
    fn pause(&mut self) -> anyhow::Result<()>;
    fn resume(&mut self) -> anyhow::Result<()>;
    fn cancel(&mut self);
}

/// Engine speaking rate for a reading speed.
pub fn rate_for_wpm(wpm: u32) -> f32 {
    wpm as f32 / BASE_WPM
}

#[derive(Debug)]
struct Utterance {
    id: u64,
    paragraph: usize,
    /// Position of the utterance's first word inside the paragraph.
    slice_start: usize,
    text: String,
}

/// [`TimingSource`] over a [`SpeechEngine`].
pub struct LocalVoice<E> {
    engine: E,
    rate: f32,
    current: Option<Utterance>,
}

impl<E: SpeechEngine> LocalVoice<E> {
    pub fn new(engine: E, wpm: u32) -> Self {
        Self { engine, rate: rate_for_wpm(wpm), current: None }
    }

    fn speak_from(&mut self, doc: &Document, paragraph: usize, word_in_paragraph: usize) -> Result<Cue> {
        let mut paragraph = paragraph;
        let mut word = word_in_paragraph;

        loop {
            if paragraph >= doc.paragraph_count() {
                return Ok(Cue::Finished);
            }
            let words = doc.paragraph_words(paragraph);
            if word < words.len() {
                let text = words[word..].join(" ");
                let id = self
                    .engine
                    .speak(&text, self.rate)
                    .map_err(|e| ReaderError::Playback(format!("{:#}", e)))?;
                tracing::debug!(paragraph, word, utterance = id, "speaking paragraph");
                self.current = Some(Utterance { id, paragraph, slice_start: word, text });
                return Ok(Cue::Position {
                    paragraph,
                    word: Some(doc.paragraph_start(paragraph) + word),
                });
            }
            tracing::debug!(paragraph, word, "nothing left to speak in paragraph");
            paragraph += 1;
            word = 0;
        }
    }

    fn current_is(&self, utterance: u64) -> Option<&Utterance> {
        self.current.as_ref().filter(|u| u.id == utterance)
    }
}

/// Byte offset of the `chars`-th character of `text`.
fn byte_offset(text: &str, chars: usize) -> usize {
    text.char_indices().nth(chars).map_or(text.len(), |(i, _)| i)
}

impl<E: SpeechEngine> TimingSource for LocalVoice<E> {
    fn start(&mut self, doc: &Document, paragraph: usize, word_in_paragraph: usize) -> Result<Cue> {
        self.stop();
        self.speak_from(doc, paragraph, word_in_paragraph)
    }

    fn pause(&mut self) -> Result<()> {
        self.engine
            .pause()
            .map_err(|e| ReaderError::Playback(format!("{:#}", e)))
    }

    fn resume(&mut self) -> Result<()> {
        self.engine
            .resume()
            .map_err(|e| ReaderError::Playback(format!("{:#}", e)))
    }

    fn stop(&mut self) {
        if self.current.take().is_some() {
            self.engine.cancel();
        }
    }

    fn handle(&mut self, doc: &Document, event: &SourceEvent) -> Option<Cue> {
        match event {
            SourceEvent::Boundary { utterance, char_index } => {
                let u = self.current_is(*utterance)?;
                let before = count_words_before(&u.text, byte_offset(&u.text, *char_index));
                let words = doc.paragraph_words(u.paragraph).len();
                let in_paragraph = (u.slice_start + before).min(words.saturating_sub(1));
                Some(Cue::Position {
                    paragraph: u.paragraph,
                    word: Some(doc.paragraph_start(u.paragraph) + in_paragraph),
                })
            }
            SourceEvent::UtteranceEnded { utterance } => {
                let next = self.current_is(*utterance)?.paragraph + 1;
                self.current = None;
                Some(
                    self.speak_from(doc, next, 0)
                        .unwrap_or_else(|e| Cue::Failed(e.to_string())),
                )
            }
            SourceEvent::EngineError { utterance, code } => {
                if CANCELLATION_CODES.contains(&code.as_str()) {
                    tracing::debug!(utterance, code = %code, "ignoring self-induced cancellation");
                    return None;
                }
                if self.current_is(*utterance).is_none() {
                    tracing::warn!(utterance, code = %code, "error from stale utterance");
                    return None;
                }
                self.current = None;
                tracing::error!(utterance, code = %code, "speech engine failed");
                Some(Cue::Failed(format!("speech engine error: {}", code)))
            }
            _ => None,
        }
    }

    fn finishes(&self, event: &SourceEvent) -> bool {
        match event {
            SourceEvent::UtteranceEnded { utterance } => self.current_is(*utterance).is_some(),
            _ => false,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::testing::RecordingEngine;

    const TEXT: &str = "Uno dos tres cuatro\n\nniño está sano";

    fn boundary(utterance: u64, char_index: usize) -> SourceEvent {
        SourceEvent::Boundary { utterance, char_index }
    }

    #[test]
    fn test_rate_for_wpm() {
        assert_eq!(rate_for_wpm(180), 1.0);
        assert_eq!(rate_for_wpm(360), 2.0);
    }

    #[test]
    fn test_slice_starts_at_word() {
        let doc = Document::segment(TEXT);
        let engine = RecordingEngine::new();
        let mut v = LocalVoice::new(engine.clone(), 350);
        let cue = v.start(&doc, 0, 2).unwrap();
        assert_eq!(cue, Cue::Position { paragraph: 0, word: Some(2) });
        assert_eq!(engine.last().text, "tres cuatro");
    }

    #[test]
    fn test_boundary_offset_by_slice() {
        let doc = Document::segment(TEXT);
        let engine = RecordingEngine::new();
        let mut v = LocalVoice::new(engine.clone(), 350);
        v.start(&doc, 0, 2).unwrap();
        let id = engine.last().id;
        // "tres cuatro": char 5 is the start of "cuatro".
        assert_eq!(v.handle(&doc, &boundary(id, 0)), Some(Cue::Position { paragraph: 0, word: Some(2) }));
        assert_eq!(v.handle(&doc, &boundary(id, 5)), Some(Cue::Position { paragraph: 0, word: Some(3) }));
        // Offsets past the text clamp to the paragraph's last word.
        assert_eq!(v.handle(&doc, &boundary(id, 90)), Some(Cue::Position { paragraph: 0, word: Some(3) }));
    }

    #[test]
    fn test_boundary_counts_characters_not_bytes() {
        let doc = Document::segment(TEXT);
        let engine = RecordingEngine::new();
        let mut v = LocalVoice::new(engine.clone(), 350);
        v.start(&doc, 1, 0).unwrap();
        let id = engine.last().id;
        // "niño está sano": "está" starts at char 5 (byte 6), "sano" at char 10.
        assert_eq!(v.handle(&doc, &boundary(id, 5)), Some(Cue::Position { paragraph: 1, word: Some(5) }));
        assert_eq!(v.handle(&doc, &boundary(id, 10)), Some(Cue::Position { paragraph: 1, word: Some(6) }));
    }

    #[test]
    fn test_utterance_end_chains_next_paragraph() {
        let doc = Document::segment(TEXT);
        let engine = RecordingEngine::new();
        let mut v = LocalVoice::new(engine.clone(), 350);
        v.start(&doc, 0, 0).unwrap();
        let first = engine.last().id;
        let cue = v.handle(&doc, &SourceEvent::UtteranceEnded { utterance: first });
        assert_eq!(cue, Some(Cue::Position { paragraph: 1, word: Some(4) }));
        assert_eq!(engine.last().text, "niño está sano");

        let second = engine.last().id;
        let cue = v.handle(&doc, &SourceEvent::UtteranceEnded { utterance: second });
        assert_eq!(cue, Some(Cue::Finished));
    }

    #[test]
    fn test_start_at_paragraph_end_falls_through() {
        let doc = Document::segment(TEXT);
        let engine = RecordingEngine::new();
        let mut v = LocalVoice::new(engine.clone(), 350);
        let cue = v.start(&doc, 0, 4).unwrap();
        assert_eq!(cue, Cue::Position { paragraph: 1, word: Some(4) });
        assert_eq!(engine.spoken().len(), 1);
    }

    #[test]
    fn test_stale_events_ignored() {
        let doc = Document::segment(TEXT);
        let engine = RecordingEngine::new();
        let mut v = LocalVoice::new(engine.clone(), 350);
        v.start(&doc, 0, 0).unwrap();
        let old = engine.last().id;
        v.start(&doc, 0, 1).unwrap();
        assert_eq!(engine.cancels(), 1);
        assert_eq!(v.handle(&doc, &boundary(old, 4)), None);
        assert_eq!(v.handle(&doc, &SourceEvent::UtteranceEnded { utterance: old }), None);
        let err = SourceEvent::EngineError { utterance: old, code: "audio-busy".into() };
        assert_eq!(v.handle(&doc, &err), None);
    }

    #[test]
    fn test_cancellation_codes_ignored() {
        let doc = Document::segment(TEXT);
        let engine = RecordingEngine::new();
        let mut v = LocalVoice::new(engine.clone(), 350);
        v.start(&doc, 0, 0).unwrap();
        let id = engine.last().id;
        for code in ["interrupted", "canceled"] {
            let err = SourceEvent::EngineError { utterance: id, code: code.into() };
            assert_eq!(v.handle(&doc, &err), None);
        }
        let err = SourceEvent::EngineError { utterance: id, code: "synthesis-failed".into() };
        assert!(matches!(v.handle(&doc, &err), Some(Cue::Failed(_))));
    }
}
