//! Remote voice: prepared per-paragraph clips played against an audio clock.
//!
//! The current word is found by reading the output clock on every frame and
//! looking the elapsed clip time up in the paragraph's estimated timings.

use std::sync::Arc;

use crate::audio::AudioClip;
use crate::error::{ReaderError, Result};
use crate::fetch::AudioItem;
use crate::segment::Document;
use crate::timing;

use super::source::{Cue, SourceEvent, TimingSource};

/// An audio device with its own clock.
///
/// The clock must stand still while suspended, so that a clip resumed in
/// place keeps its original start time.
pub trait AudioOutput: Send {
    /// Current clock reading in seconds.
    fn now(&self) -> f64;

    /// Start `clip` at `offset` seconds, replacing anything playing.
    /// Returns an id that the matching [`SourceEvent::ClipEnded`] will carry.
    fn play(&mut self, clip: &AudioClip, offset: f64) -> anyhow::Result<u64>;

    fn suspend(&mut self) -> anyhow::Result<()>;
    fn resume(&mut self) -> anyhow::Result<()>;
    fn stop(&mut self);

    fn playback_rate(&self) -> f64 {
        1.0
    }
}

#[derive(Debug, Clone, Copy)]
struct Playing {
    paragraph: usize,
    clip: u64,
    /// Clip offset the clip was started at.
    offset: f64,
    /// Clock reading when it was started.
    played_at: f64,
}

/// [`TimingSource`] over prepared audio.  `None` items are paragraphs whose
/// synthesis failed; they are skipped without a cursor update.
pub struct RemoteVoice<O> {
    output: O,
    items: Arc<[Option<AudioItem>]>,
    playing: Option<Playing>,
}

impl<O: AudioOutput> RemoteVoice<O> {
    pub fn new(output: O, items: Arc<[Option<AudioItem>]>) -> Self {
        Self { output, items, playing: None }
    }

    fn play_from(&mut self, doc: &Document, paragraph: usize, word_in_paragraph: usize) -> Result<Cue> {
        let mut paragraph = paragraph;
        let mut word = word_in_paragraph;
        let items = Arc::clone(&self.items);
        let last = items.len().min(doc.paragraph_count());

        loop {
            if paragraph >= last {
                return Ok(Cue::Finished);
            }
            match &items[paragraph] {
                None => tracing::debug!(paragraph, "no audio for paragraph, skipping"),
                // A paragraph without words still has audio; it plays whole.
                Some(item) if item.timings.is_empty() && word == 0 => {
                    self.play_clip(paragraph, &item.clip, 0.0)?;
                    return Ok(Cue::Position { paragraph, word: None });
                }
                Some(item) => match timing::offset_of(&item.timings, word) {
                    Some(offset) => {
                        self.play_clip(paragraph, &item.clip, offset)?;
                        return Ok(Cue::Position {
                            paragraph,
                            word: Some(doc.paragraph_start(paragraph) + word),
                        });
                    }
                    None => tracing::debug!(paragraph, word, "start word past paragraph end"),
                },
            }
            paragraph += 1;
            word = 0;
        }
    }

    fn play_clip(&mut self, paragraph: usize, clip: &AudioClip, offset: f64) -> Result<()> {
        let id = self
            .output
            .play(clip, offset)
            .map_err(|e| ReaderError::Playback(format!("{:#}", e)))?;
        self.playing = Some(Playing { paragraph, clip: id, offset, played_at: self.output.now() });
        tracing::debug!(paragraph, offset, clip = id, "playing paragraph clip");
        Ok(())
    }

    fn sync(&self, doc: &Document, playing: Playing) -> Option<Cue> {
        let item = self.items.get(playing.paragraph)?.as_ref()?;
        // Measured from the start offset so the first frame lands exactly on
        // the start word.
        let elapsed =
            playing.offset + (self.output.now() - playing.played_at) * self.output.playback_rate();
        let i = timing::locate(&item.timings, elapsed)?;
        Some(Cue::Position {
            paragraph: playing.paragraph,
            word: Some(doc.paragraph_start(playing.paragraph) + i),
        })
    }
}

impl<O: AudioOutput> TimingSource for RemoteVoice<O> {
    fn start(&mut self, doc: &Document, paragraph: usize, word_in_paragraph: usize) -> Result<Cue> {
        self.stop();
        self.play_from(doc, paragraph, word_in_paragraph)
    }

    fn pause(&mut self) -> Result<()> {
        self.output
            .suspend()
            .map_err(|e| ReaderError::Playback(format!("{:#}", e)))
    }

    fn resume(&mut self) -> Result<()> {
        self.output
            .resume()
            .map_err(|e| ReaderError::Playback(format!("{:#}", e)))
    }

    fn stop(&mut self) {
        if self.playing.take().is_some() {
            self.output.stop();
        }
    }

    fn handle(&mut self, doc: &Document, event: &SourceEvent) -> Option<Cue> {
        let playing = self.playing?;
        match *event {
            SourceEvent::Frame => self.sync(doc, playing),
            SourceEvent::ClipEnded { clip } if clip == playing.clip => {
                self.playing = None;
                Some(
                    self.play_from(doc, playing.paragraph + 1, 0)
                        .unwrap_or_else(|e| Cue::Failed(e.to_string())),
                )
            }
            SourceEvent::ClipEnded { clip } => {
                tracing::debug!(clip, current = playing.clip, "ignoring end of stale clip");
                None
            }
            _ => None,
        }
    }

    fn finishes(&self, event: &SourceEvent) -> bool {
        matches!((event, self.playing), (SourceEvent::ClipEnded { clip }, Some(p)) if *clip == p.clip)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::testing::{clip_item, ManualOutput};

    fn doc() -> Document {
        Document::segment("Uno dos. tres\n\nCuatro cinco")
    }

    fn voice(output: &ManualOutput) -> RemoteVoice<ManualOutput> {
        let d = doc();
        let items: Arc<[Option<AudioItem>]> = Arc::new([
            Some(clip_item(d.paragraph_words(0), 3.0)),
            Some(clip_item(d.paragraph_words(1), 2.0)),
        ]);
        RemoteVoice::new(output.clone(), items)
    }

    #[test]
    fn test_start_uses_word_offset() {
        let out = ManualOutput::new();
        let mut v = voice(&out);
        let cue = v.start(&doc(), 0, 1).unwrap();
        assert_eq!(cue, Cue::Position { paragraph: 0, word: Some(1) });
        assert!((out.plays()[0].offset - 0.75).abs() < 1e-9);
    }

    #[test]
    fn test_frame_locates_word() {
        let out = ManualOutput::new();
        let mut v = voice(&out);
        let d = doc();
        v.start(&d, 0, 0).unwrap();
        out.advance(2.2);
        assert_eq!(v.handle(&d, &SourceEvent::Frame), Some(Cue::Position { paragraph: 0, word: Some(2) }));
    }

    #[test]
    fn test_playback_rate_scales_elapsed() {
        let out = ManualOutput::new();
        out.set_rate(2.0);
        let mut v = voice(&out);
        let d = doc();
        v.start(&d, 0, 1).unwrap();
        // 0.75s into the clip, plus 0.7s of clock at double speed = 2.15s.
        out.advance(0.7);
        assert_eq!(v.handle(&d, &SourceEvent::Frame), Some(Cue::Position { paragraph: 0, word: Some(2) }));
    }

    #[test]
    fn test_stale_clip_end_ignored() {
        let out = ManualOutput::new();
        let mut v = voice(&out);
        let d = doc();
        v.start(&d, 0, 0).unwrap();
        let old = out.plays()[0].id;
        v.start(&d, 0, 2).unwrap();
        assert_eq!(v.handle(&d, &SourceEvent::ClipEnded { clip: old }), None);
        assert_eq!(out.plays().len(), 2);
    }

    #[test]
    fn test_start_past_end_is_finished() {
        let out = ManualOutput::new();
        let mut v = voice(&out);
        assert_eq!(v.start(&doc(), 2, 0).unwrap(), Cue::Finished);
        assert!(out.plays().is_empty());
    }

    #[test]
    fn test_stop_is_guarded() {
        let out = ManualOutput::new();
        let mut v = voice(&out);
        v.stop();
        assert_eq!(out.stops(), 0);
        v.start(&doc(), 0, 0).unwrap();
        v.stop();
        v.stop();
        assert_eq!(out.stops(), 1);
        assert_eq!(v.handle(&doc(), &SourceEvent::Frame), None);
    }

    #[test]
    fn test_first_frame_after_late_cold_start_keeps_word() {
        let d = doc();
        for k in 1..200 {
            let out = ManualOutput::new();
            out.advance((k as f64 * 0.1234567891).sqrt() * 97.3);
            let mut v = voice(&out);
            v.start(&d, 1, 1).unwrap();
            assert_eq!(
                v.handle(&d, &SourceEvent::Frame),
                Some(Cue::Position { paragraph: 1, word: Some(4) }),
                "clock at {}",
                out.now()
            );
        }
    }

    #[test]
    fn test_wordless_paragraph_plays_whole_clip() {
        let d = Document::segment("Uno dos\n\n***\n\nTres");
        assert_eq!(d.paragraph_words(1).len(), 0);
        let out = ManualOutput::new();
        let items: Arc<[Option<AudioItem>]> = Arc::new([
            Some(clip_item(d.paragraph_words(0), 1.0)),
            Some(clip_item(d.paragraph_words(1), 0.5)),
            Some(clip_item(d.paragraph_words(2), 1.0)),
        ]);
        let mut v = RemoteVoice::new(out.clone(), items);
        v.start(&d, 0, 0).unwrap();

        let cue = v.handle(&d, &SourceEvent::ClipEnded { clip: out.last_id() });
        assert_eq!(cue, Some(Cue::Position { paragraph: 1, word: None }));
        assert_eq!(out.plays()[1].offset, 0.0);
        out.advance(0.2);
        assert_eq!(v.handle(&d, &SourceEvent::Frame), None);

        let cue = v.handle(&d, &SourceEvent::ClipEnded { clip: out.last_id() });
        assert_eq!(cue, Some(Cue::Position { paragraph: 2, word: Some(2) }));
    }

    #[test]
    fn test_finishes_only_current_clip() {
        let out = ManualOutput::new();
        let mut v = voice(&out);
        let d = doc();
        assert!(!v.finishes(&SourceEvent::ClipEnded { clip: 100 }));
        v.start(&d, 0, 0).unwrap();
        let old = out.last_id();
        v.start(&d, 0, 1).unwrap();
        assert!(!v.finishes(&SourceEvent::ClipEnded { clip: old }));
        assert!(v.finishes(&SourceEvent::ClipEnded { clip: out.last_id() }));
        assert!(!v.finishes(&SourceEvent::Frame));
    }

    #[test]
    fn test_output_failure_is_playback_error() {
        let out = ManualOutput::new();
        out.fail_next_play();
        let mut v = voice(&out);
        assert!(matches!(v.start(&doc(), 0, 0), Err(ReaderError::Playback(_))));
    }
}
