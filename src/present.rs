//! Presentation helpers: pure functions of cursor state, plus the mapping of
//! user input onto engine operations.

use std::fmt;

use crate::engine::{PlaybackEngine, PlaybackState};
use crate::error::Result;

// ─────────────────────────────────────────────────────────────────────────────
// RSVP view
// ─────────────────────────────────────────────────────────────────────────────

/// A word split around its focal (optimal recognition) letter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FocalSplit<'a> {
    pub prefix: &'a str,
    pub focal: &'a str,
    pub suffix: &'a str,
}

/// Focal letter position, in characters.
pub fn pivot(len: usize) -> usize {
    let pivot = match len {
        0 | 1 => 1,
        2..=7 => len / 4,
        _ => len * 35 / 100,
    };
    pivot.min(len.saturating_sub(1))
}

pub fn focal_split(word: &str) -> FocalSplit<'_> {
    let p = pivot(word.chars().count());
    let mut bounds = word.char_indices().map(|(i, _)| i).skip(p);
    let start = bounds.next().unwrap_or(word.len());
    let end = bounds.next().unwrap_or(word.len());
    FocalSplit { prefix: &word[..start], focal: &word[start..end], suffix: &word[end..] }
}

// ─────────────────────────────────────────────────────────────────────────────
// Full-text view
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span<'a> {
    pub index: usize,
    pub text: &'a str,
    pub current: bool,
}

/// Words of `words[range]` with the current one marked.
pub fn spans<'a>(
    words: &'a [String],
    current: usize,
    range: std::ops::Range<usize>,
) -> impl Iterator<Item = Span<'a>> + 'a {
    let end = range.end.min(words.len());
    let start = range.start.min(end);
    words[start..end].iter().enumerate().map(move |(i, text)| Span {
        index: start + i,
        text: text.as_str(),
        current: start + i == current,
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Progress bar
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReadingProgress {
    pub percent: f64,
    pub minutes: usize,
    pub seconds: usize,
}

pub fn reading_progress(current: usize, total: usize, wpm: u32) -> ReadingProgress {
    let wpm = wpm as usize;
    let remaining = total.saturating_sub(current);
    let percent = if total > 0 { current as f64 / total as f64 * 100.0 } else { 0.0 };
    let (minutes, seconds) = if wpm > 0 {
        (remaining / wpm, (remaining % wpm) * 60 / wpm)
    } else {
        (0, 0)
    };
    ReadingProgress { percent, minutes, seconds }
}

impl fmt::Display for ReadingProgress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}m {:02}s", self.minutes, self.seconds)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Controls
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Space,
    Escape,
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    TogglePlay,
    Stop,
    SeekBy(isize),
}

/// Words skipped by an arrow key with Shift held.
const LONG_STEP: isize = 10;

/// The control a key press maps to.  Arrows do nothing while playing.
pub fn control_for(key: Key, shift: bool, state: PlaybackState) -> Option<Control> {
    let step = if shift { LONG_STEP } else { 1 };
    match key {
        Key::Space => Some(Control::TogglePlay),
        Key::Escape => Some(Control::Stop),
        _ if state == PlaybackState::Playing => None,
        Key::Right => Some(Control::SeekBy(step)),
        Key::Left => Some(Control::SeekBy(-step)),
    }
}

pub fn apply(engine: &mut PlaybackEngine, control: Control) -> Result<()> {
    match control {
        Control::TogglePlay if engine.state() == PlaybackState::Playing => engine.pause(),
        Control::TogglePlay => engine.play(),
        Control::Stop => {
            engine.stop();
            Ok(())
        }
        Control::SeekBy(delta) => engine.seek_by(delta),
    }
}

/// Seek to a clicked word.  Clicks are ignored while playing.
pub fn click_word(engine: &mut PlaybackEngine, index: usize) -> Result<bool> {
    if engine.state() == PlaybackState::Playing {
        return Ok(false);
    }
    engine.seek(index)?;
    Ok(true)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
