//! Word and paragraph segmentation.
//!
//! A *word* is a run of letters, digits, apostrophes and hyphens (accented
//! letters and `ñ` included, since `\w` is Unicode-aware) optionally followed
//! by one punctuation mark.  The trailing mark stays attached to the token:
//! it is shown on screen and it lengthens the word's estimated duration.
//!
//! Paragraphs are separated by one or more blank lines; paragraphs made only
//! of whitespace are dropped.

use once_cell::sync::Lazy;
use regex::Regex;

// ─────────────────────────────────────────────────────────────────────────────
// Patterns
// ─────────────────────────────────────────────────────────────────────────────

static RE_WORD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"[\w'-]+[.,;!?¿¡:"()\[\]{}]?"#).unwrap());

static RE_PARAGRAPH_BREAK: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n\s*\n").unwrap());

/// Extract the display words of `text`, in order.
pub fn words_in(text: &str) -> Vec<String> {
    RE_WORD.find_iter(text).map(|m| m.as_str().to_string()).collect()
}

/// Number of words that start before byte offset `end` of `text`.
///
/// Used to turn a speech-engine boundary offset back into a word offset.
pub fn count_words_before(text: &str, end: usize) -> usize {
    let mut end = end.min(text.len());
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    RE_WORD.find_iter(&text[..end]).count()
}

/// Split `text` into non-empty paragraphs.
pub fn split_paragraphs(text: &str) -> Vec<String> {
    RE_PARAGRAPH_BREAK
        .split(text)
        .filter(|p| !p.trim().is_empty())
        .map(str::to_string)
        .collect()
}

// ─────────────────────────────────────────────────────────────────────────────
// Document
// ─────────────────────────────────────────────────────────────────────────────

/// Segmented text of one submission.
///
/// `paragraph_starts[i]` is the global index of paragraph `i`'s first word
/// (the number of words in all earlier paragraphs).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Document {
    words: Vec<String>,
    paragraphs: Vec<String>,
    paragraph_starts: Vec<usize>,
    paragraph_lens: Vec<usize>,
}

impl Document {
    /// Segment `text`.  Deterministic: the same input always yields the same
    /// document.
    pub fn segment(text: &str) -> Self {
        let paragraphs = split_paragraphs(text);
        let mut words = Vec::new();
        let mut paragraph_starts = Vec::with_capacity(paragraphs.len());
        let mut paragraph_lens = Vec::with_capacity(paragraphs.len());

        for paragraph in &paragraphs {
            let found = words_in(paragraph);
            paragraph_starts.push(words.len());
            paragraph_lens.push(found.len());
            words.extend(found);
        }

        Self { words, paragraphs, paragraph_starts, paragraph_lens }
    }

    pub fn words(&self) -> &[String] {
        &self.words
    }

    pub fn paragraphs(&self) -> &[String] {
        &self.paragraphs
    }

    pub fn paragraph_starts(&self) -> &[usize] {
        &self.paragraph_starts
    }

    pub fn word_count(&self) -> usize {
        self.words.len()
    }

    pub fn paragraph_count(&self) -> usize {
        self.paragraphs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn word(&self, index: usize) -> Option<&str> {
        self.words.get(index).map(String::as_str)
    }

    /// Global index of the first word of `paragraph` (0 when out of range).
    pub fn paragraph_start(&self, paragraph: usize) -> usize {
        self.paragraph_starts.get(paragraph).copied().unwrap_or(0)
    }

    /// Words belonging to `paragraph`; empty when out of range.
    pub fn paragraph_words(&self, paragraph: usize) -> &[String] {
        match (self.paragraph_starts.get(paragraph), self.paragraph_lens.get(paragraph)) {
            (Some(&start), Some(&len)) => &self.words[start..start + len],
            _ => &[],
        }
    }

    /// Paragraph containing `word_index`: the one with the greatest start
    /// index that is `<= word_index`.
    pub fn paragraph_of(&self, word_index: usize) -> usize {
        self.paragraph_starts
            .partition_point(|&start| start <= word_index)
            .saturating_sub(1)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
