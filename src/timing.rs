//! Per-word timing estimates inside one paragraph's audio clip.
//!
//! The synthesis service returns audio without word alignment, so each word
//! gets a share of the clip proportional to a weight:
//!
//! ```text
//! weight = chars(word) + 2 (+ 3 when the word ends in . , ; ! ? :)
//! ```
//!
//! Intervals are contiguous and half-open; the last one always ends exactly at
//! the clip duration so rounding never leaves a gap at the end of the clip.

/// Base weight added to every word.
const BASE_WEIGHT: usize = 2;

/// Extra weight for a word ending in a pause mark.
const PAUSE_WEIGHT: usize = 3;

const PAUSE_MARKS: &[char] = &['.', ',', ';', '!', '?', ':'];

/// Estimated `[start, end)` interval of one word, in seconds from the start of
/// its paragraph's clip.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WordTiming {
    /// Position of the word inside its paragraph.
    pub word_in_paragraph: usize,
    pub start: f64,
    pub end: f64,
}

impl WordTiming {
    pub fn contains(&self, t: f64) -> bool {
        t >= self.start && t < self.end
    }
}

/// Relative duration weight of `word`.
pub fn word_weight(word: &str) -> usize {
    let pause = if word.ends_with(PAUSE_MARKS) { PAUSE_WEIGHT } else { 0 };
    word.chars().count() + BASE_WEIGHT + pause
}

/// Apportion `clip_duration` seconds across `words`.
///
/// Returns an empty vector when there is nothing to apportion.
pub fn estimate<S: AsRef<str>>(words: &[S], clip_duration: f64) -> Vec<WordTiming> {
    let weights: Vec<usize> = words.iter().map(|w| word_weight(w.as_ref())).collect();
    let total: usize = weights.iter().sum();
    if total == 0 {
        return Vec::new();
    }

    let last = weights.len() - 1;
    let mut elapsed = 0.0;
    weights
        .iter()
        .enumerate()
        .map(|(i, &weight)| {
            let start = elapsed;
            elapsed += weight as f64 / total as f64 * clip_duration;
            let end = if i == last { clip_duration } else { elapsed };
            WordTiming { word_in_paragraph: i, start, end }
        })
        .collect()
}

/// Index of the timing whose interval contains `elapsed`.
///
/// Timings are sorted and non-overlapping, so this is a binary search.
pub fn locate(timings: &[WordTiming], elapsed: f64) -> Option<usize> {
    let i = timings.partition_point(|t| t.end <= elapsed);
    timings.get(i).filter(|t| t.contains(elapsed)).map(|_| i)
}

/// Start offset of `word_in_paragraph`, if the paragraph has that many words.
pub fn offset_of(timings: &[WordTiming], word_in_paragraph: usize) -> Option<f64> {
    timings.get(word_in_paragraph).map(|t| t.start)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_partition(timings: &[WordTiming], duration: f64) {
        assert_eq!(timings[0].start, 0.0);
        for pair in timings.windows(2) {
            assert_eq!(pair[0].end, pair[1].start, "gap or overlap in {:?}", pair);
            assert!(pair[0].start <= pair[0].end);
        }
        assert_eq!(timings.last().unwrap().end, duration);
    }

    #[test]
    fn test_weights() {
        assert_eq!(word_weight("Uno"), 5);
        assert_eq!(word_weight("dos."), 9);
        assert_eq!(word_weight("tres"), 6);
        assert_eq!(word_weight("niño"), 6);
        // Only the listed marks count as pauses.
        assert_eq!(word_weight("(dos)"), 7);
    }

    #[test]
    fn test_weight_monotonicity() {
        for word in ["a", "tres", "presión", "cardiovascular"] {
            for mark in PAUSE_MARKS {
                let punctuated = format!("{}{}", word, mark);
                assert_eq!(word_weight(&punctuated), word_weight(word) + 1 + PAUSE_WEIGHT);
            }
        }
        assert!(word_weight("largo") >= word_weight("corto"));
        assert!(word_weight("larguísimo") > word_weight("corto"));
    }

    #[test]
    fn test_estimate_example() {
        let t = estimate(&["Uno", "dos.", "tres"], 3.0);
        assert_eq!(t.len(), 3);
        assert!((t[1].start - 0.75).abs() < 1e-9);
        assert!((t[2].start - 2.1).abs() < 1e-9);
        assert_partition(&t, 3.0);
    }

    #[test]
    fn test_last_end_is_exact() {
        // Durations that don't divide evenly still end exactly on the clip.
        let words: Vec<String> = (0..97).map(|i| format!("palabra{}", i % 7)).collect();
        for duration in [0.1, 1.0 / 3.0, 7.77, 123.456789] {
            let t = estimate(&words, duration);
            assert_partition(&t, duration);
        }
    }

    #[test]
    fn test_estimate_empty() {
        let none: [&str; 0] = [];
        assert!(estimate(&none, 2.0).is_empty());
    }

    #[test]
    fn test_locate() {
        let t = estimate(&["Uno", "dos.", "tres"], 3.0);
        assert_eq!(locate(&t, 0.0), Some(0));
        assert_eq!(locate(&t, 0.74), Some(0));
        assert_eq!(locate(&t, 0.75), Some(1));
        assert_eq!(locate(&t, 2.5), Some(2));
        assert_eq!(locate(&t, 3.0), None);
        assert_eq!(locate(&t, -0.1), None);
        assert_eq!(locate(&[], 1.0), None);
    }

    #[test]
    fn test_offset_of() {
        let t = estimate(&["Uno", "dos.", "tres"], 3.0);
        assert_eq!(offset_of(&t, 0), Some(0.0));
        assert!((offset_of(&t, 1).unwrap() - 0.75).abs() < 1e-9);
        assert_eq!(offset_of(&t, 3), None);
    }
}
