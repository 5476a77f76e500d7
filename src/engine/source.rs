//! The interface between the engine and whatever tells it where speech is.

use crate::error::Result;
use crate::segment::Document;

/// Something that happened outside the engine.
///
/// Hosts forward animation-frame ticks, audio end notifications and speech
/// engine callbacks as these events.  Ids let a source recognise callbacks
/// from clips or utterances it has already canceled.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceEvent {
    /// A rendering frame; time to resynchronise against the audio clock.
    Frame,
    /// An audio clip played to its natural end.
    ClipEnded { clip: u64 },
    /// The speech engine reached `char_index` (in characters) of the
    /// utterance text.
    Boundary { utterance: u64, char_index: usize },
    UtteranceEnded { utterance: u64 },
    EngineError { utterance: u64, code: String },
}

/// What a source wants the engine to do after an event.
#[derive(Debug, Clone, PartialEq)]
pub enum Cue {
    /// Speech is in `paragraph`, at global word `word` when known.
    Position { paragraph: usize, word: Option<usize> },
    /// Past the last paragraph.
    Finished,
    /// Unrecoverable source failure; the engine stops.
    Failed(String),
}

/// A timing source: drives speech and maps its progress onto word indices.
///
/// The engine only ever talks to this trait, so both voices share one state
/// machine.
pub trait TimingSource: Send {
    /// Cold start at `word_in_paragraph` of `paragraph`, canceling anything
    /// in flight.  Paragraphs that can't be played from that point are
    /// skipped; the returned cue says where speech actually starts.
    fn start(&mut self, doc: &Document, paragraph: usize, word_in_paragraph: usize) -> Result<Cue>;

    fn pause(&mut self) -> Result<()>;

    /// Continue in place after [`TimingSource::pause`].
    fn resume(&mut self) -> Result<()>;

    /// Release the underlying audio.  Safe to call repeatedly.
    fn stop(&mut self);

    /// React to an event.  `None` means nothing changed.
    fn handle(&mut self, doc: &Document, event: &SourceEvent) -> Option<Cue>;

    /// Whether `event` is the natural end of the current clip or utterance.
    fn finishes(&self, event: &SourceEvent) -> bool;
}
