//! # medireader
//!
//! Word-by-word (RSVP) reading of articles, kept in step with synthesized
//! speech.
//!
//! ## Quick start
//!
//! ```no_run
//! use medireader::{ClockOutput, ReaderConfig, ReaderSession, SourceEvent};
//!
//! # async fn run() -> anyhow::Result<()> {
//! let config = ReaderConfig::default().with_env();
//! let mut session = ReaderSession::new(config);
//! session.set_text("Primer párrafo del artículo.\n\nSegundo párrafo.");
//!
//! // Synthesize every paragraph (three requests in flight at most).
//! let clock = ClockOutput::new();
//! let summary = session
//!     .prepare_remote(clock.clone(), |p| eprintln!("{:.0}%", p.percent))
//!     .await?;
//! if let Some(notice) = summary.notice() {
//!     eprintln!("{}", notice);
//! }
//!
//! session.engine_mut().play()?;
//! // Call on every rendering frame:
//! session.engine_mut().handle(SourceEvent::Frame)?;
//! println!("{:?}", session.engine().window().current);
//! # Ok(())
//! # }
//! ```
//!
//! ## Pipeline
//! 1. **Cleaning** ([`clean`]): references, metadata, citations and
//!    markdown removed from the article.
//! 2. **Segmentation** ([`segment`]): words (trailing punctuation kept) and
//!    blank-line separated paragraphs.
//! 3. **Synthesis** ([`fetch`], [`prefetch`]): one clip per paragraph,
//!    fetched by a bounded worker pool with retries.
//! 4. **Timing** ([`timing`]): each clip apportioned across its words by
//!    length and punctuation.
//! 5. **Playback** ([`engine`]): a single cursor driven either by the audio
//!    clock (remote voice) or by speech-engine boundary events (local voice).

pub mod audio;
pub mod clean;
pub mod config;
pub mod engine;
pub mod error;
pub mod fetch;
pub mod prefetch;
pub mod present;
pub mod segment;
pub mod session;
pub mod synth;
pub mod timing;

// ─── Re-exports for convenience ─────────────────────────────────────────────

pub use config::ReaderConfig;
pub use engine::{
    ClockOutput, PlaybackCursor, PlaybackEngine, PlaybackState, SourceEvent, TimingSource,
};
pub use error::{ReaderError, Result};
pub use segment::Document;
pub use session::{PrepareSummary, ReaderSession};
