//! Error taxonomy shared by the scheduler, the engine and the session.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ReaderError>;

#[derive(Debug, Error)]
pub enum ReaderError {
    /// Remote voice requested without a credential; raised before any request.
    #[error("no API key configured for the remote voice")]
    MissingCredential,

    /// Transport or service failure for a single synthesis call.
    #[error("speech synthesis failed: {0}")]
    Synthesis(String),

    /// Every paragraph of a batch failed.
    #[error("audio processing failed for all {total} paragraph(s)")]
    BatchFailed { total: usize },

    #[error("process audio before playing")]
    NotReady,

    #[error("invalid operation: {0}")]
    InvalidOperation(&'static str),

    /// Audio output or speech engine failure; playback has been stopped.
    #[error("playback error: {0}")]
    Playback(String),

    #[error("document has no words")]
    EmptyDocument,
}

impl From<reqwest::Error> for ReaderError {
    fn from(err: reqwest::Error) -> Self {
        Self::Synthesis(err.to_string())
    }
}
