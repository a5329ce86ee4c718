//! Transcript Fallback - fetch YouTube transcripts through an ordered chain of strategies
//!
//! The [`orchestrator`] tries the official captions API, then unofficial caption
//! tracks, then AWS Transcribe on the downloaded audio, stopping at the first
//! success and recording why every earlier tier did not produce a transcript.

pub mod cli;
pub mod config;
pub mod orchestrator;
pub mod output;
pub mod strategies;
pub mod transcribe;
pub mod utils;

pub use cli::{Cli, Commands, OutputFormat};
pub use config::Config;
pub use orchestrator::{
    ContentId, Credentials, DiagnosticEntry, DurationLookup, DurationPolicy, NoProgress,
    ProgressSink, Stage, StrategyName, TranscriptOrchestrator, TranscriptResult,
    TranscriptStrategy,
};

/// Result type used throughout the library
pub type Result<T> = anyhow::Result<T>;

/// Error types specific to transcript fetching
#[derive(thiserror::Error, Debug)]
pub enum TranscriptorError {
    #[error("invalid content identifier: {0:?}")]
    InvalidContentId(String),

    #[error("captions disabled for {0}")]
    CaptionsDisabled(String),

    #[error("video {0} is unavailable: {1}")]
    VideoUnavailable(String, String),

    #[error("requests for {0} are blocked (reCAPTCHA challenge)")]
    IpBlocked(String),

    #[error("no transcript found for {0} in languages {1:?}")]
    NoTranscriptFound(String, Vec<String>),

    #[error("transcription failed: {0}")]
    TranscriptionFailed(String),

    #[error("configuration error: {0}")]
    ConfigError(String),

    #[error("HTTP {status} from {context}")]
    Http { status: u16, context: String },
}
