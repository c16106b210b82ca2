//! Error types and handling
//!
//! The single error type returned by the recorder and its platform backends.

use thiserror::Error;

/// Recorder-wide error type
///
/// Every variant describes a violated precondition or a collaborator failure.
/// Errors are returned at the point of misuse and never retried internally.
#[derive(Error, Debug)]
pub enum RecorderError {
    #[error("Not recording.")]
    NotRecording,

    #[error("Already recording.")]
    AlreadyRecording,

    #[error("No streams for recording.")]
    NoStreams,

    #[error("{0} is not a valid media stream.")]
    InvalidStream(String),

    #[error("Platform error: {0}")]
    Platform(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias using RecorderError
pub type RecorderResult<T> = Result<T, RecorderError>;
