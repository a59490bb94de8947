//! Error types and handling for pull streams
//!
//! Every failure a stream can terminate with is a [`StreamError`]. Errors are
//! `Clone` so an errored stream can hand the same error to every later read.

use thiserror::Error;

/// Main error type for stream operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StreamError {
    /// A user-supplied function failed or panicked inside a combinator
    #[error("{stage} failed: {message}")]
    Transform { stage: &'static str, message: String },
    /// A source could not acquire its listener, timer or task
    #[error("failed to register {resource}: {message}")]
    Registration { resource: String, message: String },
    /// The stream was cancelled by its consumer
    #[error("stream cancelled")]
    Cancelled,
    /// The stream no longer accepts values
    #[error("stream closed")]
    Closed,
    /// The terminal sink rejected a value
    #[error("sink error: {0}")]
    Sink(String),
    /// Custom error with message
    #[error("stream error: {0}")]
    Custom(String),
}

impl StreamError {
    pub fn transform(stage: &'static str, message: impl Into<String>) -> Self {
        StreamError::Transform {
            stage,
            message: message.into(),
        }
    }

    pub fn registration(resource: impl Into<String>, message: impl Into<String>) -> Self {
        StreamError::Registration {
            resource: resource.into(),
            message: message.into(),
        }
    }

    /// Name of the combinator that failed, if this is a transform failure
    pub fn stage(&self) -> Option<&'static str> {
        match self {
            StreamError::Transform { stage, .. } => Some(stage),
            _ => None,
        }
    }
}

impl From<tokio::runtime::TryCurrentError> for StreamError {
    fn from(err: tokio::runtime::TryCurrentError) -> Self {
        StreamError::registration("task", err.to_string())
    }
}

/// Result type for stream operations
pub type StreamResult<T> = Result<T, StreamError>;
