//! Error types and result aliases for the InternMatch assistant core.
//!
//! Only [`InternMatchError::InvalidArgument`] and [`InternMatchError::SessionBusy`]
//! are meant to reach the caller of a chat session. Every per-attempt network
//! failure is absorbed by the request client and replaced with fallback text.

use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum InternMatchError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Session busy: a message is already in flight")]
    SessionBusy,

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Attempt timed out after {0:?}")]
    Timeout(Duration),
}

impl InternMatchError {
    /// Whether the request client should retry after this error.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Transport(_)
                | Self::MalformedResponse(_)
                | Self::Http(_)
                | Self::Serialization(_)
                | Self::Timeout(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, InternMatchError>;
