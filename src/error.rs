//! Error types
//!
//! Each concern gets its own enum so callers can match on what went wrong.
//! The application edges (`main`, terminal setup) wrap these in `anyhow`.

use std::path::PathBuf;
use thiserror::Error;

/// Startup configuration failures. All of these are fatal.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("no API key found: set GEMINI_API_KEY (or API_KEY) or add \"api_key\" to {}", .0.display())]
    MissingApiKey(PathBuf),

    #[error("could not determine config directory")]
    ConfigDir,

    #[error("failed to access config file {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Failures talking to the hosted chat model.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("chat API error {status}: {body}")]
    Status { status: u16, body: String },

    #[error("provider error: {0}")]
    Provider(String),

    #[error("malformed stream payload: {0}")]
    Decode(String),
}

/// Why a user submission was not accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SubmitRejected {
    #[error("message is empty")]
    Empty,

    #[error("a reply is already in flight")]
    ReplyInFlight,
}

/// Conversation state transitions that were attempted out of order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ConversationError {
    #[error("no model reply is in flight")]
    NoReplyInFlight,

    #[error("a model reply has already started")]
    ReplyAlreadyStarted,

    #[error("conversation is not waiting for a reply")]
    NotAwaitingReply,
}
