//! Error types for intelligence-lens.
//!
//! `BackendError` covers everything that can go wrong on the way to and from
//! the hosted model; `IntelligenceError` is the crate-wide error that the
//! session surfaces to the user.

use thiserror::Error;

/// Shown when a failure carries no usable message of its own.
pub const GENERIC_FAILURE_MESSAGE: &str =
    "An error occurred during analysis, please retry later.";

/// Failures of the analysis backend call.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("empty response: the model returned no analyzable text")]
    EmptyResponse,

    #[error("malformed response: {0}")]
    MalformedResponse(String),

    #[error("request blocked by the model: {0}")]
    Blocked(String),

    #[error("HTTP {status} from analysis backend: {body}")]
    Api { status: u16, body: String },

    #[error("analysis backend did not respond within {secs}s")]
    Timeout { secs: u64 },

    #[error("transport failure: {0}")]
    Transport(String),
}

#[derive(Debug, Error)]
pub enum IntelligenceError {
    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error("could not read '{path}': {reason}")]
    FileRead { path: String, reason: String },

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl IntelligenceError {
    pub fn file_read(path: impl Into<String>, reason: impl ToString) -> Self {
        Self::FileRead {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Text for the session's error state. Variants whose detail is blank
    /// fall back to the generic failure message.
    pub fn user_message(&self) -> String {
        let detail = match self {
            Self::Backend(BackendError::MalformedResponse(d))
            | Self::Backend(BackendError::Blocked(d))
            | Self::Backend(BackendError::Transport(d))
            | Self::InvalidInput(d)
            | Self::Config(d) => Some(d.as_str()),
            _ => None,
        };
        match detail {
            Some(d) if d.trim().is_empty() => GENERIC_FAILURE_MESSAGE.to_string(),
            _ => self.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, IntelligenceError>;
