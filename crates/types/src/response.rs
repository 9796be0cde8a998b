use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// How the remote party (or the dispatch layer) classified a failed delivery
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResponseStatus {
    /// Transient: the same message may succeed if sent again later
    ErrorRetry,

    /// Permanent: the counterparty rejected the message
    FatalError,
}

/// Failure reported by a dispatch that reached a conclusion
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseFailure {
    pub status: ResponseStatus,
    pub messages: Vec<String>,
}

impl ResponseFailure {
    pub fn new(status: ResponseStatus, messages: Vec<String>) -> Self {
        Self { status, messages }
    }

    pub fn failure_detail(&self) -> String {
        self.messages.join(", ")
    }

    pub fn is_fatal(&self) -> bool {
        self.status == ResponseStatus::FatalError
    }
}

impl fmt::Display for ResponseFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.status, self.failure_detail())
    }
}

/// Outcome of a completed dispatch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatusResult<T> {
    Succeeded(T),
    Failed(ResponseFailure),
}

impl<T> StatusResult<T> {
    pub fn success(content: T) -> Self {
        StatusResult::Succeeded(content)
    }

    pub fn retry(message: impl Into<String>) -> Self {
        StatusResult::Failed(ResponseFailure::new(
            ResponseStatus::ErrorRetry,
            vec![message.into()],
        ))
    }

    pub fn fatal(message: impl Into<String>) -> Self {
        StatusResult::Failed(ResponseFailure::new(
            ResponseStatus::FatalError,
            vec![message.into()],
        ))
    }

    pub fn succeeded(&self) -> bool {
        matches!(self, StatusResult::Succeeded(_))
    }

    pub fn content(&self) -> Option<&T> {
        match self {
            StatusResult::Succeeded(content) => Some(content),
            StatusResult::Failed(_) => None,
        }
    }

    pub fn failure(&self) -> Option<&ResponseFailure> {
        match self {
            StatusResult::Succeeded(_) => None,
            StatusResult::Failed(failure) => Some(failure),
        }
    }
}

/// Errors raised by the dispatch layer before a status could be obtained.
///
/// All of these are treated as transient by the retry process.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error("no dispatcher registered for protocol '{0}'")]
    NoDispatcher(String),

    #[error("dispatch timed out after {0} ms")]
    Timeout(u64),

    #[error("transport error: {0}")]
    Transport(String),
}
