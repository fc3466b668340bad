//! Error types for the fetch controller
//!
//! Failures never cross the controller boundary as `Err`; they are mapped to
//! `ErrorInfo` and published through `ControllerState::error`.

use reqwest::StatusCode;
use thiserror::Error;

use crate::models::ErrorInfo;

/// Message and error label used for cancelled cycles.
pub const ABORTED_MESSAGE: &str = "Aborted by the user";

/// Status code reported for cancelled cycles.
pub const ABORTED_STATUS_CODE: i32 = -1;

// == Fetch Error Enum ==
/// Unified error type for a fetch attempt.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FetchError {
    /// The transport could not complete the request
    #[error("Network error: {0}")]
    Transport(String),

    /// The server answered with a non-success status and no error body
    #[error("Request failed with status {status}: {message}")]
    Status { status: u16, message: String },

    /// The body could not be decoded into the requested type
    #[error("Decode error: {0}")]
    Decode(String),

    /// The body itself reports a failure
    #[error("Application error ({status_code}): {message}")]
    Application {
        status_code: i32,
        error: String,
        message: String,
    },

    /// The cache backend failed to read or write
    #[error("Cache error: {0}")]
    Cache(String),

    /// The cycle's cancellation token was observed signaled
    #[error("{}", ABORTED_MESSAGE)]
    Aborted,

    /// Every allowed attempt failed
    #[error("Giving up after {attempts} attempts: {last}")]
    RetryExhausted { attempts: u32, last: Box<FetchError> },
}

impl FetchError {
    // == Retryable ==
    /// Whether the retry policy applies to this failure.
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            FetchError::Aborted | FetchError::RetryExhausted { .. } | FetchError::Cache(_)
        )
    }

    // == Error Info ==
    /// Converts the error into the data shape exposed by the controller.
    pub fn to_error_info(&self) -> ErrorInfo {
        match self {
            FetchError::Transport(message) => ErrorInfo::new(message.clone(), 0, "Network Error"),
            FetchError::Status { status, message } => {
                let reason = StatusCode::from_u16(*status)
                    .ok()
                    .and_then(|s| s.canonical_reason())
                    .unwrap_or("Unknown Status");
                ErrorInfo::new(message.clone(), i32::from(*status), reason)
            }
            FetchError::Decode(message) => ErrorInfo::new(message.clone(), 0, "Decode Error"),
            FetchError::Cache(message) => ErrorInfo::new(message.clone(), 0, "Cache Error"),
            FetchError::Application {
                status_code,
                error,
                message,
            } => ErrorInfo::new(message.clone(), *status_code, error.clone()),
            FetchError::Aborted => ErrorInfo::aborted(),
            FetchError::RetryExhausted { last, .. } => last.to_error_info(),
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => FetchError::Status {
                status: status.as_u16(),
                message: err.to_string(),
            },
            None => FetchError::Transport(err.to_string()),
        }
    }
}

// == Result Type Alias ==
/// Convenience Result type for fetch attempts.
pub type Result<T> = std::result::Result<T, FetchError>;
