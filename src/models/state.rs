//! Controller state model
//!
//! Serialized with the field names callers expect:
//! `{ isLoading, idle, response: { data } | null, error | null }`.

use serde::{Deserialize, Serialize};

use crate::error::{ABORTED_MESSAGE, ABORTED_STATUS_CODE};

// == Error Info ==
/// Failure description published in `ControllerState::error`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorInfo {
    /// Human readable description
    pub message: String,
    /// HTTP or application status code, `-1` for aborted cycles
    pub status_code: i32,
    /// Short error label
    pub error: String,
}

impl ErrorInfo {
    /// Creates a new ErrorInfo
    pub fn new(message: impl Into<String>, status_code: i32, error: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status_code,
            error: error.into(),
        }
    }

    /// The fixed error written when a cycle observes its cancellation.
    pub fn aborted() -> Self {
        Self::new(ABORTED_MESSAGE, ABORTED_STATUS_CODE, ABORTED_MESSAGE)
    }

    pub fn is_aborted(&self) -> bool {
        self.status_code == ABORTED_STATUS_CODE && self.error == ABORTED_MESSAGE
    }
}

/// Successful payload wrapper.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseData<T> {
    pub data: T,
}

// == Controller State ==
/// Externally visible state of a fetch controller.
///
/// Once `idle` and `is_loading` are both false, exactly one of `response` and
/// `error` is set. Both are empty while idle or loading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ControllerState<T> {
    pub is_loading: bool,
    pub idle: bool,
    pub response: Option<ResponseData<T>>,
    pub error: Option<ErrorInfo>,
}

impl<T> ControllerState<T> {
    /// The state a controller starts in, before its first cycle.
    pub fn idle() -> Self {
        Self {
            is_loading: false,
            idle: true,
            response: None,
            error: None,
        }
    }

    /// True when a cycle has written a terminal result.
    pub fn is_settled(&self) -> bool {
        !self.idle && !self.is_loading
    }

    pub fn data(&self) -> Option<&T> {
        self.response.as_ref().map(|r| &r.data)
    }

    // == Transitions ==
    // Each transition edits the previous snapshot in place.

    pub(crate) fn mark_idle(&mut self) {
        self.idle = true;
        self.is_loading = false;
        self.response = None;
        self.error = None;
    }

    pub(crate) fn mark_loading(&mut self) {
        self.idle = false;
        self.is_loading = true;
        self.response = None;
        self.error = None;
    }

    pub(crate) fn mark_success(&mut self, data: T) {
        self.idle = false;
        self.is_loading = false;
        self.response = Some(ResponseData { data });
        self.error = None;
    }

    pub(crate) fn mark_error(&mut self, error: ErrorInfo) {
        self.idle = false;
        self.is_loading = false;
        self.response = None;
        self.error = Some(error);
    }
}

impl<T> Default for ControllerState<T> {
    fn default() -> Self {
        Self::idle()
    }
}
