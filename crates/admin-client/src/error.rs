//! Normalized client errors
//!
//! Every failure the client surfaces is one `Error` value. `Display` is the
//! user-facing message (what a notification shows); `Debug` keeps the detail
//! for logs.

use serde_json::Value;

/// Message used when a failure carries nothing better.
pub const FALLBACK_MESSAGE: &str = "Request failed";

/// Outcome of a failed refresh cycle, cloned to every waiter of that cycle.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RefreshError {
    /// The refresh endpoint answered with a non-success status.
    #[error("{message}")]
    Rejected { status: u16, message: String },

    /// The refresh call never produced a response.
    #[error("Request failed")]
    Network(String),

    #[error("invalid refresh response: {0}")]
    InvalidResponse(String),

    /// The task driving the refresh went away without reporting.
    #[error("token refresh abandoned")]
    Abandoned,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    /// Non-success status; message extracted from the body.
    #[error("{message}")]
    Status { status: u16, message: String },

    /// Connect, timeout or body-read failure. The detail is for logs only.
    #[error("Request failed")]
    Network(String),

    #[error("{0}")]
    Refresh(#[from] RefreshError),

    /// The backend answered 2xx with `success: false`.
    #[error("{0}")]
    Rejected(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("invalid response body: {0}")]
    Decode(String),

    #[error("invalid client configuration: {0}")]
    Config(String),

    #[error("credential store error: {0}")]
    Store(String),
}

impl Error {
    /// The message a notification should display.
    pub fn message(&self) -> String {
        self.to_string()
    }

    /// HTTP status of the failed response, if there was one.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Status { status, .. } => Some(*status),
            Error::Refresh(RefreshError::Rejected { status, .. }) => Some(*status),
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Error::Status { status: 401, .. })
    }
}

impl From<admin_auth::Error> for Error {
    fn from(e: admin_auth::Error) -> Self {
        Error::Store(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Pull the display message out of an error body.
///
/// Precedence: first entry of a validation `errors` list (`errors[0].msg`),
/// then a top-level `message`, then [`FALLBACK_MESSAGE`]. Bodies that are not
/// JSON fall back as well.
pub fn extract_message(body: &[u8]) -> String {
    let Ok(value) = serde_json::from_slice::<Value>(body) else {
        return FALLBACK_MESSAGE.to_owned();
    };
    value
        .pointer("/errors/0/msg")
        .and_then(Value::as_str)
        .or_else(|| value.get("message").and_then(Value::as_str))
        .unwrap_or(FALLBACK_MESSAGE)
        .to_owned()
}
