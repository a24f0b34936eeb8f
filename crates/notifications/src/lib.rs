//! User-visible notification boundary
//!
//! Resource wrappers report the outcome of each operation through a
//! `NotificationSink`. The HTTP client itself never notifies; it only returns
//! a normalized error, and the calling layer decides to surface it as a single
//! notification. A terminal front end logs them (`LogSink`); tests and
//! embedding applications collect them (`MemorySink`).

pub mod log_sink;
pub mod memory;

pub use log_sink::LogSink;
pub use memory::MemorySink;

use serde::Serialize;

/// Severity of a user-visible notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Success,
    Error,
}

impl Level {
    pub fn label(&self) -> &'static str {
        match self {
            Level::Success => "success",
            Level::Error => "error",
        }
    }
}

/// A single notification as it would be shown to the operator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub level: Level,
    pub message: String,
}

/// Sink for user-visible notifications.
///
/// Implementations must be cheap and infallible: a notification that cannot
/// be delivered is dropped, never turned into an error for the caller.
pub trait NotificationSink: Send + Sync {
    fn notify(&self, notification: Notification);

    fn notify_error(&self, message: &str) {
        self.notify(Notification {
            level: Level::Error,
            message: message.to_owned(),
        });
    }

    fn notify_success(&self, message: &str) {
        self.notify(Notification {
            level: Level::Success,
            message: message.to_owned(),
        });
    }
}
