//! Notification sink that writes to the tracing subscriber.

use tracing::{info, warn};

use crate::{Level, Notification, NotificationSink};

/// Emits each notification as a structured log event under the
/// `notification` target.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl LogSink {
    pub fn new() -> Self {
        Self
    }
}

impl NotificationSink for LogSink {
    fn notify(&self, notification: Notification) {
        match notification.level {
            Level::Success => {
                info!(target: "notification", level = notification.level.label(), message = %notification.message)
            }
            Level::Error => {
                warn!(target: "notification", level = notification.level.label(), message = %notification.message)
            }
        }
    }
}
