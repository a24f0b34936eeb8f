//! Notification sink that keeps everything it receives.

use std::sync::Mutex;

use crate::{Notification, NotificationSink};

/// Collects notifications in arrival order.
#[derive(Debug, Default)]
pub struct MemorySink {
    received: Mutex<Vec<Notification>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything received so far.
    pub fn notifications(&self) -> Vec<Notification> {
        self.received
            .lock()
            .map(|n| n.clone())
            .unwrap_or_default()
    }

    /// Drain and return everything received so far.
    pub fn take(&self) -> Vec<Notification> {
        self.received
            .lock()
            .map(|mut n| std::mem::take(&mut *n))
            .unwrap_or_default()
    }
}

impl NotificationSink for MemorySink {
    fn notify(&self, notification: Notification) {
        // A poisoned lock only means another test thread panicked; drop the entry.
        if let Ok(mut received) = self.received.lock() {
            received.push(notification);
        }
    }
}
