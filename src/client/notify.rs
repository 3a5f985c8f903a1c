//! Non-blocking user notifications

use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub level: NotificationLevel,
    pub message: String,
}

/// Shared notification sink; a view drains it to show toasts
#[derive(Debug, Clone, Default)]
pub struct Notifications {
    queue: Arc<Mutex<Vec<Notification>>>,
}

impl Notifications {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn success(&self, message: impl Into<String>) {
        self.push(NotificationLevel::Success, message.into());
    }

    pub fn error(&self, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!(message = %message, "Error notification");
        self.push(NotificationLevel::Error, message);
    }

    fn push(&self, level: NotificationLevel, message: String) {
        self.queue
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(Notification { level, message });
    }

    pub fn last(&self) -> Option<Notification> {
        self.queue.lock().unwrap_or_else(|e| e.into_inner()).last().cloned()
    }

    pub fn drain(&self) -> Vec<Notification> {
        std::mem::take(&mut *self.queue.lock().unwrap_or_else(|e| e.into_inner()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drain_empties_queue() {
        let notifications = Notifications::new();
        notifications.success("Saved");
        notifications.error("Nope");
        assert_eq!(notifications.last().unwrap().level, NotificationLevel::Error);

        let drained = notifications.drain();
        assert_eq!(drained.len(), 2);
        assert!(notifications.last().is_none());
    }
}
