//! Fire-and-forget notification stream.
//!
//! The core publishes on claim, unclaim, travel start, arrival, festival
//! changes and idle-status changes; UI, toast and log consumers subscribe
//! independently. Publishing never blocks and never fails — a sink that
//! cannot take delivery simply misses the message.

use std::sync::{Arc, Mutex};
use tracing::info;

/// Coarse routing category for consumers that only care about some
/// traffic.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NotifyCategory {
    Claim,
    Unclaim,
    Travel,
    Arrival,
    Idle,
    Festival,
    Victory,
}

/// One published message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notification {
    pub category: NotifyCategory,
    pub message: String,
}

/// A delivery target attached to the bus.
pub trait NotificationSink: Send {
    fn deliver(&self, notification: &Notification);
}

/// Publish-only bus over the attached sinks.
#[derive(Default)]
pub struct NotificationBus {
    sinks: Vec<Box<dyn NotificationSink>>,
}

impl NotificationBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attach(&mut self, sink: Box<dyn NotificationSink>) {
        self.sinks.push(sink);
    }

    /// Fan a message out to every sink, best-effort.
    pub fn publish(&self, category: NotifyCategory, message: impl Into<String>) {
        let notification = Notification {
            category,
            message: message.into(),
        };
        for sink in &self.sinks {
            sink.deliver(&notification);
        }
    }
}

/// Buffers notifications behind a shared handle; the test and CLI sink.
#[derive(Clone, Default)]
pub struct CollectingSink {
    buffer: Arc<Mutex<Vec<Notification>>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shared handle for reading what was collected.
    pub fn handle(&self) -> Arc<Mutex<Vec<Notification>>> {
        Arc::clone(&self.buffer)
    }

    /// Take everything collected so far.
    pub fn drain(&self) -> Vec<Notification> {
        match self.buffer.lock() {
            Ok(mut buffer) => std::mem::take(&mut *buffer),
            Err(_) => Vec::new(),
        }
    }
}

impl NotificationSink for CollectingSink {
    fn deliver(&self, notification: &Notification) {
        if let Ok(mut buffer) = self.buffer.lock() {
            buffer.push(notification.clone());
        }
    }
}

/// Forwards every notification to the tracing log.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingSink;

impl NotificationSink for TracingSink {
    fn deliver(&self, notification: &Notification) {
        info!(category = ?notification.category, "{}", notification.message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn publish_reaches_every_sink() {
        let mut bus = NotificationBus::new();
        let a = CollectingSink::new();
        let b = CollectingSink::new();
        bus.attach(Box::new(a.clone()));
        bus.attach(Box::new(b.clone()));

        bus.publish(NotifyCategory::Claim, "Claimed the cave at (3, 4).");
        assert_eq!(a.drain().len(), 1);
        let collected = b.drain();
        assert_eq!(collected[0].category, NotifyCategory::Claim);
        assert_eq!(collected[0].message, "Claimed the cave at (3, 4).");
    }

    #[test]
    fn publish_without_sinks_is_a_no_op() {
        let bus = NotificationBus::new();
        bus.publish(NotifyCategory::Idle, "nothing to do");
    }

    #[test]
    fn drain_empties_the_buffer() {
        let mut bus = NotificationBus::new();
        let sink = CollectingSink::new();
        bus.attach(Box::new(sink.clone()));
        bus.publish(NotifyCategory::Travel, "off we go");
        assert_eq!(sink.drain().len(), 1);
        assert!(sink.drain().is_empty());
    }
}
