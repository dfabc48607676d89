//! # Lifecycle Notifications
//!
//! Fire-and-forget delivery of exchange state transitions to monitoring.
//! A [`NotificationSink`] never blocks the engine and never reports errors
//! back into it.

pub mod publisher;
pub mod types;

pub use publisher::EventPublisher;
pub use types::{LifecycleEvent, LifecycleState, NotificationKind};

/// Receiver of lifecycle events
pub trait NotificationSink: Send + Sync {
    fn notify(&self, event: LifecycleEvent);
}

/// Sink used when notifications are disabled
#[derive(Debug, Clone, Copy, Default)]
pub struct NullNotificationSink;

impl NotificationSink for NullNotificationSink {
    fn notify(&self, _event: LifecycleEvent) {}
}
