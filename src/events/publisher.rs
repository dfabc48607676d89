//! # Event Publisher
//!
//! Broadcast fan-out of lifecycle events to any number of monitors.
//!
//! ```rust
//! use sbb_core::events::{EventPublisher, LifecycleEvent, LifecycleState, NotificationKind};
//! use sbb_core::exchange::{CallContext, Exchange, ExchangePattern, Role, Scope};
//!
//! # tokio_test::block_on(async {
//! let publisher = EventPublisher::new(16);
//! let mut monitor = publisher.subscribe();
//!
//! let exchange = Exchange::new(ExchangePattern::OneWay, "billing", "charge", CallContext::new());
//! publisher.publish(LifecycleEvent::for_exchange(
//!     &exchange,
//!     Role::Sender,
//!     Scope::Request,
//!     NotificationKind::Exchange,
//!     LifecycleState::Finished,
//! ));
//!
//! assert_eq!(monitor.recv().await.unwrap().state, LifecycleState::Finished);
//! # });
//! ```

use super::types::LifecycleEvent;
use super::NotificationSink;
use tokio::sync::broadcast;
use tracing::trace;

/// High-throughput publisher for exchange lifecycle events
#[derive(Debug, Clone)]
pub struct EventPublisher {
    sender: broadcast::Sender<LifecycleEvent>,
}

impl EventPublisher {
    /// Create a new event publisher with the specified channel capacity
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publish a lifecycle event
    pub fn publish(&self, event: LifecycleEvent) {
        // Sending without subscribers is not an error for lifecycle events
        if let Err(broadcast::error::SendError(event)) = self.sender.send(event) {
            trace!(
                exchange_id = %event.exchange_id,
                state = %event.state,
                "No subscribers for lifecycle event"
            );
        }
    }

    /// Subscribe to events
    pub fn subscribe(&self) -> broadcast::Receiver<LifecycleEvent> {
        self.sender.subscribe()
    }

    /// Get the number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl NotificationSink for EventPublisher {
    fn notify(&self, event: LifecycleEvent) {
        self.publish(event);
    }
}

impl Default for EventPublisher {
    fn default() -> Self {
        Self::new(crate::constants::defaults::NOTIFICATION_BUFFER_SIZE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{LifecycleState, NotificationKind};
    use crate::exchange::{CallContext, Exchange, ExchangePattern, Role, Scope};

    fn event(state: LifecycleState) -> LifecycleEvent {
        let exchange = Exchange::new(
            ExchangePattern::OneWay,
            "billing",
            "charge",
            CallContext::new(),
        );
        LifecycleEvent::for_exchange(
            &exchange,
            Role::Receiver,
            Scope::Request,
            NotificationKind::Exchange,
            state,
        )
    }

    #[tokio::test]
    async fn test_publish_without_subscribers() {
        let publisher = EventPublisher::new(8);
        assert_eq!(publisher.subscriber_count(), 0);
        publisher.notify(event(LifecycleState::Finished));
    }

    #[tokio::test]
    async fn test_subscriber_receives_events_in_order() {
        let publisher = EventPublisher::new(8);
        let mut receiver = publisher.subscribe();

        publisher.notify(event(LifecycleState::NetInPost));
        publisher.notify(event(LifecycleState::Finished));

        assert_eq!(receiver.recv().await.unwrap().state, LifecycleState::NetInPost);
        assert_eq!(receiver.recv().await.unwrap().state, LifecycleState::Finished);
    }
}
