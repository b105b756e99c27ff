//! Kitchen event bus
//!
//! ```text
//! checkout / ticket transitions ──▶ publish() ──▶ broadcast::Sender<KitchenEvent>
//!                                                     │
//!                                     subscribe() ◀───┴───▶ display fan-out
//! ```

use shared::KitchenEvent;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

/// Fire-and-forget broadcast of kitchen events
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<KitchenEvent>,
    shutdown_token: CancellationToken,
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_capacity(1024)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self {
            tx,
            shutdown_token: CancellationToken::new(),
        }
    }

    /// Publish an event to all current subscribers
    ///
    /// Having no subscriber is not an error.
    pub fn publish(&self, event: KitchenEvent) {
        tracing::debug!(event = %event, "Publishing kitchen event");
        if self.tx.send(event).is_err() {
            tracing::trace!("No event subscribers");
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<KitchenEvent> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Token cancelled on shutdown
    pub fn shutdown_token(&self) -> &CancellationToken {
        &self.shutdown_token
    }

    pub fn shutdown(&self) {
        tracing::info!("Shutting down event bus");
        self.shutdown_token.cancel();
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_publish_reaches_subscribers() {
        let bus = EventBus::with_capacity(8);
        let mut a = bus.subscribe();
        let mut b = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 2);

        bus.publish(KitchenEvent::DisplayRefresh {
            prefix: "PIZ".into(),
        });

        for rx in [&mut a, &mut b] {
            match rx.recv().await.unwrap() {
                KitchenEvent::DisplayRefresh { prefix } => assert_eq!(prefix, "PIZ"),
                other => panic!("unexpected event {other:?}"),
            }
        }
    }

    #[test]
    fn test_publish_without_subscribers() {
        let bus = EventBus::new();
        bus.publish(KitchenEvent::TicketReady {
            prefix: "BAR".into(),
            seq: 3,
        });
        assert!(!bus.shutdown_token().is_cancelled());
        bus.shutdown();
        assert!(bus.shutdown_token().is_cancelled());
    }
}
