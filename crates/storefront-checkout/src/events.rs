//! # Storefront Events
//!
//! Typed in-process notifications over a `tokio::sync::broadcast` channel.
//!
//! ```text
//! CartService ───────┐
//!                    │  publish(CartUpdated)       ┌─► Subscription (cart badge)
//! Orchestrator ──────┼──────────► EventBus ────────┼─► Subscription (order screen)
//!                    │  publish(OrderCompleted)    └─► Subscription (…)
//! sign-in / picker ──┘
//! ```
//!
//! ## Delivery
//! Best-effort. A subscriber only sees events published after it
//! subscribed; a subscriber that falls more than the channel capacity behind
//! skips the oldest events. Dropping a [`Subscription`] unsubscribes.

use chrono::{DateTime, Utc};
use storefront_core::{Cart, Customer, Order, Place};
use tokio::sync::broadcast;
use tracing::{debug, warn};

/// Default channel capacity.
pub const DEFAULT_EVENT_CAPACITY: usize = 64;

/// Something other parts of the app react to.
#[derive(Debug, Clone, PartialEq)]
pub enum StorefrontEvent {
    CartUpdated(Cart),
    /// `None` after sign-out.
    CustomerUpdated(Option<Customer>),
    LocationUpdated(Place),
    OrderCompleted(Order),
}

impl StorefrontEvent {
    pub fn name(&self) -> &'static str {
        match self {
            StorefrontEvent::CartUpdated(_) => "cart.updated",
            StorefrontEvent::CustomerUpdated(_) => "customer.updated",
            StorefrontEvent::LocationUpdated(_) => "location.updated",
            StorefrontEvent::OrderCompleted(_) => "order.completed",
        }
    }
}

/// An event with the time it was published.
#[derive(Debug, Clone, PartialEq)]
pub struct EventEnvelope {
    pub event: StorefrontEvent,
    pub published_at: DateTime<Utc>,
}

/// Broadcast bus. Clones share the same channel.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<EventEnvelope>,
}

impl Default for EventBus {
    fn default() -> Self {
        EventBus::new(DEFAULT_EVENT_CAPACITY)
    }
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        EventBus { tx }
    }

    /// Publishes to current subscribers. Returns how many received it.
    pub fn publish(&self, event: StorefrontEvent) -> usize {
        let name = event.name();
        let envelope = EventEnvelope {
            event,
            published_at: Utc::now(),
        };
        match self.tx.send(envelope) {
            Ok(receivers) => {
                debug!(event = name, receivers, "Event published");
                receivers
            }
            Err(_) => {
                debug!(event = name, "Event published with no subscribers");
                0
            }
        }
    }

    pub fn subscribe(&self) -> Subscription {
        Subscription {
            rx: self.tx.subscribe(),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

/// A live subscription. Dropping it unsubscribes.
#[derive(Debug)]
pub struct Subscription {
    rx: broadcast::Receiver<EventEnvelope>,
}

impl Subscription {
    /// Waits for the next event. `None` once every bus handle is gone.
    pub async fn recv(&mut self) -> Option<EventEnvelope> {
        loop {
            match self.rx.recv().await {
                Ok(envelope) => return Some(envelope),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Subscriber lagged, dropping oldest events");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Next already-published event, if any.
    pub fn try_recv(&mut self) -> Option<EventEnvelope> {
        loop {
            match self.rx.try_recv() {
                Ok(envelope) => return Some(envelope),
                Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                    warn!(skipped, "Subscriber lagged, dropping oldest events");
                }
                Err(_) => return None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn customer() -> Customer {
        Customer {
            id: "customer_1".into(),
            name: "Tuya".into(),
            email: None,
            phone: None,
            token: None,
        }
    }

    #[tokio::test]
    async fn test_subscriber_receives_events() {
        let bus = EventBus::default();
        let mut sub = bus.subscribe();

        assert_eq!(bus.publish(StorefrontEvent::CustomerUpdated(Some(customer()))), 1);

        let envelope = sub.recv().await.unwrap();
        assert_eq!(envelope.event.name(), "customer.updated");
        assert_eq!(envelope.event, StorefrontEvent::CustomerUpdated(Some(customer())));
    }

    #[test]
    fn test_late_subscriber_misses_earlier_events() {
        let bus = EventBus::default();
        assert_eq!(bus.publish(StorefrontEvent::CustomerUpdated(None)), 0);

        let mut sub = bus.subscribe();
        assert!(sub.try_recv().is_none());
    }

    #[test]
    fn test_drop_unsubscribes() {
        let bus = EventBus::default();
        let sub = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 1);
        drop(sub);
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn test_lagging_subscriber_skips_oldest() {
        let bus = EventBus::new(2);
        let mut sub = bus.subscribe();

        bus.publish(StorefrontEvent::CustomerUpdated(None));
        bus.publish(StorefrontEvent::LocationUpdated(Place::default()));
        bus.publish(StorefrontEvent::CartUpdated(Cart::new("USD")));

        let first = sub.try_recv().unwrap();
        assert_eq!(first.event.name(), "location.updated");
        assert_eq!(sub.try_recv().unwrap().event.name(), "cart.updated");
        assert!(sub.try_recv().is_none());
    }

    #[tokio::test]
    async fn test_recv_ends_when_bus_dropped() {
        let bus = EventBus::default();
        let mut sub = bus.subscribe();
        drop(bus);
        assert!(sub.recv().await.is_none());
    }
}
