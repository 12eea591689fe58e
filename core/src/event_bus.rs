//! Synchronous publish/subscribe bus for store and UI events.
//!
//! This module provides the [`EventBus`] used for all cross-component
//! communication, and the [`EventPublisher`] seam the stores depend on.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐   intent    ┌──────────────┐
//! │     UI      │────────────►│ Orchestrator │
//! └─────────────┘             └──────┬───────┘
//!        ▲                           │ store call
//!        │                           ▼
//!        │                    ┌──────────────┐
//!        │                    │    Store     │
//!        │                    └──────┬───────┘
//!        │      snapshot event       │ publish
//!        └───────────────────────────┘
//! ```
//!
//! # Key Principles
//!
//! - **Synchronous**: `publish` returns after every handler has run
//! - **Ordered**: handlers run in subscription order
//! - **Depth-first**: a handler that publishes sees that event fully delivered
//!   before control returns to it
//! - **No-op on silence**: publishing to a topic with no subscribers does nothing
//!
//! # Re-entrancy
//!
//! The registry is only borrowed while handlers are looked up, never while they
//! run. Handlers may therefore publish, subscribe and unsubscribe freely. A
//! handler unsubscribed mid-dispatch is skipped for the rest of that dispatch;
//! a handler subscribed mid-dispatch first sees the next publish.
//!
//! # Example
//!
//! ```
//! use storefront_core::event::{ShopEvent, Topic};
//! use storefront_core::event_bus::EventBus;
//! use std::cell::RefCell;
//! use std::rc::Rc;
//!
//! let bus = Rc::new(EventBus::new());
//! let log = Rc::new(RefCell::new(Vec::new()));
//!
//! // Unlock the page whenever a modal closes
//! let relay = Rc::clone(&bus);
//! bus.subscribe(Topic::ModalClose, move |_| {
//!     relay.publish(ShopEvent::PageLocked { locked: false });
//! });
//!
//! let seen = Rc::clone(&log);
//! bus.subscribe(Topic::PageLocked, move |event| seen.borrow_mut().push(event.clone()));
//!
//! bus.publish(ShopEvent::ModalClose {
//!     reason: storefront_core::types::CloseReason::Escape,
//! });
//! assert_eq!(log.borrow().as_slice(), &[ShopEvent::PageLocked { locked: false }]);
//! ```

use crate::event::{ShopEvent, Topic};
use smallvec::SmallVec;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// Publish-only view of a bus.
///
/// Stores depend on this trait rather than on [`EventBus`] so tests can hand
/// them a recorder or a pass-through instead of a real bus.
pub trait EventPublisher {
    /// Deliver `event` to every subscriber of its topic
    fn publish(&self, event: ShopEvent);
}

/// Handle returned by [`EventBus::subscribe`]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

type Handler = Rc<dyn Fn(&ShopEvent)>;

struct Subscriber {
    id: SubscriptionId,
    topic: Topic,
    handler: Handler,
}

#[derive(Default)]
struct Registry {
    next_id: u64,
    subscribers: Vec<Subscriber>,
}

/// Single-threaded, synchronous event bus.
///
/// Share it as `Rc<EventBus>`. The bus is `!Send`.
#[derive(Default)]
pub struct EventBus {
    registry: RefCell<Registry>,
}

impl EventBus {
    /// Create a bus with no subscribers
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for every future event on `topic`
    pub fn subscribe<F>(&self, topic: Topic, handler: F) -> SubscriptionId
    where
        F: Fn(&ShopEvent) + 'static,
    {
        let mut registry = self.registry.borrow_mut();
        let id = SubscriptionId(registry.next_id);
        registry.next_id += 1;
        registry.subscribers.push(Subscriber {
            id,
            topic,
            handler: Rc::new(handler),
        });
        tracing::trace!(topic = %topic, subscription = id.0, "subscribed");
        id
    }

    /// Remove a subscription. Returns `false` if it was already gone.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut registry = self.registry.borrow_mut();
        let before = registry.subscribers.len();
        registry.subscribers.retain(|subscriber| subscriber.id != id);
        registry.subscribers.len() != before
    }

    /// Number of live subscriptions on `topic`
    #[must_use]
    pub fn subscriber_count(&self, topic: Topic) -> usize {
        self.registry
            .borrow()
            .subscribers
            .iter()
            .filter(|subscriber| subscriber.topic == topic)
            .count()
    }

    fn is_subscribed(&self, id: SubscriptionId) -> bool {
        self.registry
            .borrow()
            .subscribers
            .iter()
            .any(|subscriber| subscriber.id == id)
    }

    /// Deliver `event` to every subscriber of its topic, depth-first
    pub fn publish(&self, event: ShopEvent) {
        let topic = event.topic();
        let handlers: SmallVec<[(SubscriptionId, Handler); 4]> = self
            .registry
            .borrow()
            .subscribers
            .iter()
            .filter(|subscriber| subscriber.topic == topic)
            .map(|subscriber| (subscriber.id, Rc::clone(&subscriber.handler)))
            .collect();

        tracing::trace!(topic = %topic, subscribers = handlers.len(), "publishing event");
        metrics::counter!("storefront_events_published_total", "topic" => topic.as_str())
            .increment(1);

        for (id, handler) in handlers {
            if self.is_subscribed(id) {
                handler(&event);
            }
        }
    }
}

impl EventPublisher for EventBus {
    fn publish(&self, event: ShopEvent) {
        Self::publish(self, event);
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let registry = self.registry.borrow();
        f.debug_struct("EventBus")
            .field("subscribers", &registry.subscribers.len())
            .field("next_id", &registry.next_id)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CloseReason;
    use std::cell::{Cell, RefCell};

    fn close() -> ShopEvent {
        ShopEvent::ModalClose {
            reason: CloseReason::CloseButton,
        }
    }

    #[test]
    fn test_publish_without_subscribers_is_noop() {
        let bus = EventBus::new();
        bus.publish(ShopEvent::BasketOpen);
        assert_eq!(bus.subscriber_count(Topic::BasketOpen), 0);
    }

    #[test]
    fn test_delivery_in_subscription_order() {
        let bus = EventBus::new();
        let order = Rc::new(RefCell::new(Vec::new()));

        for label in ["first", "second", "third"] {
            let order = Rc::clone(&order);
            bus.subscribe(Topic::BasketOpen, move |_| order.borrow_mut().push(label));
        }

        bus.publish(ShopEvent::BasketOpen);
        assert_eq!(*order.borrow(), vec!["first", "second", "third"]);
    }

    #[test]
    fn test_topics_are_isolated() {
        let bus = EventBus::new();
        let hits = Rc::new(Cell::new(0));

        let counter = Rc::clone(&hits);
        bus.subscribe(Topic::OrderOpen, move |_| counter.set(counter.get() + 1));

        bus.publish(ShopEvent::BasketOpen);
        assert_eq!(hits.get(), 0);

        bus.publish(ShopEvent::OrderOpen);
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn test_nested_publish_is_depth_first() {
        let bus = Rc::new(EventBus::new());
        let trace = Rc::new(RefCell::new(Vec::new()));

        let relay = Rc::clone(&bus);
        let outer = Rc::clone(&trace);
        bus.subscribe(Topic::ModalClose, move |_| {
            outer.borrow_mut().push("close:start");
            relay.publish(ShopEvent::PageLocked { locked: false });
            outer.borrow_mut().push("close:end");
        });

        let after = Rc::clone(&trace);
        bus.subscribe(Topic::ModalClose, move |_| after.borrow_mut().push("close:second"));

        let inner = Rc::clone(&trace);
        bus.subscribe(Topic::PageLocked, move |_| inner.borrow_mut().push("locked"));

        bus.publish(close());

        assert_eq!(
            *trace.borrow(),
            vec!["close:start", "locked", "close:end", "close:second"]
        );
    }

    #[test]
    fn test_unsubscribe() {
        let bus = EventBus::new();
        let hits = Rc::new(Cell::new(0));

        let counter = Rc::clone(&hits);
        let id = bus.subscribe(Topic::OrderOpen, move |_| counter.set(counter.get() + 1));

        assert!(bus.unsubscribe(id));
        assert!(!bus.unsubscribe(id));

        bus.publish(ShopEvent::OrderOpen);
        assert_eq!(hits.get(), 0);
    }

    #[test]
    fn test_unsubscribe_during_dispatch_skips_handler() {
        let bus = Rc::new(EventBus::new());
        let hits = Rc::new(Cell::new(0));
        let victim = Rc::new(Cell::new(None));

        let remover_bus = Rc::clone(&bus);
        let remover_victim = Rc::clone(&victim);
        bus.subscribe(Topic::OrderOpen, move |_| {
            if let Some(id) = remover_victim.get() {
                remover_bus.unsubscribe(id);
            }
        });

        let counter = Rc::clone(&hits);
        let id = bus.subscribe(Topic::OrderOpen, move |_| counter.set(counter.get() + 1));
        victim.set(Some(id));

        bus.publish(ShopEvent::OrderOpen);
        assert_eq!(hits.get(), 0);
        assert_eq!(bus.subscriber_count(Topic::OrderOpen), 1);
    }

    #[test]
    fn test_subscribe_during_dispatch_applies_to_next_publish() {
        let bus = Rc::new(EventBus::new());
        let late_hits = Rc::new(Cell::new(0));

        let registrar = Rc::clone(&bus);
        let counter = Rc::clone(&late_hits);
        bus.subscribe(Topic::BasketOpen, move |_| {
            let counter = Rc::clone(&counter);
            registrar.subscribe(Topic::BasketOpen, move |_| counter.set(counter.get() + 1));
        });

        bus.publish(ShopEvent::BasketOpen);
        assert_eq!(late_hits.get(), 0);

        bus.publish(ShopEvent::BasketOpen);
        assert_eq!(late_hits.get(), 1);
    }

    #[test]
    fn test_publisher_trait_object() {
        let bus = Rc::new(EventBus::new());
        let hits = Rc::new(Cell::new(0));

        let counter = Rc::clone(&hits);
        bus.subscribe(Topic::SuccessClose, move |_| counter.set(counter.get() + 1));

        let publisher: Rc<dyn EventPublisher> = bus;
        publisher.publish(ShopEvent::SuccessClose);
        assert_eq!(hits.get(), 1);
    }
}
