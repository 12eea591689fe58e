//! Cart store.
//!
//! The cart is an insertion-ordered list of products. `count` and `total` are
//! derived from the list on every read so they can never drift from it.

use crate::metrics::CartMetrics;
use std::cell::RefCell;
use std::rc::Rc;
use storefront_core::event::ShopEvent;
use storefront_core::event_bus::EventPublisher;
use storefront_core::types::{CartSnapshot, Product, ProductId};

/// Holds the selected line items and publishes `cart:updated` on change.
pub struct CartStore {
    items: RefCell<Vec<Product>>,
    events: Rc<dyn EventPublisher>,
}

impl CartStore {
    /// Create an empty cart publishing to `events`
    #[must_use]
    pub fn new(events: Rc<dyn EventPublisher>) -> Self {
        Self {
            items: RefCell::new(Vec::new()),
            events,
        }
    }

    /// Append `product`.
    ///
    /// A product whose id is already in the cart is ignored: returns `false`
    /// and publishes nothing.
    pub fn add_item(&self, product: Product) -> bool {
        {
            let mut items = self.items.borrow_mut();
            if items.iter().any(|item| item.id == product.id) {
                tracing::debug!(product = %product.id, "duplicate add ignored");
                return false;
            }
            tracing::debug!(product = %product.id, "added to cart");
            items.push(product);
        }

        CartMetrics::record("add");
        self.publish();
        true
    }

    /// Remove every line with `id`. Returns whether anything was removed.
    pub fn remove_item(&self, id: &ProductId) -> bool {
        let removed = {
            let mut items = self.items.borrow_mut();
            let before = items.len();
            items.retain(|item| &item.id != id);
            items.len() != before
        };

        if removed {
            tracing::debug!(product = %id, "removed from cart");
            CartMetrics::record("remove");
            self.publish();
        }
        removed
    }

    /// Empty the cart and publish the zeroed snapshot.
    ///
    /// Clearing an empty cart leaves it unchanged but still publishes, so
    /// subscribers always see the cart as empty afterwards.
    pub fn clear(&self) {
        let removed = {
            let mut items = self.items.borrow_mut();
            let removed = items.len();
            items.clear();
            removed
        };

        if removed > 0 {
            CartMetrics::record("clear");
        }
        tracing::debug!(removed, "cart cleared");
        self.publish();
    }

    /// Item ids in insertion order
    #[must_use]
    pub fn get_item_ids(&self) -> Vec<ProductId> {
        self.items.borrow().iter().map(|item| item.id.clone()).collect()
    }

    /// Lines in insertion order
    #[must_use]
    pub fn items(&self) -> Vec<Product> {
        self.items.borrow().clone()
    }

    /// Sum of prices, priceless lines counting as zero
    #[must_use]
    pub fn total(&self) -> u64 {
        CartSnapshot::total_of(&self.items.borrow())
    }

    /// Number of lines
    #[must_use]
    pub fn count(&self) -> usize {
        self.items.borrow().len()
    }

    /// Whether a line with `id` exists
    #[must_use]
    pub fn has_item(&self, id: &ProductId) -> bool {
        self.items.borrow().iter().any(|item| &item.id == id)
    }

    /// Whether the cart has no lines
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.borrow().is_empty()
    }

    /// Consistent view of lines, total and count
    #[must_use]
    pub fn snapshot(&self) -> CartSnapshot {
        CartSnapshot::from_items(self.items())
    }

    fn publish(&self) {
        self.events.publish(ShopEvent::CartUpdated(self.snapshot()));
    }
}

impl std::fmt::Debug for CartStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CartStore")
            .field("items", &self.items)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::panic)] // Test code can panic
mod tests {
    use super::*;
    use storefront_testing::{RecordingPublisher, product};

    fn store() -> (CartStore, Rc<RecordingPublisher>) {
        let events = Rc::new(RecordingPublisher::new());
        (CartStore::new(events.clone()), events)
    }

    #[test]
    fn test_priceless_counts_as_zero() {
        let (cart, _) = store();
        cart.add_item(product("a", Some(100)));
        cart.add_item(product("b", None));

        assert_eq!(cart.total(), 100);
        assert_eq!(cart.count(), 2);
    }

    #[test]
    fn test_add_publishes_snapshot() {
        let (cart, events) = store();
        assert!(cart.add_item(product("a", Some(250))));

        assert_eq!(
            events.last(),
            Some(ShopEvent::CartUpdated(CartSnapshot {
                items: vec![product("a", Some(250))],
                total: 250,
                count: 1,
            }))
        );
    }

    #[test]
    fn test_duplicate_add_ignored() {
        let (cart, events) = store();
        cart.add_item(product("a", Some(100)));
        events.clear();

        assert!(!cart.add_item(product("a", Some(100))));
        assert_eq!(cart.count(), 1);
        assert!(events.is_empty());
    }

    #[test]
    fn test_remove_unknown_is_silent() {
        let (cart, events) = store();
        cart.add_item(product("a", Some(100)));
        events.clear();

        assert!(!cart.remove_item(&ProductId::new("zzz")));
        assert!(events.is_empty());
        assert_eq!(cart.count(), 1);
    }

    #[test]
    fn test_remove_keeps_order() {
        let (cart, _) = store();
        for id in ["a", "b", "c"] {
            cart.add_item(product(id, Some(10)));
        }

        assert!(cart.remove_item(&ProductId::new("b")));
        assert_eq!(
            cart.get_item_ids(),
            vec![ProductId::new("a"), ProductId::new("c")]
        );
        assert!(!cart.has_item(&ProductId::new("b")));
        assert_eq!(cart.total(), 20);
    }

    #[test]
    fn test_clear_is_idempotent() {
        let (cart, events) = store();
        cart.add_item(product("a", Some(100)));

        cart.clear();
        assert!(cart.is_empty());
        assert_eq!(cart.total(), 0);
        assert_eq!(
            events.last(),
            Some(ShopEvent::CartUpdated(CartSnapshot::default()))
        );

        events.clear();
        cart.clear();
        assert_eq!(
            events.events(),
            vec![ShopEvent::CartUpdated(CartSnapshot::default())]
        );
        assert_eq!(cart.snapshot(), CartSnapshot::default());
    }

    #[test]
    fn test_clear_on_empty_cart_publishes_zeroes() {
        let (cart, events) = store();

        cart.clear();

        assert_eq!(
            events.events(),
            vec![ShopEvent::CartUpdated(CartSnapshot::default())]
        );
    }

    #[test]
    fn test_total_saturates_instead_of_overflowing() {
        let (cart, events) = store();
        let half = u64::MAX / 2 + 1;

        assert!(cart.add_item(product("a", Some(half))));
        assert!(cart.add_item(product("b", Some(half))));
        cart.add_item(product("c", Some(1)));

        assert_eq!(cart.total(), u64::MAX);
        assert_eq!(cart.count(), 3);
        let Some(ShopEvent::CartUpdated(snapshot)) = events.last() else {
            panic!("expected cart:updated");
        };
        assert_eq!(snapshot.total, u64::MAX);
        assert_eq!(snapshot.count, 3);
    }
}
