//! Product catalog store.

use std::cell::RefCell;
use std::rc::Rc;
use storefront_core::event::ShopEvent;
use storefront_core::event_bus::EventPublisher;
use storefront_core::types::{Product, ProductId};

#[derive(Debug, Default)]
struct CatalogState {
    products: Vec<Product>,
    selected: Option<ProductId>,
}

impl CatalogState {
    fn find(&self, id: &ProductId) -> Option<&Product> {
        self.products.iter().find(|product| &product.id == id)
    }

    fn selected_product(&self) -> Option<Product> {
        self.selected.as_ref().and_then(|id| self.find(id)).cloned()
    }
}

/// Holds the product list and the currently inspected product.
///
/// Publishes `catalog:updated` when the list is replaced and
/// `product:selected` when the selection changes.
pub struct CatalogStore {
    state: RefCell<CatalogState>,
    events: Rc<dyn EventPublisher>,
}

impl CatalogStore {
    /// Create an empty catalog publishing to `events`
    #[must_use]
    pub fn new(events: Rc<dyn EventPublisher>) -> Self {
        Self {
            state: RefCell::new(CatalogState::default()),
            events,
        }
    }

    /// Replace the product list.
    ///
    /// The selection survives only if its id is still in the new list.
    pub fn set_products(&self, products: Vec<Product>) {
        let (products, selected) = {
            let mut state = self.state.borrow_mut();
            state.products = products;
            if state
                .selected
                .as_ref()
                .is_some_and(|id| state.find(id).is_none())
            {
                state.selected = None;
            }
            (state.products.clone(), state.selected_product())
        };

        tracing::debug!(count = products.len(), "catalog replaced");
        self.events
            .publish(ShopEvent::CatalogUpdated { products, selected });
    }

    /// Product with `id`, if loaded
    #[must_use]
    pub fn get_by_id(&self, id: &ProductId) -> Option<Product> {
        self.state.borrow().find(id).cloned()
    }

    /// Make `id` the inspected product.
    ///
    /// Unknown ids are ignored and return `None` without publishing.
    pub fn select_product(&self, id: &ProductId) -> Option<Product> {
        let product = {
            let mut state = self.state.borrow_mut();
            let product = state.find(id).cloned()?;
            state.selected = Some(product.id.clone());
            product
        };

        tracing::debug!(product = %product.id, "product selected");
        self.events.publish(ShopEvent::ProductSelected {
            product: Some(product.clone()),
        });
        Some(product)
    }

    /// Drop the current selection
    pub fn clear_selection(&self) {
        self.state.borrow_mut().selected = None;
        self.events
            .publish(ShopEvent::ProductSelected { product: None });
    }

    /// Every loaded product, in backend order
    #[must_use]
    pub fn products(&self) -> Vec<Product> {
        self.state.borrow().products.clone()
    }

    /// Currently inspected product
    #[must_use]
    pub fn selected(&self) -> Option<Product> {
        self.state.borrow().selected_product()
    }
}

impl std::fmt::Debug for CatalogStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogStore")
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}
