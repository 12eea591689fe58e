//! Wires UI intents to the stores and coordinates modals and the page lock.
//!
//! The orchestrator is the only component that holds every store. It
//! subscribes to the intent topics on the bus, translates each intent into
//! store calls, and sequences the checkout across the order form, the contacts
//! form and the confirmation.
//!
//! # Modals
//!
//! There is a single modal slot. Opening a modal replaces whatever is shown and
//! publishes `modal:open`; every dismissal (escape, overlay, close button, a
//! programmatic close, acknowledging the confirmation) goes through
//! `modal:close`, whose handler releases the page lock. The lock therefore
//! follows the slot exactly.
//!
//! # Submissions
//!
//! An accepted submission's request is spawned on the current tokio runtime
//! right away; its response is applied to the checkout by
//! [`Orchestrator::settle`], on the thread that owns the stores. Without a
//! runtime `contacts:submit-intent` is refused and the checkout stays on the
//! contacts step.

use crate::cart::CartStore;
use crate::catalog::CatalogStore;
use crate::checkout::{CheckoutEnvironment, CheckoutStore, InFlightSubmission};
use crate::config::StorefrontConfig;
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};
use std::sync::Arc;
use storefront_core::api::ShopApi;
use storefront_core::environment::Clock;
use storefront_core::event::{ShopEvent, Topic};
use storefront_core::event_bus::{EventBus, EventPublisher, SubscriptionId};
use storefront_core::types::{
    CheckoutStage, CloseReason, ModalView, OrderRequest, PaymentMethod, PlacedOrder, ProductId,
};
use tokio::runtime::Handle;

/// Coordinates the stores, the modal slot and the page lock
pub struct Orchestrator {
    bus: Rc<EventBus>,
    catalog: CatalogStore,
    cart: CartStore,
    checkout: Rc<CheckoutStore>,
    api: Arc<dyn ShopApi>,
    image_base: String,
    modal: RefCell<Option<ModalView>>,
    locked: Cell<bool>,
    in_flight: RefCell<Vec<InFlightSubmission>>,
    subscriptions: RefCell<Vec<SubscriptionId>>,
}

impl Orchestrator {
    /// Build the stores on `bus`. Call [`wire`](Self::wire) to start handling
    /// intents.
    #[must_use]
    pub fn new(
        bus: Rc<EventBus>,
        api: Arc<dyn ShopApi>,
        clock: Arc<dyn Clock>,
        image_base: impl Into<String>,
    ) -> Rc<Self> {
        let events: Rc<dyn EventPublisher> = bus.clone();
        let env = CheckoutEnvironment::new(Arc::clone(&api), clock);

        Rc::new(Self {
            catalog: CatalogStore::new(Rc::clone(&events)),
            cart: CartStore::new(Rc::clone(&events)),
            checkout: CheckoutStore::new(env, events),
            bus,
            api,
            image_base: image_base.into(),
            modal: RefCell::new(None),
            locked: Cell::new(false),
            in_flight: RefCell::new(Vec::new()),
            subscriptions: RefCell::new(Vec::new()),
        })
    }

    /// Build an orchestrator using the configured image CDN
    #[must_use]
    pub fn from_config(
        bus: Rc<EventBus>,
        api: Arc<dyn ShopApi>,
        clock: Arc<dyn Clock>,
        config: &StorefrontConfig,
    ) -> Rc<Self> {
        Self::new(bus, api, clock, config.cdn_url.clone())
    }

    /// Subscribe to every topic the orchestrator reacts to
    pub fn wire(self: &Rc<Self>) {
        self.on(Topic::ProductSelect, |this, event| {
            if let ShopEvent::ProductSelect { id } = event {
                this.show_preview(id);
            }
        });
        self.on(Topic::BasketAdd, |this, event| {
            if let ShopEvent::BasketAdd { id } = event {
                this.add_to_cart(id);
            }
        });
        self.on(Topic::BasketRemove, |this, event| {
            if let ShopEvent::BasketRemove { id } = event {
                this.cart.remove_item(id);
            }
        });
        self.on(Topic::CardRemove, |this, event| {
            if let ShopEvent::CardRemove { id } = event {
                this.cart.remove_item(id);
                this.close_modal(CloseReason::Programmatic);
            }
        });
        self.on(Topic::BasketOpen, |this, _| {
            this.open_modal(ModalView::Basket(this.cart.snapshot()));
        });
        self.on(Topic::OrderOpen, |this, _| this.start_checkout());
        self.on(Topic::OrderPayment, |this, event| {
            if let ShopEvent::OrderPayment { method } = event {
                this.checkout.set_payment(*method);
            }
        });
        self.on(Topic::OrderAddress, |this, event| {
            if let ShopEvent::OrderAddress { address } = event {
                this.checkout.set_address(address.as_str());
            }
        });
        self.on(Topic::OrderSubmit, |this, _| {
            if this.checkout.advance_to_contacts() {
                this.open_modal(ModalView::ContactsForm);
            }
        });
        self.on(Topic::ContactsEmail, |this, event| {
            if let ShopEvent::ContactsEmail { email } = event {
                this.checkout.set_email(email.as_str());
            }
        });
        self.on(Topic::ContactsPhone, |this, event| {
            if let ShopEvent::ContactsPhone { phone } = event {
                this.checkout.set_phone(phone.as_str());
            }
        });
        self.on(Topic::ContactsSubmit, |this, _| this.submit_order());
        self.on(Topic::OrderPlaced, |this, event| {
            if let ShopEvent::OrderPlaced { order } = event {
                this.confirm_order(order);
            }
        });
        self.on(Topic::SuccessClose, |this, _| {
            this.close_modal(CloseReason::Programmatic);
        });
        self.on(Topic::CartUpdated, |this, _| this.cart_changed());
        self.on(Topic::ModalOpen, |this, _| this.set_locked(true));
        self.on(Topic::ModalClose, |this, event| {
            if let ShopEvent::ModalClose { reason } = event {
                this.modal_closed(*reason);
            }
        });

        tracing::debug!(
            subscriptions = self.subscriptions.borrow().len(),
            "orchestrator wired"
        );
    }

    /// Drop every subscription made by [`wire`](Self::wire)
    pub fn unwire(&self) {
        for id in self.subscriptions.borrow_mut().drain(..) {
            self.bus.unsubscribe(id);
        }
    }

    fn on(self: &Rc<Self>, topic: Topic, handler: fn(&Self, &ShopEvent)) {
        let this: Weak<Self> = Rc::downgrade(self);
        let id = self.bus.subscribe(topic, move |event| {
            if let Some(this) = this.upgrade() {
                handler(&this, event);
            }
        });
        self.subscriptions.borrow_mut().push(id);
    }

    /// Fetch the product list and load it into the catalog.
    ///
    /// A failed fetch is logged and leaves the catalog empty.
    pub async fn load_catalog(&self) {
        let products = match self.api.get_product_list().await {
            Ok(products) => products,
            Err(error) => {
                tracing::error!(error = %error, "failed to load product list");
                Vec::new()
            }
        };

        let products = products
            .into_iter()
            .map(|product| product.with_image_base(&self.image_base))
            .collect::<Vec<_>>();
        tracing::info!(count = products.len(), "catalog loaded");
        self.catalog.set_products(products);
    }

    /// Wait for every in-flight submission and apply its response
    pub async fn settle(&self) {
        loop {
            let submissions = std::mem::take(&mut *self.in_flight.borrow_mut());
            if submissions.is_empty() {
                break;
            }
            for submission in submissions {
                submission.finish().await;
            }
        }
    }

    /// Number of submissions whose response has not been applied yet
    #[must_use]
    pub fn pending_submissions(&self) -> usize {
        self.in_flight.borrow().len()
    }

    /// Content of the modal slot
    #[must_use]
    pub fn active_modal(&self) -> Option<ModalView> {
        self.modal.borrow().clone()
    }

    /// Whether page scrolling is locked
    #[must_use]
    pub fn is_page_locked(&self) -> bool {
        self.locked.get()
    }

    /// Catalog store
    #[must_use]
    pub const fn catalog(&self) -> &CatalogStore {
        &self.catalog
    }

    /// Cart store
    #[must_use]
    pub const fn cart(&self) -> &CartStore {
        &self.cart
    }

    /// Checkout store
    #[must_use]
    pub fn checkout(&self) -> &CheckoutStore {
        &self.checkout
    }

    // ========== Modal slot ==========

    fn open_modal(&self, view: ModalView) {
        *self.modal.borrow_mut() = Some(view.clone());
        self.bus.publish(ShopEvent::ModalOpen { view });
    }

    fn close_modal(&self, reason: CloseReason) {
        if self.modal.borrow().is_none() {
            return;
        }
        self.bus.publish(ShopEvent::ModalClose { reason });
    }

    fn modal_closed(&self, reason: CloseReason) {
        let closed = self.modal.borrow_mut().take();
        tracing::debug!(?reason, "modal closed");
        self.set_locked(false);

        if matches!(closed, Some(ModalView::ProductPreview { .. })) {
            self.catalog.clear_selection();
        }
        if !matches!(
            self.checkout.stage(),
            CheckoutStage::Idle | CheckoutStage::Submitting
        ) {
            self.checkout.reset();
        }
    }

    fn set_locked(&self, locked: bool) {
        if self.locked.replace(locked) != locked {
            self.bus.publish(ShopEvent::PageLocked { locked });
        }
    }

    // ========== Intents ==========

    fn show_preview(&self, id: &ProductId) {
        let Some(product) = self.catalog.select_product(id) else {
            tracing::debug!(product = %id, "preview requested for unknown product");
            return;
        };
        let in_basket = self.cart.has_item(id);
        self.open_modal(ModalView::ProductPreview { product, in_basket });
    }

    fn add_to_cart(&self, id: &ProductId) {
        let Some(product) = self.catalog.get_by_id(id) else {
            tracing::debug!(product = %id, "cannot add unknown product");
            return;
        };
        if product.is_priceless() {
            tracing::debug!(product = %id, "priceless product cannot be bought");
            return;
        }
        self.cart.add_item(product);
        self.close_modal(CloseReason::Programmatic);
    }

    fn start_checkout(&self) {
        if self.cart.is_empty() {
            tracing::debug!("checkout requested with an empty cart");
            return;
        }
        match self.checkout.stage() {
            CheckoutStage::Submitting => {
                tracing::debug!("checkout requested while an order is in flight");
                return;
            }
            CheckoutStage::Idle => {}
            _ => self.checkout.reset(),
        }
        if self.checkout.open() {
            self.open_modal(ModalView::OrderForm);
        }
    }

    fn submit_order(&self) {
        let Ok(runtime) = Handle::try_current() else {
            tracing::warn!("no async runtime to send the order on; submission refused");
            return;
        };

        let request = match OrderRequest::from_snapshots(&self.checkout.fields(), &self.cart.snapshot()) {
            Ok(request) => request,
            Err(error) => {
                tracing::warn!(error = %error, "order request rejected");
                return;
            }
        };

        let Some(pending) = self.checkout.submit(request) else {
            return;
        };

        self.in_flight.borrow_mut().push(pending.start(&runtime));
    }

    fn confirm_order(&self, order: &PlacedOrder) {
        self.cart.clear();
        self.open_modal(ModalView::Success { total: order.total });
    }

    fn cart_changed(&self) {
        let snapshot = self.cart.snapshot();

        {
            let mut modal = self.modal.borrow_mut();
            match modal.as_mut() {
                Some(ModalView::Basket(view)) => *view = snapshot.clone(),
                Some(ModalView::ProductPreview { product, in_basket }) => {
                    *in_basket = snapshot.items.iter().any(|item| item.id == product.id);
                }
                _ => {}
            }
        }

        if snapshot.count == 0
            && matches!(
                self.checkout.stage(),
                CheckoutStage::EnteringOrder | CheckoutStage::EnteringContacts
            )
        {
            tracing::debug!("cart emptied during checkout");
            self.checkout.reset();
        }
    }
}

impl Drop for Orchestrator {
    fn drop(&mut self) {
        self.unwire();
    }
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("modal", &self.modal)
            .field("locked", &self.locked)
            .field("in_flight", &self.in_flight.borrow().len())
            .finish_non_exhaustive()
    }
}

/// Convenience publishers for intents, as emitted by the UI
pub mod intents {
    use super::{EventBus, PaymentMethod, ProductId, ShopEvent};
    use storefront_core::types::CloseReason;

    /// `product:select`
    pub fn select_product(bus: &EventBus, id: &str) {
        bus.publish(ShopEvent::ProductSelect { id: ProductId::new(id) });
    }

    /// `basket:add`
    pub fn add_to_basket(bus: &EventBus, id: &str) {
        bus.publish(ShopEvent::BasketAdd { id: ProductId::new(id) });
    }

    /// `order:payment`
    pub fn choose_payment(bus: &EventBus, method: PaymentMethod) {
        bus.publish(ShopEvent::OrderPayment { method });
    }

    /// `order:address`
    pub fn enter_address(bus: &EventBus, address: &str) {
        bus.publish(ShopEvent::OrderAddress {
            address: address.to_string(),
        });
    }

    /// `contacts:email` followed by `contacts:phone`
    pub fn enter_contacts(bus: &EventBus, email: &str, phone: &str) {
        bus.publish(ShopEvent::ContactsEmail {
            email: email.to_string(),
        });
        bus.publish(ShopEvent::ContactsPhone {
            phone: phone.to_string(),
        });
    }

    /// `modal:close`
    pub fn dismiss(bus: &EventBus, reason: CloseReason) {
        bus.publish(ShopEvent::ModalClose { reason });
    }
}
