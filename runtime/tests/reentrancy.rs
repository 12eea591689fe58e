//! Subscribers calling back into the store that notified them
//!
//! Stores finish mutating and release their state before publishing, so a
//! subscriber may read or even mutate the same store from inside its handler.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)] // Test code can use unwrap/expect/panic

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;
use storefront_core::event::{ShopEvent, Topic};
use storefront_core::event_bus::{EventBus, EventPublisher};
use storefront_core::types::{CheckoutStage, PaymentMethod, ProductId};
use storefront_runtime::{CartStore, CatalogStore, CheckoutEnvironment, CheckoutStore};
use storefront_testing::{MockShopApi, product, test_clock};

fn bus() -> (Rc<EventBus>, Rc<dyn EventPublisher>) {
    let bus = Rc::new(EventBus::new());
    let events: Rc<dyn EventPublisher> = bus.clone();
    (bus, events)
}

#[test]
fn cart_subscriber_sees_fully_updated_state() {
    let (bus, events) = bus();
    let cart = Rc::new(CartStore::new(events));
    let seen = Rc::new(RefCell::new(Vec::new()));

    {
        let cart = Rc::clone(&cart);
        let seen = Rc::clone(&seen);
        bus.subscribe(Topic::CartUpdated, move |event| {
            let ShopEvent::CartUpdated(snapshot) = event else {
                panic!("wrong payload on cart:updated");
            };
            assert_eq!(snapshot.total, cart.total());
            assert_eq!(snapshot.count, cart.count());
            assert_eq!(snapshot.item_ids(), cart.get_item_ids());
            seen.borrow_mut().push(cart.total());
        });
    }

    cart.add_item(product("a", Some(100)));
    cart.add_item(product("b", None));
    cart.remove_item(&ProductId::new("a"));
    cart.clear();

    assert_eq!(*seen.borrow(), vec![100, 100, 0, 0]);
}

#[test]
fn cart_subscriber_may_mutate_the_cart() {
    let (bus, events) = bus();
    let cart = Rc::new(CartStore::new(events));
    let snapshots = Rc::new(RefCell::new(Vec::new()));

    {
        let cart = Rc::clone(&cart);
        bus.subscribe(Topic::CartUpdated, move |event| {
            // A gift is added once anything else is in the cart
            let ShopEvent::CartUpdated(snapshot) = event else {
                return;
            };
            if snapshot.count == 1 && !cart.has_item(&ProductId::new("gift")) {
                cart.add_item(product("gift", Some(0)));
            }
        });
    }
    {
        let snapshots = Rc::clone(&snapshots);
        bus.subscribe(Topic::CartUpdated, move |event| {
            if let ShopEvent::CartUpdated(snapshot) = event {
                snapshots.borrow_mut().push(snapshot.count);
            }
        });
    }

    cart.add_item(product("a", Some(100)));

    assert_eq!(cart.count(), 2);
    // Depth-first: the nested publish is recorded before the outer one finishes
    assert_eq!(*snapshots.borrow(), vec![2, 1]);
}

#[test]
fn catalog_subscriber_reads_selection() {
    let (bus, events) = bus();
    let catalog = Rc::new(CatalogStore::new(events));
    catalog.set_products(vec![product("a", Some(1)), product("b", Some(2))]);
    let matched = Rc::new(RefCell::new(0));

    {
        let catalog = Rc::clone(&catalog);
        let matched = Rc::clone(&matched);
        bus.subscribe(Topic::ProductSelected, move |event| {
            if let ShopEvent::ProductSelected { product } = event {
                assert_eq!(product, &catalog.selected());
                *matched.borrow_mut() += 1;
            }
        });
    }

    catalog.select_product(&ProductId::new("b"));
    catalog.clear_selection();

    assert_eq!(*matched.borrow(), 2);
}

#[test]
fn checkout_subscriber_sees_published_stage() {
    let (bus, events) = bus();
    let env = CheckoutEnvironment::new(Arc::new(MockShopApi::new()), Arc::new(test_clock()));
    let checkout = CheckoutStore::new(env, events);
    let stages = Rc::new(RefCell::new(Vec::new()));

    {
        let checkout = Rc::clone(&checkout);
        let stages = Rc::clone(&stages);
        bus.subscribe(Topic::CheckoutUpdated, move |event| {
            if let ShopEvent::CheckoutUpdated(snapshot) = event {
                assert_eq!(snapshot.stage, checkout.stage());
                assert_eq!(snapshot, &checkout.snapshot());
                stages.borrow_mut().push(snapshot.stage);
            }
        });
    }

    checkout.open();
    checkout.set_payment(PaymentMethod::Cash);
    checkout.set_address("Main St 1");
    checkout.advance_to_contacts();
    checkout.reset();

    assert_eq!(
        *stages.borrow(),
        vec![
            CheckoutStage::EnteringOrder,
            CheckoutStage::EnteringOrder,
            CheckoutStage::EnteringOrder,
            CheckoutStage::EnteringContacts,
            CheckoutStage::Idle,
        ]
    );
}

#[test]
fn checkout_subscriber_may_drive_the_next_step() {
    let (bus, events) = bus();
    let env = CheckoutEnvironment::new(Arc::new(MockShopApi::new()), Arc::new(test_clock()));
    let checkout = CheckoutStore::new(env, events);

    {
        let checkout = Rc::clone(&checkout);
        bus.subscribe(Topic::CheckoutUpdated, move |event| {
            // Auto-advance as soon as the order step becomes valid
            let ShopEvent::CheckoutUpdated(snapshot) = event else {
                return;
            };
            if snapshot.stage == CheckoutStage::EnteringOrder && snapshot.errors.is_empty() {
                assert!(checkout.advance_to_contacts());
            }
        });
    }

    checkout.open();
    checkout.set_payment(PaymentMethod::Card);
    assert_eq!(checkout.stage(), CheckoutStage::EnteringOrder);

    checkout.set_address("Main St 1");
    assert_eq!(checkout.stage(), CheckoutStage::EnteringContacts);
}
