//! # Storefront Testing
//!
//! Testing utilities and helpers for the storefront state layer.
//!
//! This crate provides:
//! - Mock implementations of the collaborator traits ([`MockShopApi`],
//!   [`FixedClock`]) and a [`RecordingPublisher`] that captures events
//! - Product fixtures
//! - Property-based testing strategies for cart operations
//! - The [`ReducerTest`] harness for reducers
//!
//! ## Example
//!
//! ```
//! use std::rc::Rc;
//! use storefront_core::event::Topic;
//! use storefront_core::event_bus::EventPublisher;
//! use storefront_testing::{RecordingPublisher, product};
//!
//! let events = Rc::new(RecordingPublisher::new());
//! events.publish(storefront_core::event::ShopEvent::BasketOpen);
//!
//! assert_eq!(events.topics(), vec![Topic::BasketOpen]);
//! assert_eq!(product("a", Some(100)).price, Some(100));
//! ```

use chrono::{DateTime, Utc};
use storefront_core::environment::Clock;

/// Ergonomic reducer testing utilities
pub mod reducer_test;

pub use reducer_test::{ReducerTest, assertions};

/// Mock implementations of Environment traits
pub mod mocks {
    use super::{Clock, DateTime, Utc};
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Mutex, PoisonError};
    use storefront_core::api::{ApiFuture, ShopApi};
    use storefront_core::error::ApiError;
    use storefront_core::event::{ShopEvent, Topic};
    use storefront_core::event_bus::EventPublisher;
    use storefront_core::types::{OrderRequest, OrderResult, Product};
    use tokio::sync::watch;

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use storefront_testing::mocks::FixedClock;
    /// use storefront_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// assert_eq!(clock.now(), clock.now());
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    ///
    /// # Panics
    ///
    /// This function will panic if the hardcoded timestamp fails to parse,
    /// which should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(
            DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
                .expect("hardcoded timestamp should always parse")
                .with_timezone(&Utc),
        )
    }

    /// Publisher that records every event instead of delivering it
    #[derive(Debug, Default)]
    pub struct RecordingPublisher {
        events: RefCell<Vec<ShopEvent>>,
    }

    impl RecordingPublisher {
        /// Create an empty recorder
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        /// Every recorded event, oldest first
        #[must_use]
        pub fn events(&self) -> Vec<ShopEvent> {
            self.events.borrow().clone()
        }

        /// Most recent event
        #[must_use]
        pub fn last(&self) -> Option<ShopEvent> {
            self.events.borrow().last().cloned()
        }

        /// Topics of the recorded events, oldest first
        #[must_use]
        pub fn topics(&self) -> Vec<Topic> {
            self.events.borrow().iter().map(ShopEvent::topic).collect()
        }

        /// Recorded events on `topic`
        #[must_use]
        pub fn of_topic(&self, topic: Topic) -> Vec<ShopEvent> {
            self.events
                .borrow()
                .iter()
                .filter(|event| event.topic() == topic)
                .cloned()
                .collect()
        }

        /// Number of recorded events
        #[must_use]
        pub fn len(&self) -> usize {
            self.events.borrow().len()
        }

        /// Whether nothing was recorded
        #[must_use]
        pub fn is_empty(&self) -> bool {
            self.events.borrow().is_empty()
        }

        /// Forget everything recorded so far
        pub fn clear(&self) {
            self.events.borrow_mut().clear();
        }
    }

    impl EventPublisher for RecordingPublisher {
        fn publish(&self, event: ShopEvent) {
            self.events.borrow_mut().push(event);
        }
    }

    /// Scripted shop backend.
    ///
    /// Serves a fixed product list and answers orders from a queue of scripted
    /// responses, falling back to success with a generated id. Orders can be
    /// held in flight with [`hold_orders`](Self::hold_orders) to observe the
    /// `Submitting` stage.
    #[derive(Debug)]
    pub struct MockShopApi {
        products: Mutex<Result<Vec<Product>, ApiError>>,
        responses: Mutex<VecDeque<Result<OrderResult, ApiError>>>,
        orders: Mutex<Vec<OrderRequest>>,
        product_calls: AtomicUsize,
        gate: watch::Sender<bool>,
    }

    impl Default for MockShopApi {
        fn default() -> Self {
            Self::new()
        }
    }

    impl MockShopApi {
        /// Backend with no products that accepts every order
        #[must_use]
        pub fn new() -> Self {
            let (gate, _) = watch::channel(false);
            Self {
                products: Mutex::new(Ok(Vec::new())),
                responses: Mutex::new(VecDeque::new()),
                orders: Mutex::new(Vec::new()),
                product_calls: AtomicUsize::new(0),
                gate,
            }
        }

        /// Serve `products` from `get_product_list`
        #[must_use]
        pub fn with_products(self, products: Vec<Product>) -> Self {
            *self.products.lock().unwrap_or_else(PoisonError::into_inner) = Ok(products);
            self
        }

        /// Fail every `get_product_list` call with `error`
        #[must_use]
        pub fn with_product_error(self, error: ApiError) -> Self {
            *self.products.lock().unwrap_or_else(PoisonError::into_inner) = Err(error);
            self
        }

        /// Queue the response for the next unanswered order
        pub fn push_order_response(&self, response: Result<OrderResult, ApiError>) {
            self.responses
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push_back(response);
        }

        /// Make the next order fail with `error`
        pub fn fail_next_order(&self, error: ApiError) {
            self.push_order_response(Err(error));
        }

        /// Keep subsequent orders pending until [`release_orders`](Self::release_orders)
        pub fn hold_orders(&self) {
            self.gate.send_replace(true);
        }

        /// Let held orders complete
        pub fn release_orders(&self) {
            self.gate.send_replace(false);
        }

        /// Every order received, oldest first
        #[must_use]
        pub fn orders(&self) -> Vec<OrderRequest> {
            self.orders
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone()
        }

        /// Number of `create_order` calls
        #[must_use]
        pub fn order_calls(&self) -> usize {
            self.orders
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .len()
        }

        /// Number of `get_product_list` calls
        #[must_use]
        pub fn product_calls(&self) -> usize {
            self.product_calls.load(Ordering::SeqCst)
        }
    }

    impl ShopApi for MockShopApi {
        fn get_product_list(&self) -> ApiFuture<'_, Vec<Product>> {
            self.product_calls.fetch_add(1, Ordering::SeqCst);
            let result = self
                .products
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone();
            Box::pin(async move { result })
        }

        fn create_order(&self, request: OrderRequest) -> ApiFuture<'_, OrderResult> {
            let response = {
                let mut orders = self.orders.lock().unwrap_or_else(PoisonError::into_inner);
                orders.push(request.clone());
                let scripted = self
                    .responses
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .pop_front();
                scripted.unwrap_or_else(|| {
                    Ok(OrderResult {
                        id: format!("order-{}", orders.len()),
                        total: request.total,
                    })
                })
            };
            let mut gate = self.gate.subscribe();

            Box::pin(async move {
                // Only errs once the mock is dropped
                let _ = gate.wait_for(|held| !*held).await;
                response
            })
        }
    }
}

/// Test helpers and fixtures
pub mod helpers {
    use storefront_core::types::{Product, ProductId};

    /// Product with a predictable title and image
    #[must_use]
    pub fn product(id: &str, price: Option<u64>) -> Product {
        Product {
            id: ProductId::new(id),
            title: format!("Product {id}"),
            description: String::new(),
            category: "other".to_string(),
            image: format!("/{id}.svg"),
            price,
        }
    }

    /// Small catalog with one priceless product (`"priceless"`)
    #[must_use]
    pub fn sample_catalog() -> Vec<Product> {
        vec![
            product("hour", Some(750)),
            product("snack", Some(1450)),
            product("priceless", None),
            product("mask", Some(2500)),
        ]
    }

    /// Install a test-friendly tracing subscriber. Safe to call repeatedly.
    pub fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "warn".into()),
            )
            .with_test_writer()
            .try_init();
    }
}

/// Property-based testing utilities using proptest.
pub mod properties {
    use crate::helpers::product;
    use proptest::prelude::*;
    use storefront_core::types::{Product, ProductId};

    /// One cart mutation
    #[derive(Clone, Debug)]
    pub enum CartOp {
        /// Add a product
        Add(Product),
        /// Remove by id
        Remove(ProductId),
        /// Empty the cart
        Clear,
    }

    /// Id drawn from a small pool so duplicates and removals hit
    pub fn arb_product_id() -> impl Strategy<Value = String> {
        prop::sample::select(vec!["a", "b", "c", "d", "e"]).prop_map(str::to_string)
    }

    /// Product with an optional price
    pub fn arb_product() -> impl Strategy<Value = Product> {
        (arb_product_id(), prop::option::weighted(0.8, 0u64..10_000))
            .prop_map(|(id, price)| product(&id, price))
    }

    /// Random cart mutation, adds weighted highest
    pub fn arb_cart_op() -> impl Strategy<Value = CartOp> {
        prop_oneof![
            4 => arb_product().prop_map(CartOp::Add),
            2 => arb_product_id().prop_map(|id| CartOp::Remove(ProductId::new(id))),
            1 => Just(CartOp::Clear),
        ]
    }
}

// Re-export commonly used items
pub use helpers::{init_tracing, product, sample_catalog};
pub use mocks::{FixedClock, MockShopApi, RecordingPublisher, test_clock};
