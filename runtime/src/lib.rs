//! # Storefront Runtime
//!
//! Stores and coordination for the storefront state layer.
//!
//! This crate owns all mutable state. Each store holds one slice of it and
//! publishes a snapshot on the bus after every change; the orchestrator turns
//! UI intents into store calls and sequences the checkout.
//!
//! ## Core Components
//!
//! - **[`CatalogStore`]**: product list and the inspected product
//! - **[`CartStore`]**: line items with derived count and total
//! - **[`CheckoutStore`]**: buyer data and the checkout state machine, driven
//!   by the pure [`CheckoutReducer`]
//! - **[`Orchestrator`]**: intent handling, modal slot, page lock
//! - **[`HttpShopApi`]**: the shop backend over HTTP
//!
//! ## Example
//!
//! ```no_run
//! use std::rc::Rc;
//! use std::sync::Arc;
//! use storefront_core::environment::SystemClock;
//! use storefront_core::event_bus::EventBus;
//! use storefront_runtime::{HttpShopApi, Orchestrator, StorefrontConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = StorefrontConfig::from_env();
//! let bus = Rc::new(EventBus::new());
//! let api = Arc::new(HttpShopApi::from_config(&config)?);
//!
//! let shop = Orchestrator::from_config(bus, api, Arc::new(SystemClock), &config);
//! shop.wire();
//! shop.load_catalog().await;
//!
//! // ... UI publishes intents on the bus ...
//!
//! shop.settle().await;
//! # Ok(())
//! # }
//! ```

/// Cart store
pub mod cart;

/// Catalog store
pub mod catalog;

/// Checkout reducer and store
pub mod checkout;

/// Environment-driven configuration
pub mod config;

/// HTTP shop backend
pub mod http;

/// Prometheus metrics
pub mod metrics;

/// Intent handling and modal coordination
pub mod orchestrator;

pub use cart::CartStore;
pub use catalog::CatalogStore;
pub use checkout::{
    CheckoutAction, CheckoutEnvironment, CheckoutReducer, CheckoutState, CheckoutStore,
    InFlightSubmission, PendingSubmission,
};
pub use config::StorefrontConfig;
pub use http::HttpShopApi;
pub use orchestrator::Orchestrator;
