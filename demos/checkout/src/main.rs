//! Checkout Demo
//!
//! Drives a full purchase through the storefront state layer the way a UI
//! would: only by publishing intents on the bus and reading published state.
//!
//! # Running the Example
//!
//! ```bash
//! cargo run -p storefront-demo
//! ```
//!
//! By default the shop backend is an in-memory mock seeded with a sample
//! catalog. Set `STOREFRONT_LIVE=1` to talk to `STOREFRONT_API_URL` instead.

#![allow(missing_docs)]

mod backend;

use anyhow::Context;
use backend::InMemoryShop;
use std::rc::Rc;
use std::sync::Arc;
use storefront_core::api::ShopApi;
use storefront_core::environment::SystemClock;
use storefront_core::event::{ShopEvent, Topic};
use storefront_core::event_bus::EventBus;
use storefront_core::types::PaymentMethod;
use storefront_runtime::metrics::MetricsExporter;
use storefront_runtime::orchestrator::intents;
use storefront_runtime::{HttpShopApi, Orchestrator, StorefrontConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    let config = StorefrontConfig::from_env();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(&config.log_level))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(api = %config.api_url, cdn = %config.cdn_url, "Starting checkout demo");

    let mut exporter = MetricsExporter::new();
    exporter.install().context("installing metrics recorder")?;

    let api: Arc<dyn ShopApi> = if std::env::var("STOREFRONT_LIVE").is_ok() {
        tracing::info!("Using live shop backend");
        Arc::new(HttpShopApi::from_config(&config).context("building HTTP client")?)
    } else {
        tracing::info!("Using in-memory shop backend");
        Arc::new(InMemoryShop::seeded())
    };

    run(config, api).await?;

    if let Some(rendered) = exporter.render() {
        println!("{rendered}");
    }
    Ok(())
}

async fn run(config: StorefrontConfig, api: Arc<dyn ShopApi>) -> anyhow::Result<()> {
    let bus = Rc::new(EventBus::new());
    for topic in Topic::ALL {
        bus.subscribe(topic, log_event);
    }

    let shop = Orchestrator::from_config(Rc::clone(&bus), api, Arc::new(SystemClock), &config);
    shop.wire();
    shop.load_catalog().await;

    let pick = shop
        .catalog()
        .products()
        .into_iter()
        .find(|product| !product.is_priceless())
        .context("catalog has no purchasable product")?;
    tracing::info!(product = %pick.id, title = %pick.title, "Picked a product");

    intents::select_product(&bus, pick.id.as_str());
    intents::add_to_basket(&bus, pick.id.as_str());
    bus.publish(ShopEvent::BasketOpen);
    bus.publish(ShopEvent::OrderOpen);

    intents::choose_payment(&bus, PaymentMethod::Card);
    intents::enter_address(&bus, "1 Example Street");
    bus.publish(ShopEvent::OrderSubmit);

    intents::enter_contacts(&bus, "buyer@example.com", "+1 555 0100");
    bus.publish(ShopEvent::ContactsSubmit);

    shop.settle().await;

    match shop.checkout().last_order() {
        Some(order) => tracing::info!(order = %order.id, total = order.total, "Order placed"),
        None => {
            let snapshot = shop.checkout().snapshot();
            tracing::warn!(
                stage = ?snapshot.stage,
                error = ?snapshot.submission_error,
                "Checkout did not complete"
            );
        }
    }

    bus.publish(ShopEvent::SuccessClose);
    tracing::info!(
        locked = shop.is_page_locked(),
        cart = shop.cart().count(),
        "Demo finished"
    );
    Ok(())
}

fn log_event(event: &ShopEvent) {
    if event.topic().is_intent() {
        tracing::info!(topic = %event.topic(), "intent");
    } else {
        tracing::debug!(topic = %event.topic(), ?event, "state");
    }
}
