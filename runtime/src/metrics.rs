//! Prometheus metrics for the storefront state layer.
//!
//! Counters are recorded through the `metrics` facade everywhere in the
//! workspace; nothing is collected until a recorder is installed. The demo
//! installs one through [`MetricsExporter`] and renders it on exit.
//!
//! # Recorded Metrics
//!
//! - `storefront_events_published_total{topic}`: every bus publish
//! - `storefront_cart_mutations_total{op}`: `add`, `remove`, `clear`
//! - `storefront_orders_submitted_total`: requests handed to the backend
//! - `storefront_orders_failed_total`: submissions that failed
//! - `storefront_orders_completed_total`: submissions the backend accepted
//!
//! # Example
//!
//! ```rust,no_run
//! use storefront_runtime::metrics::MetricsExporter;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut exporter = MetricsExporter::new();
//! exporter.install()?;
//!
//! if let Some(text) = exporter.render() {
//!     println!("{text}");
//! }
//! # Ok(())
//! # }
//! ```

use metrics::{counter, describe_counter};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use thiserror::Error;

/// Errors from metrics operations.
#[derive(Error, Debug)]
pub enum MetricsError {
    /// Failed to install the Prometheus recorder
    #[error("Failed to install metrics recorder: {0}")]
    Install(String),
}

/// In-process Prometheus recorder.
#[derive(Default)]
pub struct MetricsExporter {
    handle: Option<PrometheusHandle>,
}

impl MetricsExporter {
    /// Create an exporter with no recorder installed yet
    #[must_use]
    pub const fn new() -> Self {
        Self { handle: None }
    }

    /// Register descriptions and install the global recorder.
    ///
    /// # Errors
    ///
    /// Returns [`MetricsError::Install`] if a different recorder is already
    /// installed.
    pub fn install(&mut self) -> Result<(), MetricsError> {
        describe();

        match PrometheusBuilder::new().install_recorder() {
            Ok(handle) => {
                self.handle = Some(handle);
                tracing::info!("Metrics recorder installed");
                Ok(())
            }
            Err(e) => {
                let err_msg = e.to_string();
                if err_msg.contains("already initialized") {
                    tracing::warn!("Metrics recorder already initialized, skipping re-initialization");
                    Ok(())
                } else {
                    Err(MetricsError::Install(err_msg))
                }
            }
        }
    }

    /// Render current metrics in Prometheus text format.
    ///
    /// Returns `None` if the recorder hasn't been installed.
    #[must_use]
    pub fn render(&self) -> Option<String> {
        self.handle.as_ref().map(PrometheusHandle::render)
    }
}

impl std::fmt::Debug for MetricsExporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetricsExporter")
            .field("installed", &self.handle.is_some())
            .finish()
    }
}

/// Register all metric descriptions.
pub fn describe() {
    describe_counter!(
        "storefront_events_published_total",
        "Total number of events published on the bus, by topic"
    );
    describe_counter!(
        "storefront_cart_mutations_total",
        "Total number of cart mutations, by operation"
    );
    describe_counter!(
        "storefront_orders_submitted_total",
        "Total number of order requests sent to the backend"
    );
    describe_counter!(
        "storefront_orders_failed_total",
        "Total number of order submissions that failed"
    );
    describe_counter!(
        "storefront_orders_completed_total",
        "Total number of orders accepted by the backend"
    );
}

/// Cart metrics recorder.
pub struct CartMetrics;

impl CartMetrics {
    /// Record a cart mutation (`add`, `remove` or `clear`).
    pub fn record(op: &'static str) {
        counter!("storefront_cart_mutations_total", "op" => op).increment(1);
    }
}

/// Order submission metrics recorder.
pub struct OrderMetrics;

impl OrderMetrics {
    /// Record an order request handed to the backend.
    pub fn record_submitted() {
        counter!("storefront_orders_submitted_total").increment(1);
    }

    /// Record a failed submission.
    pub fn record_failed() {
        counter!("storefront_orders_failed_total").increment(1);
    }

    /// Record an accepted order.
    pub fn record_completed() {
        counter!("storefront_orders_completed_total").increment(1);
    }
}
