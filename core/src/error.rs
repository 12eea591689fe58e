//! Error types for the storefront state layer.
//!
//! Field validation failures are not errors in this sense: they are
//! [`FieldErrors`](crate::types::FieldErrors) values recomputed on every edit.
//! The types here cover the two cases that must stop an operation outright.

use thiserror::Error;

/// Integrity failures detected while building an outbound order.
///
/// These are raised at the one boundary that cannot proceed (building the
/// request). The request is never sent when one of them occurs.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CheckoutError {
    /// Buyer data was read before any payment method was chosen
    #[error("Payment method is not set")]
    PaymentMethodUnset,

    /// The cart snapshot has no lines
    #[error("Cannot place an order for an empty cart")]
    EmptyCart,
}

/// Failures reported by a [`ShopApi`](crate::api::ShopApi) implementation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// The request never produced a response (connect, DNS, timeout)
    #[error("Transport error: {0}")]
    Transport(String),

    /// The backend answered with a non-success status
    #[error("Backend returned {status}: {message}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Response body or backend error message
        message: String,
    },

    /// The response body could not be decoded
    #[error("Failed to decode response: {0}")]
    Decode(String),
}

impl ApiError {
    /// Whether retrying the same request may succeed
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::Status { status, .. } => *status >= 500 || *status == 429,
            Self::Decode(_) => false,
        }
    }
}
