//! Collaborator trait for the shop backend.
//!
//! The stores never talk to the network. The orchestrator fetches the product
//! list and the checkout effect submits orders through a [`ShopApi`], so tests
//! can substitute a scripted implementation and production can plug in HTTP.

use crate::error::ApiError;
use crate::types::{OrderRequest, OrderResult, Product};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;

/// Boxed future returned by [`ShopApi`] methods
pub type ApiFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, ApiError>> + Send + 'a>>;

/// Shop backend operations.
///
/// # Dyn Compatibility
///
/// Methods return boxed futures so the trait can be used as
/// `Arc<dyn ShopApi>` inside reducer environments.
pub trait ShopApi: Send + Sync {
    /// Fetch the full product list
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] when the request fails or the body cannot be decoded.
    fn get_product_list(&self) -> ApiFuture<'_, Vec<Product>>;

    /// Submit an order
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] when the backend rejects the order or is unreachable.
    fn create_order(&self, request: OrderRequest) -> ApiFuture<'_, OrderResult>;
}

/// Paged product list as returned by `GET /product`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductListResponse {
    /// Total number of products on the backend
    #[serde(default)]
    pub total: u64,
    /// Products in this page
    pub items: Vec<Product>,
}
