//! HTTP implementation of [`ShopApi`].

use crate::config::StorefrontConfig;
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use storefront_core::api::{ApiFuture, ProductListResponse, ShopApi};
use storefront_core::error::ApiError;
use storefront_core::types::{OrderRequest, OrderResult, Product};

/// Error body returned by the backend on rejected requests
#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

/// Shop backend client over HTTP
#[derive(Clone, Debug)]
pub struct HttpShopApi {
    client: Client,
    base_url: String,
}

impl HttpShopApi {
    /// Create a client for `base_url` with a per-request timeout
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Transport`] if the HTTP client cannot be built.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Create a client from runtime configuration
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Transport`] if the HTTP client cannot be built.
    pub fn from_config(config: &StorefrontConfig) -> Result<Self, ApiError> {
        Self::new(config.api_url.clone(), config.request_timeout())
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url)
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
        match response.status() {
            status if status.is_success() => response
                .json::<T>()
                .await
                .map_err(|e| ApiError::Decode(e.to_string())),
            status => {
                let body = response.text().await.unwrap_or_default();
                let message = serde_json::from_str::<ErrorBody>(&body)
                    .map(|parsed| parsed.error)
                    .unwrap_or(body);
                Err(ApiError::Status {
                    status: status.as_u16(),
                    message,
                })
            }
        }
    }

    async fn fetch_products(&self) -> Result<Vec<Product>, ApiError> {
        let response = self
            .client
            .get(self.url("product"))
            .send()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        let list: ProductListResponse = Self::decode(response).await?;
        tracing::debug!(total = list.total, received = list.items.len(), "product list fetched");
        Ok(list.items)
    }

    async fn post_order(&self, request: OrderRequest) -> Result<OrderResult, ApiError> {
        let response = self
            .client
            .post(self.url("order"))
            .json(&request)
            .send()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        if response.status() == StatusCode::TOO_MANY_REQUESTS {
            tracing::warn!("order endpoint is rate limiting");
        }
        Self::decode(response).await
    }
}

impl ShopApi for HttpShopApi {
    fn get_product_list(&self) -> ApiFuture<'_, Vec<Product>> {
        Box::pin(self.fetch_products())
    }

    fn create_order(&self, request: OrderRequest) -> ApiFuture<'_, OrderResult> {
        Box::pin(self.post_order(request))
    }
}
