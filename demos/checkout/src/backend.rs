//! In-memory shop backend for offline runs

use std::sync::atomic::{AtomicU64, Ordering};
use storefront_core::api::{ApiFuture, ShopApi};
use storefront_core::types::{OrderRequest, OrderResult, Product, ProductId};

/// Serves a fixed catalog and accepts every order
#[derive(Debug)]
pub struct InMemoryShop {
    products: Vec<Product>,
    next_order: AtomicU64,
}

impl InMemoryShop {
    #[must_use]
    pub const fn new(products: Vec<Product>) -> Self {
        Self {
            products,
            next_order: AtomicU64::new(1),
        }
    }

    /// A handful of products, one of them not for sale
    #[must_use]
    pub fn seeded() -> Self {
        Self::new(vec![
            item("hour", "Hourglass", "other", Some(750)),
            item("snack", "Space snack", "soft-skill", Some(1450)),
            item("priceless", "Priceless thing", "other", None),
            item("mask", "Mask", "hard-skill", Some(2500)),
        ])
    }
}

fn item(id: &str, title: &str, category: &str, price: Option<u64>) -> Product {
    Product {
        id: ProductId::new(id),
        title: title.to_string(),
        description: String::new(),
        category: category.to_string(),
        image: format!("/{id}.svg"),
        price,
    }
}

impl ShopApi for InMemoryShop {
    fn get_product_list(&self) -> ApiFuture<'_, Vec<Product>> {
        let products = self.products.clone();
        Box::pin(async move { Ok(products) })
    }

    fn create_order(&self, request: OrderRequest) -> ApiFuture<'_, OrderResult> {
        let number = self.next_order.fetch_add(1, Ordering::Relaxed);
        Box::pin(async move {
            tracing::info!(items = request.items.len(), total = request.total, "order received");
            Ok(OrderResult {
                id: format!("demo-{number}"),
                total: request.total,
            })
        })
    }
}
