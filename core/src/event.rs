//! The closed event catalog shared by publishers and subscribers.
//!
//! Every message that crosses the bus is a [`ShopEvent`] variant. Subscribers
//! register against a [`Topic`], and [`ShopEvent::topic`] maps each variant to
//! exactly one topic, so an event can never be published under the wrong name.
//!
//! # Event Groups
//!
//! - **State changes**: emitted by the stores after a mutation, carrying a
//!   snapshot: `catalog:updated`, `product:selected`, `cart:updated`,
//!   `checkout:updated`, `order:placed`
//! - **Page chrome**: emitted by the orchestrator: `modal:open`,
//!   `modal:close`, `page:locked`
//! - **Intents**: emitted by the UI: everything else
//!
//! # Wire Format
//!
//! Events serialize adjacently tagged, using the topic name as the tag:
//!
//! ```
//! use storefront_core::event::ShopEvent;
//!
//! let json = serde_json::to_string(&ShopEvent::PageLocked { locked: true }).unwrap();
//! assert_eq!(json, r#"{"event":"page:locked","payload":{"locked":true}}"#);
//! ```

use crate::types::{
    CartSnapshot, CheckoutSnapshot, CloseReason, ModalView, PaymentMethod, PlacedOrder, Product,
    ProductId,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Subscription key: one per [`ShopEvent`] variant
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[allow(missing_docs)] // Each variant is documented by its wire name
pub enum Topic {
    CatalogUpdated,
    ProductSelected,
    CartUpdated,
    CheckoutUpdated,
    OrderPlaced,
    PageLocked,
    ModalOpen,
    ModalClose,
    ProductSelect,
    BasketAdd,
    BasketRemove,
    CardRemove,
    BasketOpen,
    OrderOpen,
    OrderPayment,
    OrderAddress,
    OrderSubmit,
    ContactsEmail,
    ContactsPhone,
    ContactsSubmit,
    SuccessClose,
}

impl Topic {
    /// Every topic, in declaration order
    pub const ALL: [Self; 21] = [
        Self::CatalogUpdated,
        Self::ProductSelected,
        Self::CartUpdated,
        Self::CheckoutUpdated,
        Self::OrderPlaced,
        Self::PageLocked,
        Self::ModalOpen,
        Self::ModalClose,
        Self::ProductSelect,
        Self::BasketAdd,
        Self::BasketRemove,
        Self::CardRemove,
        Self::BasketOpen,
        Self::OrderOpen,
        Self::OrderPayment,
        Self::OrderAddress,
        Self::OrderSubmit,
        Self::ContactsEmail,
        Self::ContactsPhone,
        Self::ContactsSubmit,
        Self::SuccessClose,
    ];

    /// Wire name of the topic
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CatalogUpdated => "catalog:updated",
            Self::ProductSelected => "product:selected",
            Self::CartUpdated => "cart:updated",
            Self::CheckoutUpdated => "checkout:updated",
            Self::OrderPlaced => "order:placed",
            Self::PageLocked => "page:locked",
            Self::ModalOpen => "modal:open",
            Self::ModalClose => "modal:close",
            Self::ProductSelect => "product:select",
            Self::BasketAdd => "basket:add",
            Self::BasketRemove => "basket:remove",
            Self::CardRemove => "card:remove",
            Self::BasketOpen => "basket:open",
            Self::OrderOpen => "order:open",
            Self::OrderPayment => "order:payment",
            Self::OrderAddress => "order:address",
            Self::OrderSubmit => "order:submit-intent",
            Self::ContactsEmail => "contacts:email",
            Self::ContactsPhone => "contacts:phone",
            Self::ContactsSubmit => "contacts:submit-intent",
            Self::SuccessClose => "success:close",
        }
    }

    /// Whether the topic carries a user intent emitted by the UI
    #[must_use]
    pub const fn is_intent(self) -> bool {
        !matches!(
            self,
            Self::CatalogUpdated
                | Self::ProductSelected
                | Self::CartUpdated
                | Self::CheckoutUpdated
                | Self::OrderPlaced
                | Self::PageLocked
                | Self::ModalOpen
                | Self::ModalClose
        )
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A message on the storefront bus
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "payload")]
pub enum ShopEvent {
    // ========== State changes ==========
    /// The product list was replaced
    #[serde(rename = "catalog:updated")]
    CatalogUpdated {
        /// Full product list
        products: Vec<Product>,
        /// Currently inspected product, if any
        selected: Option<Product>,
    },

    /// The inspected product changed
    #[serde(rename = "product:selected")]
    ProductSelected {
        /// Newly inspected product, `None` when the selection was cleared
        product: Option<Product>,
    },

    /// The cart changed
    #[serde(rename = "cart:updated")]
    CartUpdated(CartSnapshot),

    /// Buyer data, stage or validation changed
    #[serde(rename = "checkout:updated")]
    CheckoutUpdated(CheckoutSnapshot),

    /// The backend accepted an order
    #[serde(rename = "order:placed")]
    OrderPlaced {
        /// The accepted order
        order: PlacedOrder,
    },

    // ========== Page chrome ==========
    /// The page scroll lock changed
    #[serde(rename = "page:locked")]
    PageLocked {
        /// Whether scrolling is locked
        locked: bool,
    },

    /// A modal was opened (replacing any open one)
    #[serde(rename = "modal:open")]
    ModalOpen {
        /// What the modal shows
        view: ModalView,
    },

    /// The modal was dismissed
    #[serde(rename = "modal:close")]
    ModalClose {
        /// Which path closed it
        reason: CloseReason,
    },

    // ========== Intents ==========
    /// User opened a catalog card
    #[serde(rename = "product:select")]
    ProductSelect {
        /// Product to inspect
        id: ProductId,
    },

    /// User pressed "buy" in the preview
    #[serde(rename = "basket:add")]
    BasketAdd {
        /// Product to add
        id: ProductId,
    },

    /// User removed a line inside the basket view
    #[serde(rename = "basket:remove")]
    BasketRemove {
        /// Product to remove
        id: ProductId,
    },

    /// User pressed "remove" in the preview
    #[serde(rename = "card:remove")]
    CardRemove {
        /// Product to remove
        id: ProductId,
    },

    /// User opened the basket
    #[serde(rename = "basket:open")]
    BasketOpen,

    /// User started checkout from the basket
    #[serde(rename = "order:open")]
    OrderOpen,

    /// User picked a payment method
    #[serde(rename = "order:payment")]
    OrderPayment {
        /// Chosen method
        method: PaymentMethod,
    },

    /// User edited the address
    #[serde(rename = "order:address")]
    OrderAddress {
        /// Current input value
        address: String,
    },

    /// User submitted the order step
    #[serde(rename = "order:submit-intent")]
    OrderSubmit,

    /// User edited the email
    #[serde(rename = "contacts:email")]
    ContactsEmail {
        /// Current input value
        email: String,
    },

    /// User edited the phone
    #[serde(rename = "contacts:phone")]
    ContactsPhone {
        /// Current input value
        phone: String,
    },

    /// User submitted the contacts step
    #[serde(rename = "contacts:submit-intent")]
    ContactsSubmit,

    /// User acknowledged the confirmation
    #[serde(rename = "success:close")]
    SuccessClose,
}

impl ShopEvent {
    /// Topic this event is delivered on
    #[must_use]
    pub const fn topic(&self) -> Topic {
        match self {
            Self::CatalogUpdated { .. } => Topic::CatalogUpdated,
            Self::ProductSelected { .. } => Topic::ProductSelected,
            Self::CartUpdated(_) => Topic::CartUpdated,
            Self::CheckoutUpdated(_) => Topic::CheckoutUpdated,
            Self::OrderPlaced { .. } => Topic::OrderPlaced,
            Self::PageLocked { .. } => Topic::PageLocked,
            Self::ModalOpen { .. } => Topic::ModalOpen,
            Self::ModalClose { .. } => Topic::ModalClose,
            Self::ProductSelect { .. } => Topic::ProductSelect,
            Self::BasketAdd { .. } => Topic::BasketAdd,
            Self::BasketRemove { .. } => Topic::BasketRemove,
            Self::CardRemove { .. } => Topic::CardRemove,
            Self::BasketOpen => Topic::BasketOpen,
            Self::OrderOpen => Topic::OrderOpen,
            Self::OrderPayment { .. } => Topic::OrderPayment,
            Self::OrderAddress { .. } => Topic::OrderAddress,
            Self::OrderSubmit => Topic::OrderSubmit,
            Self::ContactsEmail { .. } => Topic::ContactsEmail,
            Self::ContactsPhone { .. } => Topic::ContactsPhone,
            Self::ContactsSubmit => Topic::ContactsSubmit,
            Self::SuccessClose => Topic::SuccessClose,
        }
    }
}
