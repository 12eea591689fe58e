//! Domain types shared by the stores, the orchestrator and the collaborators.
//!
//! Every type here is plain owned data: stores hand out clones as snapshots and
//! never expose references into their own state.

use crate::error::CheckoutError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Opaque, unique product identifier as issued by the shop backend
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(String);

impl ProductId {
    /// Creates a `ProductId` from any string-like value
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ProductId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for ProductId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// A catalog product. Immutable once loaded.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    /// Unique identifier
    pub id: ProductId,
    /// Display title
    pub title: String,
    /// Long description shown in the preview
    #[serde(default)]
    pub description: String,
    /// Category label
    pub category: String,
    /// Image reference (relative path until rebased onto the CDN)
    pub image: String,
    /// Price in whole units; `None` marks a priceless product that cannot be bought
    pub price: Option<u64>,
}

impl Product {
    /// Whether the product has no price and therefore cannot be bought
    #[must_use]
    pub const fn is_priceless(&self) -> bool {
        self.price.is_none()
    }

    /// Price contribution to a cart total
    #[must_use]
    pub fn price_or_zero(&self) -> u64 {
        self.price.unwrap_or(0)
    }

    /// Rebases a relative image path onto `base`.
    ///
    /// Empty images and absolute URLs are left untouched.
    #[must_use]
    pub fn with_image_base(mut self, base: &str) -> Self {
        let absolute = self.image.starts_with("http://") || self.image.starts_with("https://");
        if !self.image.is_empty() && !absolute && !base.is_empty() {
            self.image = format!(
                "{}/{}",
                base.trim_end_matches('/'),
                self.image.trim_start_matches('/')
            );
        }
        self
    }
}

/// Payment method chosen on the order step. "Unset" is `Option::None`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    /// Pay online by card
    Card,
    /// Pay cash on delivery
    Cash,
}

impl PaymentMethod {
    /// Wire name of the method
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Card => "card",
            Self::Cash => "cash",
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Step of the checkout state machine
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CheckoutStage {
    /// No checkout in progress
    #[default]
    Idle,
    /// Payment method and address form
    EnteringOrder,
    /// Email and phone form
    EnteringContacts,
    /// Order request in flight
    Submitting,
    /// Order accepted by the backend
    Complete,
}

impl CheckoutStage {
    const fn ordinal(self) -> u8 {
        match self {
            Self::Idle => 0,
            Self::EnteringOrder => 1,
            Self::EnteringContacts => 2,
            Self::Submitting => 3,
            Self::Complete => 4,
        }
    }

    /// Whether moving from `self` to `next` is a legal transition.
    ///
    /// Legal moves are one step forward, a reset to `Idle`, and the
    /// `Submitting → EnteringContacts` step taken when a submission fails.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(next, Self::Idle)
            || next.ordinal() == self.ordinal() + 1
            || matches!((self, next), (Self::Submitting, Self::EnteringContacts))
    }

    /// Whether payment and address may be edited
    #[must_use]
    pub const fn accepts_order_fields(self) -> bool {
        matches!(self, Self::EnteringOrder)
    }

    /// Whether email and phone may be edited
    #[must_use]
    pub const fn accepts_contact_fields(self) -> bool {
        matches!(self, Self::EnteringContacts)
    }
}

/// Buyer field names used as keys of [`FieldErrors`]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum BuyerField {
    /// Payment method
    #[serde(rename = "paymentMethod")]
    Payment,
    /// Delivery address
    #[serde(rename = "address")]
    Address,
    /// Contact email
    #[serde(rename = "email")]
    Email,
    /// Contact phone
    #[serde(rename = "phone")]
    Phone,
}

/// Per-field validation messages. Derived on every validation, never stored.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<BuyerField, String>);

impl FieldErrors {
    /// Creates an empty error set
    #[must_use]
    pub const fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Records a message for `field`, replacing any previous one
    pub fn insert(&mut self, field: BuyerField, message: impl Into<String>) {
        self.0.insert(field, message.into());
    }

    /// Message recorded for `field`
    #[must_use]
    pub fn get(&self, field: BuyerField) -> Option<&str> {
        self.0.get(&field).map(String::as_str)
    }

    /// Whether `field` has an error
    #[must_use]
    pub fn contains(&self, field: BuyerField) -> bool {
        self.0.contains_key(&field)
    }

    /// True when every checked field passed
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of failing fields
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Failing fields in a stable order
    pub fn iter(&self) -> impl Iterator<Item = (BuyerField, &str)> {
        self.0.iter().map(|(field, message)| (*field, message.as_str()))
    }

    /// All messages joined into a single line for form footers.
    ///
    /// Returns an empty string when there are no errors.
    #[must_use]
    pub fn summary(&self) -> String {
        self.0.values().map(String::as_str).collect::<Vec<_>>().join("; ")
    }
}

/// Buyer data collected across the two checkout forms
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuyerFields {
    /// Selected payment method, `None` while unset
    pub payment: Option<PaymentMethod>,
    /// Delivery address
    pub address: String,
    /// Contact email
    pub email: String,
    /// Contact phone
    pub phone: String,
}

impl BuyerFields {
    /// Resets every field to empty
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

/// Immutable view of the cart at one instant
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartSnapshot {
    /// Lines in insertion order
    pub items: Vec<Product>,
    /// Sum of prices, priceless lines counting as zero (saturating)
    pub total: u64,
    /// Number of lines
    pub count: usize,
}

impl CartSnapshot {
    /// Builds a snapshot, deriving `total` and `count` from `items`
    #[must_use]
    pub fn from_items(items: Vec<Product>) -> Self {
        let total = Self::total_of(&items);
        let count = items.len();
        Self {
            items,
            total,
            count,
        }
    }

    /// Sum of prices with priceless lines as zero, clamped at `u64::MAX`
    #[must_use]
    pub fn total_of(items: &[Product]) -> u64 {
        items
            .iter()
            .map(Product::price_or_zero)
            .fold(0, u64::saturating_add)
    }

    /// Item ids in insertion order
    #[must_use]
    pub fn item_ids(&self) -> Vec<ProductId> {
        self.items.iter().map(|item| item.id.clone()).collect()
    }
}

/// Immutable view of the checkout at one instant
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutSnapshot {
    /// Current stage
    pub stage: CheckoutStage,
    /// Buyer data
    pub fields: BuyerFields,
    /// Validation errors of the current stage's form
    pub errors: FieldErrors,
    /// Stage-level message from the last failed submission
    pub submission_error: Option<String>,
}

/// Order body sent to the shop backend
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRequest {
    /// Payment method (always set; unset payment never reaches the wire)
    pub payment: PaymentMethod,
    /// Contact email
    pub email: String,
    /// Contact phone
    pub phone: String,
    /// Delivery address
    pub address: String,
    /// Purchased product ids in cart order
    pub items: Vec<ProductId>,
    /// Cart total captured with `items`
    pub total: u64,
}

impl OrderRequest {
    /// Builds a request from buyer data and a cart snapshot taken together.
    ///
    /// # Errors
    ///
    /// Returns [`CheckoutError::PaymentMethodUnset`] when no payment method was
    /// chosen and [`CheckoutError::EmptyCart`] when the snapshot has no lines.
    pub fn from_snapshots(fields: &BuyerFields, cart: &CartSnapshot) -> Result<Self, CheckoutError> {
        let payment = fields.payment.ok_or(CheckoutError::PaymentMethodUnset)?;
        if cart.items.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }

        Ok(Self {
            payment,
            email: fields.email.trim().to_string(),
            phone: fields.phone.trim().to_string(),
            address: fields.address.trim().to_string(),
            items: cart.item_ids(),
            total: cart.total,
        })
    }
}

/// Backend response to a successful order
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderResult {
    /// Order id assigned by the backend
    pub id: String,
    /// Total charged
    pub total: u64,
}

/// An accepted order as recorded by the checkout store
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacedOrder {
    /// Order id assigned by the backend
    pub id: String,
    /// Total charged
    pub total: u64,
    /// When the acceptance was observed
    pub placed_at: DateTime<Utc>,
}

impl PlacedOrder {
    /// Stamps a backend result with the observation time
    #[must_use]
    pub fn new(result: OrderResult, placed_at: DateTime<Utc>) -> Self {
        Self {
            id: result.id,
            total: result.total,
            placed_at,
        }
    }
}

/// Content of the single modal slot
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModalView {
    /// Product details with the add/remove toggle
    ProductPreview {
        /// Product being inspected
        product: Product,
        /// Whether the product is already in the cart
        in_basket: bool,
    },
    /// Cart contents
    Basket(CartSnapshot),
    /// Payment and address form
    OrderForm,
    /// Email and phone form
    ContactsForm,
    /// Order confirmation
    Success {
        /// Total charged
        total: u64,
    },
}

/// How a modal was dismissed
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CloseReason {
    /// Escape key
    Escape,
    /// Click on the overlay
    Overlay,
    /// Explicit close button
    CloseButton,
    /// Closed by the orchestrator itself
    Programmatic,
}
