//! Presence-only validation of buyer data.
//!
//! A string field is missing when it is empty after trimming; the payment
//! method is missing when it is unset. No format checks are applied.

use crate::types::{BuyerField, BuyerFields, FieldErrors};

/// Message shown when no payment method is chosen
pub const PAYMENT_REQUIRED: &str = "Select a payment method";
/// Message shown when the address is blank
pub const ADDRESS_REQUIRED: &str = "Enter a delivery address";
/// Message shown when the email is blank
pub const EMAIL_REQUIRED: &str = "Enter an email address";
/// Message shown when the phone is blank
pub const PHONE_REQUIRED: &str = "Enter a phone number";

fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

/// Validates the order step (payment method and address)
#[must_use]
pub fn validate_order(fields: &BuyerFields) -> FieldErrors {
    let mut errors = FieldErrors::new();
    if fields.payment.is_none() {
        errors.insert(BuyerField::Payment, PAYMENT_REQUIRED);
    }
    if is_blank(&fields.address) {
        errors.insert(BuyerField::Address, ADDRESS_REQUIRED);
    }
    errors
}

/// Validates the contacts step (email and phone)
#[must_use]
pub fn validate_contacts(fields: &BuyerFields) -> FieldErrors {
    let mut errors = FieldErrors::new();
    if is_blank(&fields.email) {
        errors.insert(BuyerField::Email, EMAIL_REQUIRED);
    }
    if is_blank(&fields.phone) {
        errors.insert(BuyerField::Phone, PHONE_REQUIRED);
    }
    errors
}
