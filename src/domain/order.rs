//! Order snapshots.
//!
//! An order is written once at checkout and never mutated afterwards; its
//! totals are historical facts that stay fixed even if pricing rules change
//! later.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Fulfillment path chosen by the shopper; drives required fields and fees.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum CheckoutMethod {
    #[serde(rename = "cod")]
    CashOnDelivery,
    #[serde(rename = "store-pickup")]
    StorePickup,
}

#[derive(Clone, Debug, Serialize, Deserialize, Validate, PartialEq, Eq)]
pub struct ContactInfo {
    #[validate(length(min = 1, message = "full name is required"))]
    pub full_name: String,
    #[validate(email(message = "invalid email address"))]
    pub email: String,
    #[validate(length(min = 7, message = "phone number is required"))]
    pub phone: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, Validate, PartialEq, Eq)]
pub struct ShippingAddress {
    #[validate(length(min = 1, message = "address is required"))]
    pub address: String,
    #[validate(length(min = 1, message = "city is required"))]
    pub city: String,
    #[validate(length(min = 1, message = "postal code is required"))]
    pub postal_code: String,
    #[validate(length(min = 1, message = "country is required"))]
    pub country: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct PickupInfo {
    pub store_location: String,
    pub pickup_date: NaiveDate,
}

/// One order line, frozen at submission time with the discount already
/// applied to the unit price.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct OrderLine {
    pub product_id: String,
    pub title: String,
    pub unit_price: Decimal,
    pub quantity: u32,
    pub line_total: Decimal,
}

/// Invariant: `total = subtotal + shipping_fee + tax + cod_fee`, all rounded
/// to two decimals at submission time.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Order {
    /// Assigned by the document store on insert; not part of the stored
    /// document body.
    #[serde(skip)]
    pub id: String,
    pub items: Vec<OrderLine>,
    pub method: CheckoutMethod,
    pub contact: ContactInfo,
    pub shipping: Option<ShippingAddress>,
    pub pickup: Option<PickupInfo>,
    pub subtotal: Decimal,
    pub shipping_fee: Decimal,
    pub tax: Decimal,
    pub cod_fee: Decimal,
    pub total: Decimal,
    /// Purchaser email from the signed-in identity (may differ from the
    /// contact email).
    pub email: String,
    pub created_at: DateTime<Utc>,
}
