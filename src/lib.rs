//! Florest Storefront
//!
//! Self-hosted storefront backing a small retail shop: product catalog,
//! per-session cart and favorites, checkout with cash-on-delivery or
//! in-store pickup, and admin CRUD for products, categories and carousel
//! items.
//!
//! Persistence, image hosting and transactional email are external managed
//! services reached through the ports in [`ports`]; the shipped adapters
//! live in [`adapters`].

use serde::Serialize;
use thiserror::Error;

pub mod adapters;
pub mod admin;
pub mod cart_store;
pub mod catalog;
pub mod checkout;
pub mod config;
pub mod domain;
pub mod ports;
pub mod pricing;

// =============================================================================
// Error Types
// =============================================================================

/// One field-level validation failure, suitable for inline form rendering.
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self { field: field.into(), message: message.into() }
    }
}

#[derive(Error, Debug)]
pub enum StorefrontError {
    /// Recoverable form input failure; the caller re-renders field errors.
    #[error("validation failed")]
    Validation(Vec<FieldError>),

    /// Order persist or cart-sync failure; retryable, local state intact.
    #[error("store write failed: {0}")]
    StoreWrite(String),

    /// Catalog/reference-data fetch failure; callers degrade to empty lists.
    #[error("store read failed: {0}")]
    StoreRead(String),

    /// Confirmation email failure; the order itself remains valid.
    #[error("notification failed: {0}")]
    Notification(String),

    /// Favorites, cart sync and checkout require a signed-in user.
    #[error("sign-in required")]
    Unauthenticated,

    /// Image-hosting API failure; surfaced as an admin form error.
    #[error("image upload failed: {0}")]
    Upload(String),

    /// A stored discount label whose leading percentage cannot be parsed.
    #[error("invalid discount format: {0:?}")]
    InvalidDiscountFormat(String),

    /// A second checkout submission while one is still mid-flight.
    #[error("a checkout attempt is already in progress")]
    CheckoutInFlight,
}

pub type Result<T> = std::result::Result<T, StorefrontError>;
