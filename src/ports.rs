//! Boundary contracts for the external managed services.
//!
//! Every failure crossing one of these traits is already converted to a
//! [`StorefrontError`](crate::StorefrontError) variant; raw transport errors
//! never reach the callers.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::Result;

/// Collection names used in the document store.
pub mod collections {
    pub const PRODUCTS: &str = "products";
    pub const CATEGORIES: &str = "categories";
    pub const SUB_CATEGORIES: &str = "sub-categories";
    pub const COLORS: &str = "colors";
    pub const CAROUSEL: &str = "carousel-items";
    pub const STORE_LOCATIONS: &str = "store-locations";
    pub const ORDERS: &str = "orders";
    pub const USER_CARTS: &str = "user-carts";
}

/// A document read back from the store: opaque id plus JSON body.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Document {
    pub id: String,
    pub data: Value,
}

/// Key-value document store, Firestore-shaped: named collections of JSON
/// documents with store-assigned ids.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Inserts a document and returns the generated id.
    async fn insert(&self, collection: &str, data: Value) -> Result<String>;

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>>;

    async fn query(&self, collection: &str) -> Result<Vec<Document>>;

    /// Shallow-merges `patch` into the existing document, creating it when
    /// absent (upsert).
    async fn update(&self, collection: &str, id: &str, patch: Value) -> Result<()>;

    async fn delete(&self, collection: &str, id: &str) -> Result<()>;
}

/// Transactional order-confirmation email. Called at most once per
/// completed checkout.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, recipient: &str, customer_name: &str, order_id: &str) -> Result<()>;
}

/// External image-hosting API: raw bytes in, public URL out. No retries;
/// callers surface the failure.
#[async_trait]
pub trait ImageUploader: Send + Sync {
    async fn upload(&self, bytes: Vec<u8>) -> Result<String>;
}

/// Identity as verified by the external auth provider. The service never
/// checks credentials itself; it receives an already-verified identity at
/// sign-in.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserIdentity {
    pub id: String,
    pub email: String,
    pub display_name: Option<String>,
}

impl UserIdentity {
    /// Name used in notifications, falling back when the provider has none.
    pub fn customer_name(&self) -> &str {
        self.display_name.as_deref().unwrap_or("Customer")
    }
}
