//! Per-session cart and favorites store.
//!
//! Local in-memory state is the source of truth for the session. When a
//! signed-in user is present every mutation is mirrored to that user's
//! remote record, best effort: a failed mirror write is reported (and
//! logged) but never rolls back the local change. Concurrent sessions for
//! the same user resolve last-write-wins; there is no merge across tabs.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::catalog::Catalog;
use crate::domain::cart::{Cart, Favorites};
use crate::domain::catalog::Product;
use crate::ports::{collections, DocumentStore, UserIdentity};
use crate::{Result, StorefrontError};

/// Whether a mutation reached the remote record or stayed local (anonymous
/// session, or mirror write failed).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SyncStatus {
    Synced,
    LocalOnly,
}

/// Stored per-user record: product references only, rehydrated against the
/// catalog snapshot on load.
#[derive(Debug, Default, Serialize, Deserialize)]
struct UserCartRecord {
    #[serde(default)]
    cart: Vec<RecordLine>,
    #[serde(default)]
    favorites: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct RecordLine {
    product_id: String,
    quantity: u32,
}

pub struct CartStore {
    store: Arc<dyn DocumentStore>,
    cart: Cart,
    favorites: Favorites,
    user: Option<UserIdentity>,
    /// Bumped on every identity change; a remote load that finishes after a
    /// later change is discarded instead of clobbering fresh state.
    generation: u64,
}

impl CartStore {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store, cart: Cart::new(), favorites: Favorites::default(), user: None, generation: 0 }
    }

    pub fn cart(&self) -> &Cart {
        &self.cart
    }

    pub fn favorites(&self) -> &Favorites {
        &self.favorites
    }

    pub fn user(&self) -> Option<&UserIdentity> {
        self.user.as_ref()
    }

    pub fn cart_count(&self) -> u32 {
        self.cart.count()
    }

    pub fn favorites_count(&self) -> usize {
        self.favorites.count()
    }

    pub async fn add_to_cart(&mut self, product: Product) -> SyncStatus {
        self.cart.add(product);
        self.mirror().await
    }

    pub async fn remove_from_cart(&mut self, product_id: &str) -> SyncStatus {
        self.cart.remove(product_id);
        self.mirror().await
    }

    pub async fn set_quantity(&mut self, product_id: &str, quantity: i64) -> SyncStatus {
        self.cart.set_quantity(product_id, quantity);
        self.mirror().await
    }

    pub async fn clear_cart(&mut self) -> SyncStatus {
        self.cart.clear();
        self.mirror().await
    }

    /// Favorites require a signed-in user; the caller prompts for sign-in on
    /// [`StorefrontError::Unauthenticated`] instead of failing silently.
    pub async fn add_to_favorites(&mut self, product: Product) -> Result<SyncStatus> {
        if self.user.is_none() {
            return Err(StorefrontError::Unauthenticated);
        }
        self.favorites.add(product);
        Ok(self.mirror().await)
    }

    pub async fn remove_from_favorites(&mut self, product_id: &str) -> Result<SyncStatus> {
        if self.user.is_none() {
            return Err(StorefrontError::Unauthenticated);
        }
        self.favorites.remove(product_id);
        Ok(self.mirror().await)
    }

    /// Invoked whenever the auth provider reports a new identity.
    ///
    /// Sign-in loads the user's remote record and merges it under local-wins
    /// semantics (the in-session cart is the write-ahead copy), then mirrors
    /// the merged state back. Sign-out drops all local state.
    pub async fn identity_changed(&mut self, user: Option<UserIdentity>, catalog: &Catalog) {
        self.generation += 1;
        let generation = self.generation;
        match user {
            None => {
                self.user = None;
                self.cart.clear();
                self.favorites.clear();
            }
            Some(user) => {
                let record = self.load_record(&user.id).await;
                if self.generation != generation {
                    // Identity changed again while the load was in flight.
                    return;
                }
                self.user = Some(user);
                self.merge_record(record, catalog);
                self.mirror().await;
            }
        }
    }

    async fn load_record(&self, user_id: &str) -> UserCartRecord {
        let doc = match self.store.get(collections::USER_CARTS, user_id).await {
            Ok(doc) => doc,
            Err(e) => {
                warn!(user_id, error = %e, "failed to load remote cart record");
                return UserCartRecord::default();
            }
        };
        match doc {
            Some(doc) => serde_json::from_value(doc.data).unwrap_or_else(|e| {
                warn!(user_id, error = %e, "malformed remote cart record, starting fresh");
                UserCartRecord::default()
            }),
            None => UserCartRecord::default(),
        }
    }

    fn merge_record(&mut self, record: UserCartRecord, catalog: &Catalog) {
        for line in record.cart {
            if self.cart.items().iter().any(|i| i.product.id == line.product_id) {
                continue; // local quantity wins
            }
            match catalog.product(&line.product_id) {
                Some(product) => {
                    self.cart.add(product.clone());
                    self.cart.set_quantity(&line.product_id, i64::from(line.quantity));
                }
                None => warn!(product_id = %line.product_id, "remote cart references unknown product"),
            }
        }
        for product_id in record.favorites {
            if self.favorites.contains(&product_id) {
                continue;
            }
            match catalog.product(&product_id) {
                Some(product) => self.favorites.add(product.clone()),
                None => warn!(product_id = %product_id, "remote favorites reference unknown product"),
            }
        }
    }

    /// Pushes the current local state to the user's remote record. Anonymous
    /// sessions stay local by design; write failures degrade to local-only.
    async fn mirror(&self) -> SyncStatus {
        let Some(user) = &self.user else {
            return SyncStatus::LocalOnly;
        };
        let record = UserCartRecord {
            cart: self
                .cart
                .items()
                .iter()
                .map(|i| RecordLine { product_id: i.product.id.clone(), quantity: i.quantity })
                .collect(),
            favorites: self.favorites.products().iter().map(|p| p.id.clone()).collect(),
        };
        let data = match serde_json::to_value(&record) {
            Ok(data) => data,
            Err(e) => {
                warn!(error = %e, "failed to encode cart record");
                return SyncStatus::LocalOnly;
            }
        };
        match self.store.update(collections::USER_CARTS, &user.id, data).await {
            Ok(()) => SyncStatus::Synced,
            Err(e) => {
                warn!(user_id = %user.id, error = %e, "cart mirror write failed, keeping local state");
                SyncStatus::LocalOnly
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::MemoryStore;
    use crate::domain::catalog::{CategoryRef, CollectionRef};
    use rust_decimal::Decimal;
    use serde_json::json;

    fn product(id: &str) -> Product {
        Product {
            id: id.into(),
            title: format!("Product {id}"),
            description: String::new(),
            images: vec![],
            base_price: Decimal::from(25),
            discount: None,
            tags: vec![],
            colors: vec![],
            rating: 0.0,
            category: CategoryRef { id: "c1".into(), name: "Hampers".into() },
            collection: CollectionRef { id: "col1".into(), name: "Featured".into() },
            sub_categories: vec![],
        }
    }

    fn user(id: &str) -> UserIdentity {
        UserIdentity {
            id: id.into(),
            email: format!("{id}@example.com"),
            display_name: Some(id.to_uppercase()),
        }
    }

    fn catalog_with(products: Vec<Product>) -> Catalog {
        Catalog { products, ..Catalog::default() }
    }

    #[tokio::test]
    async fn anonymous_mutations_stay_local() {
        let store = Arc::new(MemoryStore::new());
        let mut cart = CartStore::new(store.clone());
        let status = cart.add_to_cart(product("p1")).await;
        assert_eq!(status, SyncStatus::LocalOnly);
        assert_eq!(cart.cart_count(), 1);
        assert!(store.is_empty(collections::USER_CARTS));
    }

    #[tokio::test]
    async fn signed_in_mutations_mirror_to_remote() {
        let store = Arc::new(MemoryStore::new());
        let mut cart = CartStore::new(store.clone());
        cart.identity_changed(Some(user("u1")), &Catalog::default()).await;
        let status = cart.add_to_cart(product("p1")).await;
        assert_eq!(status, SyncStatus::Synced);
        let doc = store.get(collections::USER_CARTS, "u1").await.unwrap().unwrap();
        let record: UserCartRecord = serde_json::from_value(doc.data).unwrap();
        assert_eq!(record.cart.len(), 1);
        assert_eq!(record.cart[0].quantity, 1);
    }

    #[tokio::test]
    async fn mirror_failure_keeps_local_change() {
        let store = Arc::new(MemoryStore::new());
        let mut cart = CartStore::new(store.clone());
        cart.identity_changed(Some(user("u1")), &Catalog::default()).await;
        store.fail_writes(true);
        let status = cart.add_to_cart(product("p1")).await;
        assert_eq!(status, SyncStatus::LocalOnly);
        assert_eq!(cart.cart_count(), 1);
    }

    #[tokio::test]
    async fn favorites_require_sign_in() {
        let store = Arc::new(MemoryStore::new());
        let mut cart = CartStore::new(store);
        assert!(matches!(
            cart.add_to_favorites(product("p1")).await,
            Err(StorefrontError::Unauthenticated)
        ));
        assert!(matches!(
            cart.remove_from_favorites("p1").await,
            Err(StorefrontError::Unauthenticated)
        ));
    }

    #[tokio::test]
    async fn sign_in_merges_remote_record_local_wins() {
        let store = Arc::new(MemoryStore::new());
        store
            .update(
                collections::USER_CARTS,
                "u1",
                json!({
                    "cart": [
                        { "product_id": "p1", "quantity": 5 },
                        { "product_id": "p2", "quantity": 1 },
                        { "product_id": "gone", "quantity": 3 },
                    ],
                    "favorites": ["p2"],
                }),
            )
            .await
            .unwrap();
        let catalog = catalog_with(vec![product("p1"), product("p2")]);

        let mut cart = CartStore::new(store);
        cart.add_to_cart(product("p1")).await; // local quantity 1 beats remote 5
        cart.identity_changed(Some(user("u1")), &catalog).await;

        let quantities: Vec<(String, u32)> = cart
            .cart()
            .items()
            .iter()
            .map(|i| (i.product.id.clone(), i.quantity))
            .collect();
        assert_eq!(quantities, vec![("p1".to_string(), 1), ("p2".to_string(), 1)]);
        assert_eq!(cart.favorites_count(), 1);
    }

    #[tokio::test]
    async fn sign_out_clears_local_state() {
        let store = Arc::new(MemoryStore::new());
        let catalog = Catalog::default();
        let mut cart = CartStore::new(store);
        cart.identity_changed(Some(user("u1")), &catalog).await;
        cart.add_to_cart(product("p1")).await;
        cart.add_to_favorites(product("p2")).await.unwrap();

        cart.identity_changed(None, &catalog).await;
        assert!(cart.cart().is_empty());
        assert_eq!(cart.favorites_count(), 0);
        assert!(cart.user().is_none());
    }
}
