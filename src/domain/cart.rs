//! Cart and favorites, the shopper's in-session mutable state.

use serde::{Deserialize, Serialize};

use super::catalog::Product;

/// One cart entry. Invariant: `quantity >= 1`; an entry reaching zero is
/// removed from the cart, never retained.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct CartItem {
    pub product: Product,
    pub quantity: u32,
}

/// Ordered collection of cart entries, at most one per product id.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Cart {
    items: Vec<CartItem>,
}

impl Cart {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Sum of quantities, not distinct products.
    pub fn count(&self) -> u32 {
        self.items.iter().map(|i| i.quantity).sum()
    }

    /// Increments the existing entry for this product, or inserts a new one
    /// with quantity 1.
    pub fn add(&mut self, product: Product) {
        if let Some(existing) = self.items.iter_mut().find(|i| i.product.id == product.id) {
            existing.quantity = existing.quantity.saturating_add(1);
        } else {
            self.items.push(CartItem { product, quantity: 1 });
        }
    }

    /// Removes the entry if present. Idempotent: removing an absent product
    /// is a no-op, not an error.
    pub fn remove(&mut self, product_id: &str) {
        self.items.retain(|i| i.product.id != product_id);
    }

    /// Sets the quantity for an existing entry; any quantity at or below
    /// zero behaves as removal. Unknown product ids are ignored.
    pub fn set_quantity(&mut self, product_id: &str, quantity: i64) {
        if quantity <= 0 {
            self.remove(product_id);
            return;
        }
        if let Some(item) = self.items.iter_mut().find(|i| i.product.id == product_id) {
            item.quantity = quantity.min(i64::from(u32::MAX)) as u32;
        }
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }
}

/// Favorited products for the signed-in user; a set keyed by product id,
/// insertion-ordered.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Favorites {
    products: Vec<Product>,
}

impl Favorites {
    pub fn products(&self) -> &[Product] {
        &self.products
    }

    /// Distinct product count.
    pub fn count(&self) -> usize {
        self.products.len()
    }

    pub fn contains(&self, product_id: &str) -> bool {
        self.products.iter().any(|p| p.id == product_id)
    }

    pub fn add(&mut self, product: Product) {
        if !self.contains(&product.id) {
            self.products.push(product);
        }
    }

    pub fn remove(&mut self, product_id: &str) {
        self.products.retain(|p| p.id != product_id);
    }

    pub fn clear(&mut self) {
        self.products.clear();
    }
}
