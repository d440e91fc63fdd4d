//! Catalog snapshot: a read-only view of products and reference data,
//! loaded in one pass from the document store.
//!
//! Loading never fails the caller: a collection that cannot be read
//! degrades to an empty list and individual malformed documents are
//! skipped, both with a warning. Store locations fall back to the built-in
//! list so checkout always has a pickup option.

use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::domain::catalog::{
    CarouselItem, Category, CategoryRef, Color, CollectionRef, Product, StoreLocation, SubCategory,
};
use crate::domain::value_objects::Percent;
use crate::ports::{collections, Document, DocumentStore};

#[derive(Clone, Debug, Default, Serialize)]
pub struct Catalog {
    pub products: Vec<Product>,
    pub categories: Vec<Category>,
    pub sub_categories: Vec<SubCategory>,
    pub colors: Vec<Color>,
    pub carousel: Vec<CarouselItem>,
    pub store_locations: Vec<StoreLocation>,
}

impl Catalog {
    pub async fn load(store: &dyn DocumentStore) -> Catalog {
        let products = fetch(store, collections::PRODUCTS)
            .await
            .into_iter()
            .filter_map(decode_product)
            .collect();
        let categories = decode_collection(fetch(store, collections::CATEGORIES).await);
        let sub_categories = decode_collection(fetch(store, collections::SUB_CATEGORIES).await);
        let colors = decode_collection(fetch(store, collections::COLORS).await);
        let carousel = decode_collection(fetch(store, collections::CAROUSEL).await);
        let mut store_locations: Vec<StoreLocation> =
            decode_collection(fetch(store, collections::STORE_LOCATIONS).await);
        if store_locations.is_empty() {
            store_locations = StoreLocation::fallback();
        }
        Catalog { products, categories, sub_categories, colors, carousel, store_locations }
    }

    pub fn product(&self, id: &str) -> Option<&Product> {
        self.products.iter().find(|p| p.id == id)
    }

    pub fn products_in_category(&self, category_id: &str) -> Vec<&Product> {
        self.products.iter().filter(|p| p.category.id == category_id).collect()
    }

    pub fn store_location(&self, id: &str) -> Option<&StoreLocation> {
        self.store_locations.iter().find(|s| s.id == id)
    }
}

async fn fetch(store: &dyn DocumentStore, collection: &str) -> Vec<Document> {
    match store.query(collection).await {
        Ok(docs) => docs,
        Err(e) => {
            warn!(collection, error = %e, "catalog read failed, degrading to empty");
            Vec::new()
        }
    }
}

fn decode_collection<T: DeserializeOwned>(docs: Vec<Document>) -> Vec<T> {
    docs.into_iter().filter_map(decode).collect()
}

/// Decodes a document body into a record carrying its own `id` field.
fn decode<T: DeserializeOwned>(doc: Document) -> Option<T> {
    let mut data = doc.data;
    if let Some(obj) = data.as_object_mut() {
        obj.insert("id".to_string(), Value::String(doc.id.clone()));
    }
    match serde_json::from_value(data) {
        Ok(record) => Some(record),
        Err(e) => {
            warn!(id = %doc.id, error = %e, "skipping malformed document");
            None
        }
    }
}

/// Raw product document as stored, with the legacy discount representation
/// still possible. This is the only place the `"10% OFF"` label format is
/// accepted.
#[derive(Deserialize)]
struct ProductDoc {
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    images: Vec<String>,
    #[serde(alias = "priceBeforeDiscount")]
    base_price: Decimal,
    #[serde(default)]
    discount: Option<Value>,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    colors: Vec<crate::domain::catalog::ColorRef>,
    #[serde(default, alias = "ratings")]
    rating: f32,
    category: CategoryRef,
    collection: CollectionRef,
    #[serde(default)]
    sub_categories: Vec<CategoryRef>,
}

fn decode_product(doc: Document) -> Option<Product> {
    let raw: ProductDoc = match serde_json::from_value(doc.data) {
        Ok(raw) => raw,
        Err(e) => {
            warn!(id = %doc.id, error = %e, "skipping malformed product");
            return None;
        }
    };
    let discount = decode_discount(&doc.id, raw.discount.as_ref());
    Some(Product {
        id: doc.id,
        title: raw.title,
        description: raw.description,
        images: raw.images,
        base_price: raw.base_price,
        discount,
        tags: raw.tags,
        colors: raw.colors,
        rating: raw.rating,
        category: raw.category,
        collection: raw.collection,
        sub_categories: raw.sub_categories,
    })
}

/// Accepts a structured percentage (number or numeric string) or a legacy
/// label. An unparsable discount is treated as no discount, never as a
/// propagating non-value.
fn decode_discount(product_id: &str, raw: Option<&Value>) -> Option<Percent> {
    let raw = raw?;
    if raw.is_null() {
        return None;
    }
    if let Ok(value) = serde_json::from_value::<Decimal>(raw.clone()) {
        return match Percent::new(value) {
            Ok(pct) => Some(pct),
            Err(e) => {
                warn!(product_id, error = %e, "discount out of range, ignoring");
                None
            }
        };
    }
    match raw.as_str().map(Percent::parse_label) {
        Some(Ok(pct)) => Some(pct),
        _ => {
            warn!(product_id, discount = %raw, "unparsable discount, ignoring");
            None
        }
    }
}
