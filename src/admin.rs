//! Admin CRUD over products, categories and carousel items, plus image
//! upload through the hosting API.
//!
//! Discounts are written as structured percentages; the legacy label format
//! only exists on the read side (see [`crate::catalog`]).

use std::sync::Arc;

use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;

use crate::domain::catalog::{CategoryRef, CollectionRef, ColorRef};
use crate::domain::value_objects::Percent;
use crate::ports::{collections, DocumentStore, ImageUploader};
use crate::Result;

#[derive(Clone, Debug, Deserialize)]
pub struct ProductInput {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub images: Vec<String>,
    pub base_price: Decimal,
    /// Structured percentage in `[0, 100]`.
    pub discount_percent: Option<Decimal>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub colors: Vec<ColorRef>,
    pub category: CategoryRef,
    pub collection: CollectionRef,
    #[serde(default)]
    pub sub_categories: Vec<CategoryRef>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct CategoryInput {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub image: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct CarouselInput {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub image: String,
    #[serde(default)]
    pub link: String,
}

pub struct AdminService {
    store: Arc<dyn DocumentStore>,
    uploader: Arc<dyn ImageUploader>,
}

impl AdminService {
    pub fn new(store: Arc<dyn DocumentStore>, uploader: Arc<dyn ImageUploader>) -> Self {
        Self { store, uploader }
    }

    pub async fn create_product(&self, input: ProductInput) -> Result<String> {
        let mut data = product_document(&input)?;
        if let Some(obj) = data.as_object_mut() {
            // New products start unrated; updates leave the rating alone.
            obj.insert("rating".to_string(), json!(0.0));
        }
        self.store.insert(collections::PRODUCTS, data).await
    }

    pub async fn update_product(&self, id: &str, input: ProductInput) -> Result<()> {
        let data = product_document(&input)?;
        self.store.update(collections::PRODUCTS, id, data).await
    }

    pub async fn delete_product(&self, id: &str) -> Result<()> {
        self.store.delete(collections::PRODUCTS, id).await
    }

    pub async fn create_category(&self, input: CategoryInput) -> Result<String> {
        let data = json!({
            "name": input.name,
            "description": input.description,
            "image": input.image,
        });
        self.store.insert(collections::CATEGORIES, data).await
    }

    pub async fn delete_category(&self, id: &str) -> Result<()> {
        self.store.delete(collections::CATEGORIES, id).await
    }

    pub async fn add_carousel_item(&self, input: CarouselInput) -> Result<String> {
        let data = json!({
            "name": input.name,
            "description": input.description,
            "image": input.image,
            "link": input.link,
        });
        self.store.insert(collections::CAROUSEL, data).await
    }

    pub async fn delete_carousel_item(&self, id: &str) -> Result<()> {
        self.store.delete(collections::CAROUSEL, id).await
    }

    /// Pushes raw image bytes to the hosting API and returns the public
    /// URL. Failures surface as form errors; there is no retry.
    pub async fn upload_image(&self, bytes: Vec<u8>) -> Result<String> {
        self.uploader.upload(bytes).await
    }
}

fn product_document(input: &ProductInput) -> Result<serde_json::Value> {
    // Range-check the discount before it ever reaches the store.
    let discount = input.discount_percent.map(Percent::new).transpose()?;
    Ok(json!({
        "title": input.title,
        "description": input.description,
        "images": input.images,
        "base_price": input.base_price,
        "discount": discount.map(|d| d.value()),
        "tags": input.tags,
        "colors": input.colors,
        "category": input.category,
        "collection": input.collection,
        "sub_categories": input.sub_categories,
    }))
}
