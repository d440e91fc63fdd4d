//! Catalog records: products and the read-only reference collections that
//! back the storefront (categories, colors, carousel items, store
//! locations).

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::value_objects::Percent;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Product {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// Ordered gallery; the first entry is the card image.
    #[serde(default)]
    pub images: Vec<String>,
    pub base_price: Decimal,
    pub discount: Option<Percent>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub colors: Vec<ColorRef>,
    #[serde(default)]
    pub rating: f32,
    pub category: CategoryRef,
    pub collection: CollectionRef,
    #[serde(default)]
    pub sub_categories: Vec<CategoryRef>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct CategoryRef {
    pub id: String,
    pub name: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct CollectionRef {
    pub id: String,
    pub name: String,
}

/// A named swatch attached to a product (name plus CSS color value).
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ColorRef {
    pub name: String,
    pub value: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Category {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub image: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct SubCategory {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub image: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Color {
    pub id: String,
    pub name: String,
    pub value: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct CarouselItem {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub image: String,
    #[serde(default)]
    pub link: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoreLocation {
    pub id: String,
    pub name: String,
    pub address: String,
}

impl StoreLocation {
    /// Fallback used when the store returns no pickup locations; checkout
    /// must always have at least one to offer.
    pub fn fallback() -> Vec<StoreLocation> {
        vec![StoreLocation {
            id: "store-1".to_string(),
            name: "F&H".to_string(),
            address: "Astor Green, Kanke Road, Gandhi Nagar, shop no 13".to_string(),
        }]
    }
}
