//! Catalog types as served by the product API.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::id::ProductId;
use super::price::{self, Price};

/// A product as it appears in list responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub product_id: ProductId,
    pub title: String,
    #[serde(default)]
    pub link: String,
    #[serde(default)]
    pub image: String,
    /// Lowest offered price.
    pub lprice: Price,
    /// Highest offered price, when the API knows one.
    #[serde(default, with = "price::optional")]
    pub hprice: Option<Price>,
    #[serde(default)]
    pub mall_name: String,
    #[serde(default)]
    pub product_type: String,
    #[serde(default)]
    pub brand: String,
    #[serde(default)]
    pub maker: String,
    #[serde(default)]
    pub category1: String,
    #[serde(default)]
    pub category2: String,
    #[serde(default)]
    pub category3: String,
    #[serde(default)]
    pub category4: String,
}

impl Product {
    /// The label shown under the title: brand, else maker, else the mall.
    #[must_use]
    pub fn vendor(&self) -> &str {
        [&self.brand, &self.maker, &self.mall_name]
            .into_iter()
            .find(|s| !s.trim().is_empty())
            .map_or("", String::as_str)
    }
}

/// A product with the extra fields of the detail endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductDetail {
    #[serde(flatten)]
    pub product: Product,
    #[serde(default)]
    pub description: String,
    /// Star rating from 0 to 5.
    #[serde(default)]
    pub rating: u8,
    #[serde(default)]
    pub review_count: u32,
    #[serde(default)]
    pub stock: u32,
    #[serde(default)]
    pub images: Vec<String>,
}

impl ProductDetail {
    /// Largest quantity the detail page lets a shopper pick.
    #[must_use]
    pub fn max_quantity(&self) -> u32 {
        self.stock.max(1)
    }

    /// Clamp a requested quantity to `1..=max_quantity()`.
    #[must_use]
    pub fn clamp_quantity(&self, quantity: u32) -> u32 {
        quantity.clamp(1, self.max_quantity())
    }
}

/// Two-level category tree: `{ "생활/건강": { "생활용품": {}, ... }, ... }`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Categories(BTreeMap<String, BTreeMap<String, serde_json::Value>>);

impl Categories {
    /// Top-level category names.
    pub fn top_level(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Second-level category names below `category1`.
    ///
    /// Empty when `category1` is unknown.
    pub fn children(&self, category1: &str) -> impl Iterator<Item = &str> {
        self.0
            .get(category1)
            .into_iter()
            .flat_map(|children| children.keys().map(String::as_str))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, Vec<String>)> for Categories {
    fn from_iter<I: IntoIterator<Item = (String, Vec<String>)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(top, children)| {
                    let children = children
                        .into_iter()
                        .map(|child| (child, serde_json::Value::Object(serde_json::Map::new())))
                        .collect();
                    (top, children)
                })
                .collect(),
        )
    }
}
