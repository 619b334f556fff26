//! Catalog products. Variants and specifications are JSONB documents,
//! mirroring the original schema.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;

#[derive(Clone, Debug, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub brand: Option<String>,
    pub category_id: Option<i64>,
    pub cat_slug: Option<String>,
    /// JSON array of image paths relative to the uploads dir.
    pub images: Value,
    pub secondary_image: Option<String>,
    /// JSON array of [`ProductVariant`].
    pub variants: Value,
    /// JSON array of `{"Fabric": ...}` entries.
    pub specifications: Value,
    pub status: String,
    pub availability: String,
    pub featured: bool,
    pub material: Option<String>,
    pub style: Option<String>,
    pub view_count: i64,
    pub sales_count: i64,
    pub low_stock_threshold: i32,
    pub seo_title: Option<String>,
    pub meta_keywords: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One sellable (color, size, type) combination with its own price/stock.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProductVariant {
    pub color: String,
    pub size: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub price: f64,
    #[serde(default)]
    pub original_price: Option<f64>,
    #[serde(default)]
    pub quantity: i64,
}

impl Product {
    pub fn parsed_variants(&self) -> Vec<ProductVariant> {
        serde_json::from_value(self.variants.clone()).unwrap_or_default()
    }

    /// First image path, if any.
    pub fn primary_image(&self) -> Option<String> {
        self.images
            .as_array()
            .and_then(|a| a.first())
            .and_then(Value::as_str)
            .map(String::from)
    }
}

/// Compact projection embedded in order items.
#[derive(Clone, Debug, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductSummary {
    pub id: i64,
    pub name: String,
    pub images: Value,
    pub slug: String,
}
