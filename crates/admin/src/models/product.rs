//! Product domain types.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use shopdesk_core::{BrandId, CategoryId, Price, ProductId, ProductType, Slug};

use super::{CellValue, Record};

/// A catalog product.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Product {
    pub id: ProductId,
    pub brand_id: Option<BrandId>,
    /// Name of the owning brand, loaded alongside the row.
    pub brand_name: Option<String>,
    pub name: String,
    pub slug: Slug,
    pub sku: String,
    /// Stored image reference (path or URL).
    pub image: Option<String>,
    pub description: Option<String>,
    pub quantity: i32,
    pub price: Price,
    pub is_visible: bool,
    pub is_featured: bool,
    #[serde(rename = "type")]
    pub product_type: ProductType,
    pub published_at: NaiveDate,
    pub category_ids: Vec<CategoryId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Product fields as submitted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProductInput {
    pub name: Option<String>,
    pub sku: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub quantity: Option<i64>,
    #[serde(rename = "type")]
    pub product_type: Option<ProductType>,
    pub image: Option<String>,
    pub is_visible: Option<bool>,
    pub is_featured: Option<bool>,
    pub published_at: Option<NaiveDate>,
    pub brand_id: Option<BrandId>,
    pub category_ids: Option<Vec<CategoryId>>,
}

/// Validated product fields, slug included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductData {
    pub brand_id: Option<BrandId>,
    pub name: String,
    pub slug: Slug,
    pub sku: String,
    pub image: Option<String>,
    pub description: Option<String>,
    pub quantity: i32,
    pub price: Price,
    pub is_visible: bool,
    pub is_featured: bool,
    pub product_type: ProductType,
    pub published_at: NaiveDate,
    pub category_ids: Vec<CategoryId>,
}

/// Table filters for the product list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct ProductFilter {
    /// `Some(true)` only visible, `Some(false)` only hidden.
    pub is_visible: Option<bool>,
    pub brand_id: Option<BrandId>,
}

impl ProductFilter {
    /// Whether `product` passes the filter.
    #[must_use]
    pub fn matches(&self, product: &Product) -> bool {
        self.is_visible.is_none_or(|v| product.is_visible == v)
            && self.brand_id.is_none_or(|b| product.brand_id == Some(b))
    }
}

/// A global search result with its detail lines.
#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    pub id: ProductId,
    pub title: String,
    pub url: String,
    /// Ordered `(label, value)` pairs: Brand, Description, Published.
    pub details: Vec<(String, String)>,
}

impl SearchHit {
    /// Build the hit shown for `product`.
    #[must_use]
    pub fn from_product(product: &Product) -> Self {
        Self {
            id: product.id,
            title: product.name.clone(),
            url: format!("/products/{}", product.id),
            details: vec![
                (
                    "Brand".to_string(),
                    product.brand_name.clone().unwrap_or_default(),
                ),
                (
                    "Description".to_string(),
                    product.description.clone().unwrap_or_default(),
                ),
                ("Published".to_string(), product.published_at.to_string()),
            ],
        }
    }
}

impl Record for Product {
    fn id(&self) -> i64 {
        self.id.as_i64()
    }

    fn title(&self) -> String {
        self.name.clone()
    }

    fn value(&self, key: &str) -> CellValue {
        match key {
            "id" => CellValue::Int(self.id.as_i64()),
            "image" => self.image.clone().into(),
            "name" => self.name.as_str().into(),
            "slug" => self.slug.as_str().into(),
            "sku" => self.sku.as_str().into(),
            "brand.name" => self.brand_name.clone().into(),
            "description" => self.description.clone().into(),
            "is_visible" => self.is_visible.into(),
            "is_featured" => self.is_featured.into(),
            "quantity" => CellValue::Int(i64::from(self.quantity)),
            "price" => self.price.into(),
            "type" => self.product_type.label().into(),
            "published_at" => self.published_at.into(),
            "created_at" => self.created_at.into(),
            "updated_at" => self.updated_at.into(),
            _ => CellValue::Null,
        }
    }
}
