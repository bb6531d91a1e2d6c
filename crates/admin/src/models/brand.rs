//! Brand domain types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use shopdesk_core::{BrandId, Slug};

use super::{CellValue, Record};

/// A brand that owns products.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Brand {
    pub id: BrandId,
    pub name: String,
    pub slug: Slug,
    /// Website URL (unique).
    pub url: String,
    /// Markdown description.
    pub description: Option<String>,
    pub is_visible: bool,
    /// Accent colour, `#rgb` or `#rrggbb`.
    pub primary_hex: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Brand fields as submitted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BrandInput {
    pub name: Option<String>,
    pub url: Option<String>,
    pub description: Option<String>,
    pub is_visible: Option<bool>,
    pub primary_hex: Option<String>,
}

/// Validated brand fields, slug included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrandData {
    pub name: String,
    pub slug: Slug,
    pub url: String,
    pub description: Option<String>,
    pub is_visible: bool,
    pub primary_hex: Option<String>,
}

impl Record for Brand {
    fn id(&self) -> i64 {
        self.id.as_i64()
    }

    fn title(&self) -> String {
        self.name.clone()
    }

    fn value(&self, key: &str) -> CellValue {
        match key {
            "id" => CellValue::Int(self.id.as_i64()),
            "name" => self.name.as_str().into(),
            "slug" => self.slug.as_str().into(),
            "url" => self.url.as_str().into(),
            "description" => self.description.clone().into(),
            "is_visible" => self.is_visible.into(),
            "primary_hex" => self.primary_hex.clone().into(),
            "created_at" => self.created_at.into(),
            "updated_at" => self.updated_at.into(),
            _ => CellValue::Null,
        }
    }
}
