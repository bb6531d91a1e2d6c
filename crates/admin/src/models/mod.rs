//! Domain models for admin.
//!
//! Each entity has three shapes:
//!
//! - the stored record (`Brand`), as read back from the store;
//! - the raw input (`BrandInput`), as submitted by a form or API client;
//! - the validated data (`BrandData`), ready to be written.
//!
//! Records expose their columns through [`Record`] so tables, search and
//! sorting can work on any entity by column key.

pub mod brand;
pub mod category;
pub mod customer;
pub mod order;
pub mod product;

use std::cmp::Ordering;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use shopdesk_core::Price;

pub use brand::{Brand, BrandData, BrandInput};
pub use category::{Category, CategoryData, CategoryInput, CategoryNode};
pub use customer::{Customer, CustomerData, CustomerInput};
pub use order::{
    LineItem, Order, OrderDraft, OrderFilter, OrderInput, OrderItem, OrderItemInput, Trashed,
};
pub use product::{Product, ProductData, ProductFilter, ProductInput, SearchHit};

// =============================================================================
// Column access
// =============================================================================

/// A single column value of a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CellValue {
    Null,
    Text(String),
    Int(i64),
    Bool(bool),
    Money(Price),
    Date(NaiveDate),
    DateTime(DateTime<Utc>),
}

impl CellValue {
    /// Text used for substring search.
    #[must_use]
    pub fn search_text(&self) -> String {
        match self {
            Self::Null => String::new(),
            Self::Text(s) => s.clone(),
            Self::Int(n) => n.to_string(),
            Self::Bool(b) => b.to_string(),
            Self::Money(p) => p.to_string(),
            Self::Date(d) => d.to_string(),
            Self::DateTime(dt) => dt.to_rfc3339(),
        }
    }

    /// Case-insensitive substring match.
    #[must_use]
    pub fn contains(&self, needle_lower: &str) -> bool {
        self.search_text().to_lowercase().contains(needle_lower)
    }

    /// Ordering used when sorting tables: nulls first, then by value.
    #[must_use]
    pub fn compare(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Null, Self::Null) => Ordering::Equal,
            (Self::Null, _) => Ordering::Less,
            (_, Self::Null) => Ordering::Greater,
            (Self::Text(a), Self::Text(b)) => a.to_lowercase().cmp(&b.to_lowercase()),
            (Self::Int(a), Self::Int(b)) => a.cmp(b),
            (Self::Bool(a), Self::Bool(b)) => a.cmp(b),
            (Self::Money(a), Self::Money(b)) => a.cmp(b),
            (Self::Date(a), Self::Date(b)) => a.cmp(b),
            (Self::DateTime(a), Self::DateTime(b)) => a.cmp(b),
            (a, b) => a.search_text().cmp(&b.search_text()),
        }
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<bool> for CellValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<Price> for CellValue {
    fn from(value: Price) -> Self {
        Self::Money(value)
    }
}

impl From<NaiveDate> for CellValue {
    fn from(value: NaiveDate) -> Self {
        Self::Date(value)
    }
}

impl From<DateTime<Utc>> for CellValue {
    fn from(value: DateTime<Utc>) -> Self {
        Self::DateTime(value)
    }
}

impl<T: Into<Self>> From<Option<T>> for CellValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

/// Column access shared by every entity.
pub trait Record {
    /// Primary key.
    fn id(&self) -> i64;

    /// Short human-readable title (page headings, select options).
    fn title(&self) -> String;

    /// Value of the column named `key` (`name`, `brand.name`, ...).
    fn value(&self, key: &str) -> CellValue;
}

// =============================================================================
// Listing
// =============================================================================

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

impl Direction {
    /// SQL keyword.
    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }

    /// The other direction.
    #[must_use]
    pub const fn flip(self) -> Self {
        match self {
            Self::Asc => Self::Desc,
            Self::Desc => Self::Asc,
        }
    }
}

/// Resolved list request: search, sort and pagination.
///
/// Column keys have already been checked against the resource table.
#[derive(Debug, Clone)]
pub struct ListQuery {
    /// Substring searched for in `search_columns`.
    pub search: Option<String>,
    /// Column keys the search applies to.
    pub search_columns: Vec<String>,
    /// Sort column key and direction.
    pub sort: Option<(String, Direction)>,
    /// 1-based page number.
    pub page: u32,
    /// Rows per page.
    pub per_page: u32,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            search: None,
            search_columns: Vec::new(),
            sort: None,
            page: 1,
            per_page: 10,
        }
    }
}

impl ListQuery {
    /// Row offset of the first item on the page.
    #[must_use]
    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.per_page)
    }

    /// Lower-cased search needle, if any.
    #[must_use]
    pub fn needle(&self) -> Option<String> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase)
    }
}

/// One page of results.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u32,
    pub per_page: u32,
}

impl<T> Page<T> {
    /// Number of the last page (at least 1).
    #[must_use]
    pub fn last_page(&self) -> u32 {
        let per_page = u64::from(self.per_page.max(1));
        u32::try_from(self.total.div_ceil(per_page).max(1)).unwrap_or(u32::MAX)
    }

    /// Convert the items, keeping the paging data.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            per_page: self.per_page,
        }
    }
}

/// A `(value, label)` pair for select inputs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectOption {
    pub id: i64,
    pub name: String,
}

/// Search, sort and paginate in-memory records the way the SQL store does.
pub fn paginate<T: Record + Clone>(mut records: Vec<T>, query: &ListQuery) -> Page<T> {
    if let Some(needle) = query.needle() {
        records.retain(|r| {
            query
                .search_columns
                .iter()
                .any(|col| r.value(col).contains(&needle))
        });
    }

    match &query.sort {
        Some((key, direction)) => records.sort_by(|a, b| {
            let ord = a.value(key).compare(&b.value(key)).then(a.id().cmp(&b.id()));
            match direction {
                Direction::Asc => ord,
                Direction::Desc => ord.reverse(),
            }
        }),
        // Newest first, matching the SQL default ordering.
        None => records.sort_by_key(|r| std::cmp::Reverse(r.id())),
    }

    let total = records.len() as u64;
    let offset = usize::try_from(query.offset()).unwrap_or(usize::MAX);
    let items = records
        .into_iter()
        .skip(offset)
        .take(query.per_page as usize)
        .collect();

    Page {
        items,
        total,
        page: query.page,
        per_page: query.per_page,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone)]
    struct Row(i64, &'static str);

    impl Record for Row {
        fn id(&self) -> i64 {
            self.0
        }

        fn title(&self) -> String {
            self.1.to_string()
        }

        fn value(&self, key: &str) -> CellValue {
            match key {
                "name" => self.1.into(),
                _ => CellValue::Null,
            }
        }
    }

    fn rows() -> Vec<Row> {
        vec![Row(1, "Banana"), Row(2, "apple"), Row(3, "Cherry"), Row(4, "Apricot")]
    }

    #[test]
    fn test_paginate_defaults_to_newest_first() {
        let page = paginate(rows(), &ListQuery::default());
        let ids: Vec<i64> = page.items.iter().map(Record::id).collect();
        assert_eq!(ids, vec![4, 3, 2, 1]);
        assert_eq!(page.total, 4);
    }

    #[test]
    fn test_paginate_search_is_case_insensitive() {
        let query = ListQuery {
            search: Some("AP".to_string()),
            search_columns: vec!["name".to_string()],
            ..ListQuery::default()
        };
        let page = paginate(rows(), &query);
        assert_eq!(page.total, 2);
    }

    #[test]
    fn test_paginate_sorts_and_pages() {
        let query = ListQuery {
            sort: Some(("name".to_string(), Direction::Desc)),
            page: 2,
            per_page: 3,
            ..ListQuery::default()
        };
        let page = paginate(rows(), &query);
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].1, "apple");
        assert_eq!(page.last_page(), 2);
    }

    #[test]
    fn test_compare_puts_nulls_first() {
        assert_eq!(
            CellValue::Null.compare(&CellValue::Int(0)),
            Ordering::Less
        );
    }
}
