//! Resource schemas.
//!
//! Each admin resource (brands, categories, products, customers, orders) is
//! described once by a static [`ResourceSchema`]: its table columns, filters,
//! bulk actions, summaries and form fields. The list endpoints, the HTML
//! pages and the services all read from it.

pub mod brands;
pub mod categories;
pub mod customers;
pub mod form;
pub mod orders;
pub mod products;
pub mod render;
pub mod table;

use std::collections::HashMap;
use std::fmt;
use std::sync::LazyLock;

use serde::Serialize;
use thiserror::Error;

use crate::config::MAX_PER_PAGE;
use crate::models::{Direction, ListQuery};

pub use form::{FieldDefault, FieldKind, FormField, FormSchema, OptionSource, Rule};
pub use table::{
    BulkAction, ColumnFormat, FilterOption, FilterType, Summarizer, SummaryKind, TableColumn,
    TableFilter,
};

/// A malformed list query parameter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct ParamError(pub String);

/// The admin resources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Resource {
    Brands,
    Categories,
    Products,
    Customers,
    Orders,
}

impl Resource {
    /// Every resource, in navigation order.
    pub const ALL: [Self; 5] = [
        Self::Products,
        Self::Brands,
        Self::Categories,
        Self::Orders,
        Self::Customers,
    ];

    /// URL segment.
    #[must_use]
    pub const fn slug(self) -> &'static str {
        match self {
            Self::Brands => "brands",
            Self::Categories => "categories",
            Self::Products => "products",
            Self::Customers => "customers",
            Self::Orders => "orders",
        }
    }

    /// Resolve a URL segment.
    #[must_use]
    pub fn from_slug(slug: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|r| r.slug() == slug)
    }

    /// The static schema.
    #[must_use]
    pub fn schema(self) -> &'static ResourceSchema {
        static BRANDS: LazyLock<ResourceSchema> = LazyLock::new(brands::schema);
        static CATEGORIES: LazyLock<ResourceSchema> = LazyLock::new(categories::schema);
        static PRODUCTS: LazyLock<ResourceSchema> = LazyLock::new(products::schema);
        static CUSTOMERS: LazyLock<ResourceSchema> = LazyLock::new(customers::schema);
        static ORDERS: LazyLock<ResourceSchema> = LazyLock::new(orders::schema);

        match self {
            Self::Brands => &BRANDS,
            Self::Categories => &CATEGORIES,
            Self::Products => &PRODUCTS,
            Self::Customers => &CUSTOMERS,
            Self::Orders => &ORDERS,
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

/// Table and form description of a resource.
#[derive(Debug, Clone, Serialize)]
pub struct ResourceSchema {
    pub resource: Resource,
    pub label: &'static str,
    pub plural_label: &'static str,
    /// Column used as the record title.
    pub title_column: &'static str,
    pub columns: Vec<TableColumn>,
    pub filters: Vec<TableFilter>,
    pub bulk_actions: Vec<BulkAction>,
    pub summarizers: Vec<Summarizer>,
    pub form: FormSchema,
}

impl ResourceSchema {
    /// Look up a column by key.
    #[must_use]
    pub fn column(&self, key: &str) -> Option<&TableColumn> {
        self.columns.iter().find(|c| c.key == key)
    }

    /// Keys of the searchable columns.
    #[must_use]
    pub fn search_columns(&self) -> Vec<String> {
        self.columns
            .iter()
            .filter(|c| c.searchable)
            .map(|c| c.key.clone())
            .collect()
    }

    /// Columns shown in the table: the requested keys when given, otherwise
    /// the default-visible ones.
    #[must_use]
    pub fn visible_columns(&self, requested: Option<&str>) -> Vec<&TableColumn> {
        match requested.map(str::trim).filter(|s| !s.is_empty()) {
            Some(keys) => {
                let keys: Vec<&str> = keys.split(',').map(str::trim).collect();
                self.columns
                    .iter()
                    .filter(|c| keys.contains(&c.key.as_str()))
                    .collect()
            }
            None => self.columns.iter().filter(|c| c.default_visible).collect(),
        }
    }

    /// Resolve `q`, `sort`, `direction`, `page` and `per_page`.
    ///
    /// # Errors
    ///
    /// Returns `ParamError` for an unsortable column, an unknown direction,
    /// or a page size outside `1..=100`.
    pub fn list_query(
        &self,
        params: &HashMap<String, String>,
        default_per_page: u32,
    ) -> Result<ListQuery, ParamError> {
        let search = params
            .get("q")
            .map(|q| q.trim().to_string())
            .filter(|q| !q.is_empty());

        let sort = match params.get("sort").map(|s| s.trim()).filter(|s| !s.is_empty()) {
            Some(key) => {
                if !self.column(key).is_some_and(|c| c.sortable) {
                    return Err(ParamError(format!("cannot sort {} by {key}", self.resource)));
                }
                let direction = match params.get("direction").map(String::as_str) {
                    None | Some("" | "asc") => Direction::Asc,
                    Some("desc") => Direction::Desc,
                    Some(other) => {
                        return Err(ParamError(format!("invalid direction: {other}")));
                    }
                };
                Some((key.to_string(), direction))
            }
            None => None,
        };

        let page = match params.get("page").filter(|p| !p.is_empty()) {
            Some(page) => page
                .parse::<u32>()
                .ok()
                .filter(|p| *p >= 1)
                .ok_or_else(|| ParamError(format!("invalid page: {page}")))?,
            None => 1,
        };

        let per_page = match params.get("per_page").filter(|p| !p.is_empty()) {
            Some(per_page) => per_page
                .parse::<u32>()
                .ok()
                .filter(|n| (1..=MAX_PER_PAGE).contains(n))
                .ok_or_else(|| {
                    ParamError(format!(
                        "per_page must be between 1 and {MAX_PER_PAGE}, got {per_page}"
                    ))
                })?,
            None => default_per_page,
        };

        Ok(ListQuery {
            search,
            search_columns: self.search_columns(),
            sort,
            page,
            per_page,
        })
    }
}

/// Parse an optional boolean filter (`true`, `false`, or blank for any).
pub(crate) fn ternary(
    params: &HashMap<String, String>,
    key: &str,
) -> Result<Option<bool>, ParamError> {
    match params.get(key).map(|v| v.trim()) {
        None | Some("") => Ok(None),
        Some("true" | "1") => Ok(Some(true)),
        Some("false" | "0") => Ok(Some(false)),
        Some(other) => Err(ParamError(format!("invalid {key} filter: {other}"))),
    }
}

/// Parse an optional id filter.
pub(crate) fn id_param<T: From<i64>>(
    params: &HashMap<String, String>,
    key: &str,
) -> Result<Option<T>, ParamError> {
    match params.get(key).map(|v| v.trim()) {
        None | Some("") => Ok(None),
        Some(raw) => raw
            .parse::<i64>()
            .map(|id| Some(T::from(id)))
            .map_err(|_| ParamError(format!("invalid {key} filter: {raw}"))),
    }
}
