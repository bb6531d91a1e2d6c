//! Storage for the catalog and order data.
//!
//! # Backends
//!
//! - [`postgres::PgStore`] - `PostgreSQL` through a sqlx pool (production)
//! - [`memory::MemoryStore`] - process-local maps (tests, demos)
//!
//! Both implement the per-entity store traits below and are used through
//! `Arc<dyn Store>`. Each write method is a single transaction; the services
//! never hold a transaction across calls.
//!
//! # Migrations
//!
//! Migrations are stored in `crates/admin/migrations/` and run via:
//! ```bash
//! cargo run -p shopdesk-cli -- migrate
//! ```

pub mod memory;
pub mod postgres;

use std::time::Duration;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use shopdesk_core::{BrandId, CategoryId, CustomerId, OrderId, Price, ProductId, Slug};

use crate::models::{
    Brand, BrandData, Category, CategoryData, Customer, CustomerData, ListQuery, Order,
    OrderDraft, OrderFilter, Page, Product, ProductData, ProductFilter, SelectOption,
};

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (unique value taken, row still referenced).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Tables whose rows carry a unique slug.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SlugScope {
    Brands,
    Categories,
    Products,
}

impl SlugScope {
    /// Table name.
    #[must_use]
    pub const fn table(self) -> &'static str {
        match self {
            Self::Brands => "brands",
            Self::Categories => "categories",
            Self::Products => "products",
        }
    }
}

/// Slug uniqueness lookups.
#[async_trait]
pub trait SlugStore: Send + Sync {
    /// Whether `slug` is used by a row in `scope` other than `except`.
    async fn slug_taken(
        &self,
        scope: SlugScope,
        slug: &Slug,
        except: Option<i64>,
    ) -> Result<bool, RepositoryError>;
}

/// Brand persistence.
#[async_trait]
pub trait BrandStore: Send + Sync {
    async fn list_brands(&self, query: &ListQuery) -> Result<Page<Brand>, RepositoryError>;

    async fn get_brand(&self, id: BrandId) -> Result<Option<Brand>, RepositoryError>;

    async fn insert_brand(&self, data: &BrandData) -> Result<Brand, RepositoryError>;

    /// Returns `NotFound` if the brand does not exist.
    async fn update_brand(&self, id: BrandId, data: &BrandData) -> Result<Brand, RepositoryError>;

    /// Delete brands, all or nothing.
    ///
    /// Returns `Conflict` if any of them still owns products.
    async fn delete_brands(&self, ids: &[BrandId]) -> Result<u64, RepositoryError>;

    async fn brand_options(&self) -> Result<Vec<SelectOption>, RepositoryError>;

    async fn brand_url_taken(
        &self,
        url: &str,
        except: Option<BrandId>,
    ) -> Result<bool, RepositoryError>;
}

/// Category persistence.
#[async_trait]
pub trait CategoryStore: Send + Sync {
    async fn list_categories(&self, query: &ListQuery) -> Result<Page<Category>, RepositoryError>;

    /// Every category, for tree building and cycle checks.
    async fn all_categories(&self) -> Result<Vec<Category>, RepositoryError>;

    async fn get_category(&self, id: CategoryId) -> Result<Option<Category>, RepositoryError>;

    async fn insert_category(&self, data: &CategoryData) -> Result<Category, RepositoryError>;

    async fn update_category(
        &self,
        id: CategoryId,
        data: &CategoryData,
    ) -> Result<Category, RepositoryError>;

    /// Delete categories; children are detached and pivot rows removed.
    async fn delete_categories(&self, ids: &[CategoryId]) -> Result<u64, RepositoryError>;

    async fn category_options(&self) -> Result<Vec<SelectOption>, RepositoryError>;

    /// The subset of `ids` that exist.
    async fn existing_categories(
        &self,
        ids: &[CategoryId],
    ) -> Result<Vec<CategoryId>, RepositoryError>;
}

/// Product persistence.
#[async_trait]
pub trait ProductStore: Send + Sync {
    async fn list_products(
        &self,
        query: &ListQuery,
        filter: &ProductFilter,
    ) -> Result<Page<Product>, RepositoryError>;

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, RepositoryError>;

    async fn products_by_ids(&self, ids: &[ProductId]) -> Result<Vec<Product>, RepositoryError>;

    /// Insert the product and its category links.
    async fn insert_product(&self, data: &ProductData) -> Result<Product, RepositoryError>;

    /// Update the product and replace its category links.
    async fn update_product(
        &self,
        id: ProductId,
        data: &ProductData,
    ) -> Result<Product, RepositoryError>;

    /// Delete products, all or nothing.
    ///
    /// Returns `Conflict` if any of them appears on an order.
    async fn delete_products(&self, ids: &[ProductId]) -> Result<u64, RepositoryError>;

    /// Case-insensitive match over name, slug and description.
    async fn search_products(
        &self,
        needle: &str,
        limit: u32,
    ) -> Result<Vec<Product>, RepositoryError>;

    async fn product_options(&self) -> Result<Vec<SelectOption>, RepositoryError>;

    async fn sku_taken(&self, sku: &str, except: Option<ProductId>)
    -> Result<bool, RepositoryError>;
}

/// Customer persistence.
#[async_trait]
pub trait CustomerStore: Send + Sync {
    async fn list_customers(&self, query: &ListQuery) -> Result<Page<Customer>, RepositoryError>;

    async fn get_customer(&self, id: CustomerId) -> Result<Option<Customer>, RepositoryError>;

    async fn insert_customer(&self, data: &CustomerData) -> Result<Customer, RepositoryError>;

    async fn update_customer(
        &self,
        id: CustomerId,
        data: &CustomerData,
    ) -> Result<Customer, RepositoryError>;

    /// Delete customers together with their orders.
    async fn delete_customers(&self, ids: &[CustomerId]) -> Result<u64, RepositoryError>;

    async fn customer_options(&self) -> Result<Vec<SelectOption>, RepositoryError>;

    async fn email_taken(
        &self,
        email: &str,
        except: Option<CustomerId>,
    ) -> Result<bool, RepositoryError>;
}

/// Order persistence. Orders are always written as a whole aggregate.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Orders without their items.
    async fn list_orders(
        &self,
        query: &ListQuery,
        filter: &OrderFilter,
    ) -> Result<Page<Order>, RepositoryError>;

    /// Sum of `total_price` over every order matching the query and filter.
    async fn sum_order_totals(
        &self,
        query: &ListQuery,
        filter: &OrderFilter,
    ) -> Result<Price, RepositoryError>;

    /// The order with its items.
    async fn get_order(
        &self,
        id: OrderId,
        include_trashed: bool,
    ) -> Result<Option<Order>, RepositoryError>;

    async fn order_number_taken(&self, number: &str) -> Result<bool, RepositoryError>;

    /// Insert the order row and its items, total computed from the draft.
    async fn insert_order(&self, draft: &OrderDraft) -> Result<Order, RepositoryError>;

    /// Replace the order row and sync its items to the draft: lines with an
    /// id are updated, lines without one inserted, other stored items deleted.
    /// A trashed order is `NotFound`.
    async fn save_order(&self, id: OrderId, draft: &OrderDraft) -> Result<Order, RepositoryError>;

    /// Soft-delete orders that are not already trashed.
    async fn soft_delete_orders(&self, ids: &[OrderId]) -> Result<u64, RepositoryError>;

    /// Clear `deleted_at`. Returns `false` if the order does not exist.
    async fn restore_order(&self, id: OrderId) -> Result<bool, RepositoryError>;

    /// Delete permanently. Returns `false` if the order does not exist.
    async fn force_delete_order(&self, id: OrderId) -> Result<bool, RepositoryError>;
}

/// Everything the services need from a backend.
#[async_trait]
pub trait Store:
    SlugStore + BrandStore + CategoryStore + ProductStore + CustomerStore + OrderStore
{
    /// Backend name for logs.
    fn backend(&self) -> &'static str;

    /// Check the backend is reachable.
    async fn ping(&self) -> Result<(), RepositoryError>;
}
