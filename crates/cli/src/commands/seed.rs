//! Load fixtures from a YAML file.
//!
//! Every record goes through the admin services, so fixtures get the same
//! validation, slugs, order numbers and totals as records created in the
//! admin. Records refer to each other by a `key` local to the file:
//!
//! ```yaml
//! brands:
//!   - key: acme
//!     name: Acme
//!     url: https://acme.test
//! products:
//!   - key: runner
//!     name: Runner
//!     sku: RUN-1
//!     price: "49.90"
//!     quantity: 20
//!     type: deliverable
//!     brand: acme
//! customers:
//!   - key: ada
//!     name: Ada Lovelace
//!     email: ada@example.test
//! orders:
//!   - customer: ada
//!     items:
//!       - product: runner
//!         quantity: 2
//! ```

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;

use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::{debug, info};

use shopdesk_admin::config::AdminConfig;
use shopdesk_admin::db::MemoryStore;
use shopdesk_admin::models::{
    BrandInput, CategoryInput, CustomerInput, OrderInput, OrderItemInput, ProductInput,
};
use shopdesk_admin::state::AppState;
use shopdesk_core::{BrandId, CategoryId, CustomerId, OrderStatus, ProductId};

use super::CliError;

/// Contents of a fixture file.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Fixtures {
    pub brands: Vec<BrandFixture>,
    pub categories: Vec<CategoryFixture>,
    pub products: Vec<ProductFixture>,
    pub customers: Vec<CustomerFixture>,
    pub orders: Vec<OrderFixture>,
}

#[derive(Debug, Deserialize)]
pub struct BrandFixture {
    pub key: String,
    #[serde(flatten)]
    pub input: BrandInput,
}

#[derive(Debug, Deserialize)]
pub struct CategoryFixture {
    pub key: String,
    /// Key of a category listed earlier in the file.
    #[serde(default)]
    pub parent: Option<String>,
    #[serde(flatten)]
    pub input: CategoryInput,
}

#[derive(Debug, Deserialize)]
pub struct ProductFixture {
    pub key: String,
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(flatten)]
    pub input: ProductInput,
}

#[derive(Debug, Deserialize)]
pub struct CustomerFixture {
    pub key: String,
    #[serde(flatten)]
    pub input: CustomerInput,
}

#[derive(Debug, Deserialize)]
pub struct OrderFixture {
    pub customer: String,
    #[serde(default)]
    pub status: Option<OrderStatus>,
    #[serde(default)]
    pub shipping_price: Option<Decimal>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub items: Vec<ItemFixture>,
}

#[derive(Debug, Deserialize)]
pub struct ItemFixture {
    pub product: String,
    #[serde(default)]
    pub quantity: Option<i64>,
}

/// Number of records created per resource.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SeedSummary {
    pub brands: usize,
    pub categories: usize,
    pub products: usize,
    pub customers: usize,
    pub orders: usize,
}

/// Read `path` and create its records.
///
/// With `dry_run` the records go into a throwaway in-memory store, which
/// checks the file without touching the database.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, a key is unknown
/// or repeated, or a record fails validation. Key errors are found before
/// anything is written; records created before a validation failure stay.
pub async fn from_file(path: &Path, dry_run: bool) -> Result<SeedSummary, CliError> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| CliError::Read {
            path: path.display().to_string(),
            source,
        })?;
    let fixtures: Fixtures = serde_yaml::from_str(&content)?;
    info!(path = %path.display(), "Loaded fixture file");

    let state = if dry_run {
        AppState::new(AdminConfig::default(), Arc::new(MemoryStore::new()))
    } else {
        AppState::connect(AdminConfig::from_env()?).await?
    };
    seed(&state, &fixtures).await
}

/// Create every record in `fixtures`, in dependency order.
///
/// # Errors
///
/// See [`from_file`].
pub async fn seed(state: &AppState, fixtures: &Fixtures) -> Result<SeedSummary, CliError> {
    check_keys(fixtures)?;

    let catalog = state.catalog();
    let mut brands: HashMap<&str, BrandId> = HashMap::new();
    let mut categories: HashMap<&str, CategoryId> = HashMap::new();
    let mut products: HashMap<&str, ProductId> = HashMap::new();
    let mut customers: HashMap<&str, CustomerId> = HashMap::new();

    for fixture in &fixtures.brands {
        let brand = catalog
            .create_brand(&fixture.input)
            .await
            .map_err(|source| failed("brand", &fixture.key, source))?;
        debug!(key = %fixture.key, id = %brand.id, "Seeded brand");
        insert_key(&mut brands, "brand", &fixture.key, brand.id)?;
    }

    for fixture in &fixtures.categories {
        let mut input = fixture.input.clone();
        if let Some(parent) = &fixture.parent {
            input.parent_id = Some(lookup(&categories, "category", parent)?);
        }
        let category = catalog
            .create_category(&input)
            .await
            .map_err(|source| failed("category", &fixture.key, source))?;
        insert_key(&mut categories, "category", &fixture.key, category.id)?;
    }

    for fixture in &fixtures.products {
        let mut input = fixture.input.clone();
        if let Some(brand) = &fixture.brand {
            input.brand_id = Some(lookup(&brands, "brand", brand)?);
        }
        if !fixture.categories.is_empty() {
            input.category_ids = Some(
                fixture
                    .categories
                    .iter()
                    .map(|key| lookup(&categories, "category", key))
                    .collect::<Result<_, _>>()?,
            );
        }
        let product = catalog
            .create_product(&input)
            .await
            .map_err(|source| failed("product", &fixture.key, source))?;
        insert_key(&mut products, "product", &fixture.key, product.id)?;
    }

    for fixture in &fixtures.customers {
        let customer = state
            .customers()
            .create(&fixture.input)
            .await
            .map_err(|source| failed("customer", &fixture.key, source))?;
        insert_key(&mut customers, "customer", &fixture.key, customer.id)?;
    }

    for (index, fixture) in fixtures.orders.iter().enumerate() {
        let items = fixture
            .items
            .iter()
            .map(|item| {
                Ok(OrderItemInput {
                    id: None,
                    product_id: Some(lookup(&products, "product", &item.product)?),
                    quantity: item.quantity,
                })
            })
            .collect::<Result<Vec<_>, CliError>>()?;
        let input = OrderInput {
            customer_id: Some(lookup(&customers, "customer", &fixture.customer)?),
            status: fixture.status,
            shipping_price: fixture.shipping_price,
            notes: fixture.notes.clone(),
            items: Some(items),
        };
        let order = state
            .orders()
            .create(&input)
            .await
            .map_err(|source| failed("order", &format!("#{}", index + 1), source))?;
        debug!(number = %order.number, total = %order.total_price, "Seeded order");
    }

    Ok(SeedSummary {
        brands: brands.len(),
        categories: categories.len(),
        products: products.len(),
        customers: customers.len(),
        orders: fixtures.orders.len(),
    })
}

/// Check every key and reference in `fixtures` without touching the store.
///
/// A category parent must be listed before the category that uses it.
///
/// # Errors
///
/// Returns [`CliError::DuplicateKey`] or [`CliError::UnknownKey`].
pub fn check_keys(fixtures: &Fixtures) -> Result<(), CliError> {
    let brands = declare("brand", fixtures.brands.iter().map(|f| f.key.as_str()))?;

    let mut categories = HashSet::new();
    for fixture in &fixtures.categories {
        if let Some(parent) = &fixture.parent {
            known(&categories, "category", parent)?;
        }
        if !categories.insert(fixture.key.as_str()) {
            return Err(CliError::DuplicateKey {
                kind: "category",
                key: fixture.key.clone(),
            });
        }
    }

    let products = declare("product", fixtures.products.iter().map(|f| f.key.as_str()))?;
    for fixture in &fixtures.products {
        if let Some(brand) = &fixture.brand {
            known(&brands, "brand", brand)?;
        }
        for category in &fixture.categories {
            known(&categories, "category", category)?;
        }
    }

    let customers = declare("customer", fixtures.customers.iter().map(|f| f.key.as_str()))?;
    for fixture in &fixtures.orders {
        known(&customers, "customer", &fixture.customer)?;
        for item in &fixture.items {
            known(&products, "product", &item.product)?;
        }
    }
    Ok(())
}

fn declare<'a>(
    kind: &'static str,
    keys: impl Iterator<Item = &'a str>,
) -> Result<HashSet<&'a str>, CliError> {
    let mut declared = HashSet::new();
    for key in keys {
        if !declared.insert(key) {
            return Err(CliError::DuplicateKey {
                kind,
                key: key.to_string(),
            });
        }
    }
    Ok(declared)
}

fn known(declared: &HashSet<&str>, kind: &'static str, key: &str) -> Result<(), CliError> {
    if declared.contains(key) {
        Ok(())
    } else {
        Err(CliError::UnknownKey {
            kind,
            key: key.to_string(),
        })
    }
}

fn lookup<T: Copy>(
    keys: &HashMap<&str, T>,
    kind: &'static str,
    key: &str,
) -> Result<T, CliError> {
    keys.get(key).copied().ok_or_else(|| CliError::UnknownKey {
        kind,
        key: key.to_string(),
    })
}

fn insert_key<'a, T>(
    keys: &mut HashMap<&'a str, T>,
    kind: &'static str,
    key: &'a str,
    id: T,
) -> Result<(), CliError> {
    if keys.insert(key, id).is_some() {
        return Err(CliError::DuplicateKey {
            kind,
            key: key.to_string(),
        });
    }
    Ok(())
}

fn failed(kind: &str, key: &str, source: shopdesk_admin::services::ServiceError) -> CliError {
    CliError::Seed {
        what: format!("{kind} '{key}'"),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shopdesk_admin::models::{ListQuery, OrderFilter};

    const FIXTURES: &str = r#"
brands:
  - key: acme
    name: Acme Co
    url: https://acme.test
categories:
  - key: footwear
    name: Footwear
    is_visible: true
  - key: running
    name: Running
    parent: footwear
products:
  - key: runner
    name: Trail Runner
    sku: RUN-1
    price: "10.00"
    quantity: 20
    type: deliverable
    brand: acme
    categories: [running]
  - key: socks
    name: Socks
    sku: SOCK-1
    price: "2.50"
    quantity: 5
    type: deliverable
customers:
  - key: ada
    name: Ada Lovelace
    email: Ada@Example.test
orders:
  - customer: ada
    status: processing
    shipping_price: "3.00"
    items:
      - product: runner
        quantity: 2
      - product: socks
        quantity: 2
"#;

    fn state() -> AppState {
        AppState::new(AdminConfig::default(), Arc::new(MemoryStore::new()))
    }

    #[tokio::test]
    async fn test_seed_creates_linked_records() {
        let state = state();
        let fixtures: Fixtures = serde_yaml::from_str(FIXTURES).unwrap();
        let summary = seed(&state, &fixtures).await.unwrap();
        assert_eq!(
            summary,
            SeedSummary {
                brands: 1,
                categories: 2,
                products: 2,
                customers: 1,
                orders: 1,
            }
        );

        let orders = state
            .orders()
            .list(&ListQuery::default(), &OrderFilter::default())
            .await
            .unwrap();
        let order = orders.page.items.first().unwrap();
        assert_eq!(order.total_price.to_string(), "28.00");
        assert_eq!(order.status, OrderStatus::Processing);
    }

    #[tokio::test]
    async fn test_unknown_key_is_reported() {
        let fixtures: Fixtures = serde_yaml::from_str(
            "products:\n  - key: p\n    name: P\n    sku: P-1\n    price: \"1.00\"\n    quantity: 1\n    type: downloadable\n    brand: nope\n",
        )
        .unwrap();
        let err = seed(&state(), &fixtures).await.unwrap_err();
        assert_eq!(err.to_string(), "Unknown brand 'nope'");
    }

    #[tokio::test]
    async fn test_key_errors_are_found_before_writing() {
        let state = state();
        let fixtures: Fixtures = serde_yaml::from_str(
            r"
brands:
  - key: acme
    name: Acme
    url: https://acme.test
customers:
  - key: ada
    name: Ada
    email: ada@example.test
orders:
  - customer: ada
    items:
      - product: missing
",
        )
        .unwrap();

        let err = seed(&state, &fixtures).await.unwrap_err();
        assert_eq!(err.to_string(), "Unknown product 'missing'");

        let brands = state.catalog().list_brands(&ListQuery::default()).await.unwrap();
        assert_eq!(brands.total, 0);
        let customers = state.customers().list(&ListQuery::default()).await.unwrap();
        assert_eq!(customers.total, 0);
    }

    #[test]
    fn test_category_parent_must_come_first() {
        let fixtures: Fixtures = serde_yaml::from_str(
            "categories:\n  - key: running\n    name: Running\n    parent: footwear\n  - key: footwear\n    name: Footwear\n",
        )
        .unwrap();
        assert!(matches!(
            check_keys(&fixtures),
            Err(CliError::UnknownKey { kind: "category", .. })
        ));
    }

    #[test]
    fn test_duplicate_key_is_rejected() {
        let fixtures: Fixtures = serde_yaml::from_str(
            "customers:\n  - key: ada\n    name: Ada\n    email: a@example.test\n  - key: ada\n    name: Ada\n    email: b@example.test\n",
        )
        .unwrap();
        assert!(matches!(
            check_keys(&fixtures),
            Err(CliError::DuplicateKey { kind: "customer", .. })
        ));
    }

    #[tokio::test]
    async fn test_invalid_record_names_the_fixture() {
        let fixtures: Fixtures =
            serde_yaml::from_str("customers:\n  - key: bob\n    name: Bob\n    email: not-an-email\n")
                .unwrap();
        let err = seed(&state(), &fixtures).await.unwrap_err();
        assert!(err.to_string().starts_with("Seeding customer 'bob' failed"));
    }
}
